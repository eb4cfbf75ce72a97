pub mod audit;
pub mod backup;
pub mod certificate;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod integrity;
pub mod logging;
pub mod storage;
pub mod vault;
