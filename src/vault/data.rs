//! The plaintext record a vault protects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User state kept behind the vault passphrase.
///
/// Missing sections deserialize as empty so older exports keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultData {
    /// Per-course progress, keyed by course id.
    #[serde(default)]
    pub progress: Map<String, Value>,

    /// Free-form notes, keyed by note id.
    #[serde(default)]
    pub notes: BTreeMap<String, String>,

    /// UI and learning preferences.
    #[serde(default)]
    pub preferences: Map<String, Value>,
}

impl VaultData {
    pub fn is_empty(&self) -> bool {
        self.progress.is_empty() && self.notes.is_empty() && self.preferences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_sections_default_to_empty() {
        let data: VaultData = serde_json::from_value(json!({ "progress": { "c1": 10 } })).unwrap();
        assert_eq!(data.progress["c1"], 10);
        assert!(data.notes.is_empty());
        assert!(data.preferences.is_empty());
    }

    #[test]
    fn serializes_all_three_sections() {
        let value = serde_json::to_value(VaultData::default()).unwrap();
        assert_eq!(value, json!({ "progress": {}, "notes": {}, "preferences": {} }));
        assert!(VaultData::default().is_empty());
    }
}
