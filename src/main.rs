use clap::Parser;
use trustvault::cli::commands;
use trustvault::cli::{BackupAction, CertAction, Cli, Commands, IntegrityAction, VaultAction};
use trustvault::errors::Result;

fn main() {
    let cli = Cli::parse();
    trustvault::logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        trustvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match cli.command {
        Commands::Vault { ref action } => match action {
            VaultAction::Init { from } => commands::vault::execute_init(cli, from.as_deref()),
            VaultAction::Show { json } => commands::vault::execute_show(cli, *json),
            VaultAction::Import { file } => commands::vault::execute_import(cli, file),
            VaultAction::Passwd => commands::vault::execute_passwd(cli),
            VaultAction::Status => commands::vault::execute_status(cli),
            VaultAction::Destroy { force } => commands::vault::execute_destroy(cli, *force),
        },
        Commands::Backup { ref action } => match action {
            BackupAction::Create { output, encrypt } => {
                commands::backup::execute_create(cli, output, *encrypt)
            }
            BackupAction::Restore { file, force } => {
                commands::backup::execute_restore(cli, file, *force)
            }
        },
        Commands::Integrity { ref action } => match action {
            IntegrityAction::Generate => commands::integrity::execute_generate(cli),
            IntegrityAction::Verify { json } => commands::integrity::execute_verify(cli, *json),
            IntegrityAction::Update { path } => commands::integrity::execute_update(cli, path),
            IntegrityAction::Check { yes } => commands::integrity::execute_check(cli, *yes),
        },
        Commands::Cert { ref action } => match action {
            CertAction::Issue {
                claims,
                claims_file,
                output,
            } => commands::cert::execute_issue(
                cli,
                claims,
                claims_file.as_deref(),
                output.as_deref(),
            ),
            CertAction::Verify { file, show_claims } => {
                commands::cert::execute_verify(cli, file, *show_claims)
            }
        },
        #[cfg(feature = "audit-log")]
        Commands::Audit {
            last,
            ref since,
            family,
            problems,
        } => commands::audit_cmd::execute(cli, last, since.as_deref(), family, problems),
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => Err(trustvault::errors::TrustVaultError::AuditError(
            "audit log not compiled — rebuild with `--features audit-log`".into(),
        )),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(),
    }
}
