mod context;
mod make;
mod migrate;
mod prompt;
mod rollback;
mod status;

pub use make::MakeCommand;
pub use migrate::MigrateCommand;
pub use rollback::RollbackCommand;
pub use status::StatusCommand;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tally_core::config::LoggingConfig;

use context::Project;

/// Exit status when the operator declined a confirmation.
pub const EXIT_ABORTED: u8 = 1;

/// Exit status when a command failed.
pub const EXIT_FAILURE: u8 = 2;

/// tally - ordered schema migrations with rollback
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "tally.toml", global = true)]
    pub config: PathBuf,

    /// Migrations directory (overrides the configuration).
    #[arg(short, long, global = true)]
    pub migrations_dir: Option<PathBuf>,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run all pending migrations.
    Migrate(MigrateCommand),

    /// Roll back the last applied migration.
    Rollback(RollbackCommand),

    /// Show applied and pending migrations.
    Status(StatusCommand),

    /// Create a new migration file.
    Make(MakeCommand),
}

/// How a command that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The operator declined; nothing was changed.
    Aborted,
}

impl CommandStatus {
    pub fn code(self) -> u8 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::Aborted => EXIT_ABORTED,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<CommandStatus> {
        match self.command {
            Commands::Make(cmd) => {
                let project = Project::load_or_default(&self.global)?;
                init_tracing(project.logging());
                cmd.execute(&project)
            }
            Commands::Migrate(cmd) => {
                let project = Project::load(&self.global)?;
                init_tracing(project.logging());
                cmd.execute(&project).await
            }
            Commands::Rollback(cmd) => {
                let project = Project::load(&self.global)?;
                init_tracing(project.logging());
                cmd.execute(&project).await
            }
            Commands::Status(cmd) => {
                let project = Project::load(&self.global)?;
                init_tracing(project.logging());
                cmd.execute(&project).await
            }
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed (tests); keep it.
    let _ = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_rollback_flags() {
        let cli = Cli::try_parse_from(["tally", "rollback", "--hard", "--delete"]).unwrap();
        match cli.command {
            Commands::Rollback(cmd) => {
                assert!(cmd.hard);
                assert!(cmd.delete);
                assert!(!cmd.yes);
            }
            _ => panic!("expected rollback"),
        }
    }

    #[test]
    fn test_cli_parse_global_args_after_command() {
        let cli = Cli::try_parse_from([
            "tally",
            "status",
            "--config",
            "ops/tally.toml",
            "--migrations-dir",
            "db",
        ])
        .unwrap();

        assert_eq!(cli.global.config, PathBuf::from("ops/tally.toml"));
        assert_eq!(cli.global.migrations_dir, Some(PathBuf::from("db")));
    }

    #[test]
    fn test_cli_parse_make_requires_name() {
        assert!(Cli::try_parse_from(["tally", "make"]).is_err());
        assert!(Cli::try_parse_from(["tally", "make", "create_users"]).is_ok());
    }

    #[test]
    fn test_cli_parse_unknown_command() {
        assert!(Cli::try_parse_from(["tally", "explode"]).is_err());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(CommandStatus::Success.code(), 0);
        assert_eq!(CommandStatus::Aborted.code(), EXIT_ABORTED);
        assert_ne!(EXIT_ABORTED, EXIT_FAILURE);
    }
}
