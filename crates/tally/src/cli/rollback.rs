use anyhow::Result;
use clap::Parser;
use console::style;

use tally_core::migration::{AssumeYes, RollbackKind, RollbackOptions, RollbackOutcome};

use super::context::Project;
use super::prompt::TerminalConfirm;
use super::CommandStatus;

/// Roll back the last applied migration.
#[derive(Parser, Debug)]
pub struct RollbackCommand {
    /// Remove it from the log without running its down section.
    #[arg(long)]
    pub hard: bool,

    /// Delete the migration file after rolling back.
    #[arg(long)]
    pub delete: bool,

    /// Answer yes to confirmation prompts.
    #[arg(short, long)]
    pub yes: bool,
}

impl RollbackCommand {
    pub async fn execute(self, project: &Project) -> Result<CommandStatus> {
        let migrator = project.migrator().await?;
        let options = RollbackOptions {
            hard: self.hard,
            delete: self.delete,
        };

        let outcome = if self.yes {
            migrator.rollback_last(options, &AssumeYes).await?
        } else {
            migrator.rollback_last(options, &TerminalConfirm).await?
        };

        Ok(report(&outcome))
    }
}

fn report(outcome: &RollbackOutcome) -> CommandStatus {
    match outcome {
        RollbackOutcome::NothingToRollback => {
            println!("  {} Nothing to rollback", style("ℹ").blue());
        }
        RollbackOutcome::Aborted { id } => {
            println!("  {} Left {}.sql in the log", style("○").yellow(), id);
            eprintln!("  {}", style("Abort!").red());
        }
        RollbackOutcome::RolledBack {
            id,
            kind,
            file_deleted,
        } => {
            println!(
                "  {} {} {}.sql",
                style("✓").green(),
                style(rolled_back_label(*kind)).green(),
                id
            );
            if *file_deleted {
                println!("  {} {} {}.sql", style("✓").green(), style("Deleted:").green(), id);
            }
        }
    }

    if outcome.is_aborted() {
        CommandStatus::Aborted
    } else {
        CommandStatus::Success
    }
}

fn rolled_back_label(kind: RollbackKind) -> &'static str {
    match kind {
        RollbackKind::Hard => "Rolled back with --hard:",
        RollbackKind::Reverted | RollbackKind::MarkedRolledBack => "Rolled back:",
    }
}
