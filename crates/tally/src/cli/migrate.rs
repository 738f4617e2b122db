use anyhow::Result;
use clap::Parser;
use console::style;

use super::context::Project;
use super::CommandStatus;

/// Run all pending migrations.
#[derive(Parser, Debug)]
pub struct MigrateCommand {}

impl MigrateCommand {
    pub async fn execute(self, project: &Project) -> Result<CommandStatus> {
        let migrator = project.migrator().await?;

        let applied = migrator
            .run_pending(|id| {
                println!("  {} {} {}.sql", style("✓").green(), style("Migrated:").green(), id);
            })
            .await?;

        if applied.is_empty() {
            println!("  {} Nothing to migrate", style("ℹ").blue());
        } else {
            println!();
            println!(
                "  {} Applied {} migration(s)",
                style("✓").green(),
                applied.len()
            );
        }
        Ok(CommandStatus::Success)
    }
}
