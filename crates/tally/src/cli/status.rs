use anyhow::Result;
use clap::Parser;
use console::style;

use super::context::Project;
use super::CommandStatus;

/// Show applied and pending migrations.
#[derive(Parser, Debug)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, project: &Project) -> Result<CommandStatus> {
        let migrator = project.migrator().await?;
        let status = migrator.status().await?;

        if status.applied.is_empty() && status.pending.is_empty() {
            println!("  {} No migrations found", style("ℹ").blue());
            return Ok(CommandStatus::Success);
        }

        if !status.applied.is_empty() {
            println!("  {} Applied:", style("✓").green());
            for m in &status.applied {
                let marker = if m.file_exists {
                    style("✓").green().to_string()
                } else {
                    style("!").red().to_string()
                };
                println!(
                    "    {} {} {} ({})",
                    marker,
                    style(&m.entry.id).cyan(),
                    style("at").dim(),
                    m.entry.applied_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }

        if !status.pending.is_empty() {
            if !status.applied.is_empty() {
                println!();
            }
            println!("  {} Pending:", style("○").yellow());
            for id in &status.pending {
                println!("    {} {}", style("→").dim(), style(id).yellow());
            }
        }

        println!();
        println!(
            "  {} {} applied, {} pending",
            style("ℹ").blue(),
            status.applied.len(),
            status.pending.len()
        );

        let missing = status.missing_files().count();
        if missing > 0 {
            println!(
                "  {} {} applied migration(s) have no file in {}",
                style("!").red(),
                missing,
                migrator.source().dir().display()
            );
        }
        Ok(CommandStatus::Success)
    }
}
