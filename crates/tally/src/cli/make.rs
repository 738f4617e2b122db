use anyhow::Result;
use clap::Parser;
use console::style;

use tally_runtime::MigrationGenerator;

use super::context::Project;
use super::CommandStatus;

/// Create a new migration file.
#[derive(Parser, Debug)]
pub struct MakeCommand {
    /// Migration name, e.g. "create users".
    pub name: String,
}

impl MakeCommand {
    pub fn execute(self, project: &Project) -> Result<CommandStatus> {
        let generator = MigrationGenerator::new(project.migrations_dir());
        let migration = generator.create(&self.name)?;

        println!(
            "  {} {} {}",
            style("✓").green(),
            style("Created:").green(),
            migration.path.display()
        );
        Ok(CommandStatus::Success)
    }
}
