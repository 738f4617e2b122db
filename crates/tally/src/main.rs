mod cli;

use std::process::ExitCode;

use clap::Parser;
use console::style;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    match cli.execute().await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("  {} {}", style("✗").red(), style(format!("{:#}", e)).red());
            eprintln!("  {}", style("Abort!").red());
            ExitCode::from(cli::EXIT_FAILURE)
        }
    }
}
