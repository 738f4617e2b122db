use console::style;
use dialoguer::Confirm as ConfirmPrompt;

use tally_core::error::{Result, TallyError};
use tally_core::migration::Confirm;

/// Asks on the terminal. Anything but an explicit yes counts as no.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        ConfirmPrompt::new()
            .with_prompt(style(prompt).red().to_string())
            .default(false)
            .interact()
            .map_err(|e| TallyError::Prompt(e.to_string()))
    }
}
