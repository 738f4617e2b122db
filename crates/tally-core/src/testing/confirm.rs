use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::migration::Confirm;

/// Confirmation strategy that always gives the same answer and records
/// every prompt it was shown.
#[derive(Debug, Clone)]
pub struct ScriptedConfirm {
    answer: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConfirm {
    pub fn yes() -> Self {
        Self::answering(true)
    }

    pub fn no() -> Self {
        Self::answering(false)
    }

    fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer)
    }
}
