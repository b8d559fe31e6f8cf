//! Custom key entry for CLI operations.

use rpassword::prompt_password;
use wzsave::profile::{CustomKey, KeyPrompt};

use crate::interrupt;

/// Key prompt that uses values from the command line and asks on the
/// terminal for anything missing. An empty answer cancels.
pub struct TerminalPrompt {
    label: &'static str,
    iv: Option<String>,
    key: Option<String>,
}

impl TerminalPrompt {
    pub fn new(label: &'static str, iv: Option<String>, key: Option<String>) -> Self {
        Self { label, iv, key }
    }

    fn ask(&self, field: &str) -> Option<String> {
        match prompt_password(format!("{} {}: ", self.label, field)) {
            Ok(_) if interrupt::interrupted() => None,
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => None,
        }
    }
}

impl KeyPrompt for TerminalPrompt {
    fn prompt_custom_key(&mut self) -> Option<CustomKey> {
        let iv = match self.iv.take() {
            Some(iv) => iv,
            None => self.ask("IV (8 hex digits)")?,
        };
        let key = match self.key.take() {
            Some(key) => key,
            None => self.ask("user key (64 hex digits)")?,
        };
        match CustomKey::from_hex(&iv, &key) {
            Ok(custom) => Some(custom),
            Err(e) => {
                eprintln!("{}", e);
                None
            }
        }
    }
}
