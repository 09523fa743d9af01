//! MFA code acquisition.

use crate::config::TempCredentialsConfig;
use crate::error::{MfaPromptError, TempCredsError};
use crate::sts::MfaCode;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use tracing::debug;

/// Asks the user for an MFA code.
#[async_trait]
pub trait MfaPrompt: Send + Sync {
    /// Display `message` and return the code entered.
    async fn prompt(&self, message: &str) -> Result<String, MfaPromptError>;
}

#[async_trait]
impl<F> MfaPrompt for F
where
    F: Fn(&str) -> Result<String, MfaPromptError> + Send + Sync,
{
    async fn prompt(&self, message: &str) -> Result<String, MfaPromptError> {
        self(message)
    }
}

/// Prompts on stderr and reads a line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl MfaPrompt for TerminalPrompt {
    async fn prompt(&self, message: &str) -> Result<String, MfaPromptError> {
        let message = message.to_string();
        tokio::task::spawn_blocking(move || -> Result<String, MfaPromptError> {
            let mut stderr = std::io::stderr();
            stderr.write_all(message.as_bytes())?;
            stderr.flush()?;

            let mut line = String::new();
            if std::io::stdin().lock().read_line(&mut line)? == 0 {
                return Err(MfaPromptError::Cancelled);
            }
            Ok(line)
        })
        .await
        .map_err(|e| MfaPromptError::Failed {
            message: format!("prompt task failed: {}", e),
        })?
    }
}

/// Always answers with the same code.
#[derive(Debug, Clone)]
pub struct StaticPrompt {
    code: String,
}

impl StaticPrompt {
    /// Create a prompt answering `code`.
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
impl MfaPrompt for StaticPrompt {
    async fn prompt(&self, _message: &str) -> Result<String, MfaPromptError> {
        Ok(self.code.clone())
    }
}

/// Message shown when asking for the code of `serial`.
pub fn prompt_message(serial: &str) -> String {
    format!("Enter token for {}: ", serial)
}

/// Resolve the MFA device and code to present, if a device is configured.
///
/// A literal `mfa_token` wins; otherwise the configured prompt is asked.
pub async fn resolve_mfa_code(
    config: &TempCredentialsConfig,
) -> Result<Option<MfaCode>, TempCredsError> {
    let serial = match config.mfa_serial() {
        Some(serial) => serial,
        None => return Ok(None),
    };

    let raw = match config.mfa_token() {
        Some(token) => token.to_string(),
        None => {
            debug!("Prompting for MFA code for {}", serial);
            config.mfa_prompt().prompt(&prompt_message(serial)).await?
        }
    };

    let code = raw.trim();
    if code.is_empty() {
        return Err(MfaPromptError::Empty.into());
    }

    Ok(Some(MfaCode::new(serial, code)))
}
