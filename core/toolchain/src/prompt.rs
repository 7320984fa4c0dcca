//! User-facing decisions and notices.
//!
//! The core never talks to a terminal or an editor directly. Anything the
//! user has to see or decide goes through a [`Prompter`] supplied by the
//! front end.

use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::errors::ToolchainError;

/// Presents messages and yes/no decisions to the user.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Asks a yes/no question. There is no timeout.
    async fn confirm(&self, message: &str) -> bool;

    /// Shows a warning.
    fn warn(&self, message: &str);

    /// Shows an error.
    fn error(&self, message: &str);
}

/// Asks `message` and waits for the answer, or for `cancel` to fire.
///
/// # Errors
///
/// Returns `Cancelled` if the token fires before the user answers.
pub async fn confirm_or_cancel(
    prompter: &dyn Prompter,
    message: &str,
    cancel: &CancelToken,
) -> Result<bool, ToolchainError> {
    if cancel.is_cancelled() {
        return Err(ToolchainError::Cancelled);
    }
    tokio::select! {
        answer = prompter.confirm(message) => Ok(answer),
        () = cancel.cancelled() => Err(ToolchainError::Cancelled),
    }
}
