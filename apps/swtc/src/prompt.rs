//! Terminal implementation of the core's [`Prompter`].

use async_trait::async_trait;
use dialoguer::Confirm;
use swift_toolchain::Prompter;

/// Asks on the controlling terminal and reports on stderr.
///
/// Without a terminal every question is answered "no".
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn confirm(&self, message: &str) -> bool {
        let prompt = message.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new().with_prompt(prompt).default(false).interact()
        })
        .await;

        match answer {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "could not read an answer, assuming no");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "prompt task failed, assuming no");
                false
            }
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("Warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}
