//! Install progress protocol.
//!
//! With `--progress-file <pipe>`, swiftly writes one JSON object per line to
//! a named pipe while it installs:
//!
//! ```json
//! {"step":{"text":"Downloading Swift 6.0.3","percent":42,"timestamp":757093541.2}}
//! {"complete":{"success":true}}
//! ```
//!
//! Lines that are not one of these objects are delivered verbatim as
//! [`ProgressEvent::Text`], so a newer swiftly with new event kinds still
//! shows something.

use std::path::Path;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// One event read from the progress pipe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A step of the install.
    Step {
        text: String,
        /// Overall progress, 0 to 100, when reported.
        percent: Option<f64>,
    },
    /// The installer finished writing progress.
    Complete { success: bool },
    /// A line that is not a recognised event.
    Text(String),
}

impl ProgressEvent {
    /// Parses one line of the pipe. Returns `None` for blank lines.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let event = match serde_json::from_str::<WireEvent>(line) {
            Ok(WireEvent::Step { text, percent }) => Self::Step {
                text,
                percent: percent.map(|p| p.clamp(0.0, 100.0)),
            },
            Ok(WireEvent::Complete { success }) => Self::Complete {
                success: success.unwrap_or(true),
            },
            Err(_) => Self::Text(line.to_string()),
        };
        Some(event)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireEvent {
    Step {
        text: String,
        #[serde(default)]
        percent: Option<f64>,
    },
    Complete {
        #[serde(default)]
        success: Option<bool>,
    },
}

/// Receives progress events in pipe order.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Reads `pipe` line by line, forwarding parsed events until EOF.
///
/// Opening a FIFO blocks until a writer connects; the caller is responsible
/// for releasing a reader whose writer never showed up.
///
/// # Errors
///
/// Returns the I/O error if the pipe cannot be opened or read.
pub async fn read_progress(
    pipe: &Path,
    events: mpsc::UnboundedSender<ProgressEvent>,
) -> std::io::Result<()> {
    let file = tokio::fs::File::open(pipe).await?;
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = ProgressEvent::parse_line(&line)
            && events.send(event).is_err()
        {
            break;
        }
    }
    Ok(())
}
