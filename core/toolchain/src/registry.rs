//! Registry of in-flight installs.
//!
//! The front end owns one [`InstallRegistry`] and begins every install
//! through it. Each [`InstallSession`] gets its own cancel signal and its own
//! temporary paths, distinct from every other active session. Dropping the
//! session removes it from the registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cancel::{CancelSource, CancelToken};
use crate::install::{InstallPaths, InstallRequest};

/// Summary of an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: u64,
    pub version: String,
    pub paths: InstallPaths,
}

#[derive(Debug)]
struct Entry {
    version: String,
    paths: InstallPaths,
    cancel: CancelSource,
}

#[derive(Debug, Default)]
struct Sessions {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

/// Cloneable handle to the set of active install sessions.
#[derive(Debug, Clone)]
pub struct InstallRegistry {
    temp_dir: PathBuf,
    sessions: Arc<Mutex<Sessions>>,
}

impl InstallRegistry {
    /// Creates an empty registry allocating temporary paths under `temp_dir`.
    #[must_use]
    pub fn new(temp_dir: PathBuf) -> Self {
        Self {
            temp_dir,
            sessions: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new install of `version`.
    #[must_use = "the session is removed from the registry when dropped"]
    pub fn begin(&self, version: impl Into<String>) -> InstallSession {
        let version = version.into();
        let mut sessions = self.lock();

        let paths = loop {
            let candidate = InstallPaths::generate(&self.temp_dir);
            let taken = sessions.entries.values().any(|entry| {
                entry.paths.post_install == candidate.post_install
                    || entry.paths.progress_pipe == candidate.progress_pipe
            });
            if !taken {
                break candidate;
            }
        };

        let id = sessions.next_id;
        sessions.next_id += 1;
        let cancel = CancelSource::new();
        let token = cancel.token();
        sessions.entries.insert(
            id,
            Entry {
                version: version.clone(),
                paths: paths.clone(),
                cancel,
            },
        );
        tracing::debug!(id, version = %version, "install session started");

        InstallSession {
            id,
            version,
            paths,
            token,
            registry: self.clone(),
        }
    }

    /// Cancels one session. Returns `false` if it is not active.
    pub fn cancel(&self, id: u64) -> bool {
        match self.lock().entries.get(&id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every active session, returning how many there were.
    pub fn cancel_all(&self) -> usize {
        let sessions = self.lock();
        for entry in sessions.entries.values() {
            entry.cancel.cancel();
        }
        sessions.entries.len()
    }

    /// Lists active sessions in the order they began.
    #[must_use]
    pub fn active(&self) -> Vec<SessionInfo> {
        let mut active: Vec<SessionInfo> = self
            .lock()
            .entries
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: *id,
                version: entry.version.clone(),
                paths: entry.paths.clone(),
            })
            .collect();
        active.sort_by_key(|info| info.id);
        active
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn remove(&self, id: u64) {
        if self.lock().entries.remove(&id).is_some() {
            tracing::debug!(id, "install session ended");
        }
    }
}

/// An active install. Removed from its registry on drop.
#[derive(Debug)]
pub struct InstallSession {
    id: u64,
    version: String,
    paths: InstallPaths,
    token: CancelToken,
    registry: InstallRegistry,
}

impl InstallSession {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Builds the install request for this session.
    #[must_use]
    pub fn request(&self) -> InstallRequest<'static> {
        InstallRequest::new(self.version.clone())
            .with_cancel(self.token())
            .with_paths(self.paths.clone())
    }
}

impl Drop for InstallSession {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
