//! In-memory write locks scoped to a single principal's root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

const TOKEN_SCHEME: &str = "opaquelocktoken:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDepth {
    Zero,
    Infinity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLock {
    pub token: String,
    pub path: String,
    pub depth: LockDepth,
    pub owner: Option<String>,
    /// `None` means the lock never expires.
    pub timeout: Option<Duration>,
    expires_at: Option<Instant>,
}

impl ActiveLock {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Time left before expiry, `None` for infinite locks.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Whether this lock protects writes to `path`.
    fn covers(&self, path: &str) -> bool {
        self.path == path || (self.depth == LockDepth::Infinity && is_within(path, &self.path))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("resource {0} is locked")]
    Locked(String),

    #[error("lock token is not known for {0}")]
    UnknownToken(String),
}

/// Exclusive write locks for one filesystem root.
///
/// Paths are request paths relative to the root, starting with `/` and without
/// a trailing slash (the root itself is `/`).
#[derive(Debug)]
pub struct LockNamespace {
    root: PathBuf,
    locks: Mutex<HashMap<String, ActiveLock>>,
}

impl LockNamespace {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// ## Summary
    /// Takes a new exclusive lock on `path`.
    ///
    /// ## Errors
    /// Returns `Locked` if the path, an infinite-depth ancestor, or (for an
    /// infinite-depth request) any descendant is already locked.
    pub fn lock(
        &self,
        path: &str,
        depth: LockDepth,
        timeout: Option<Duration>,
        owner: Option<String>,
    ) -> Result<ActiveLock, LockError> {
        let path = normalize(path);
        let mut locks = self.locks.lock();
        purge_expired(&mut locks);

        let conflict = locks.values().any(|existing| {
            existing.covers(&path)
                || (depth == LockDepth::Infinity && is_within(&existing.path, &path))
        });
        if conflict {
            return Err(LockError::Locked(path));
        }

        let lock = ActiveLock {
            token: format!("{TOKEN_SCHEME}{}", uuid::Uuid::new_v4()),
            path,
            depth,
            owner,
            timeout,
            expires_at: deadline(timeout),
        };
        locks.insert(lock.token.clone(), lock.clone());

        tracing::debug!(token = %lock.token, path = %lock.path, "Lock granted");
        Ok(lock)
    }

    /// ## Summary
    /// Extends a live lock that covers `path`.
    ///
    /// ## Errors
    /// Returns `UnknownToken` if the token is unknown, expired, or does not cover `path`.
    pub fn refresh(
        &self,
        path: &str,
        token: &str,
        timeout: Option<Duration>,
    ) -> Result<ActiveLock, LockError> {
        let path = normalize(path);
        let mut locks = self.locks.lock();
        purge_expired(&mut locks);

        match locks.get_mut(token) {
            Some(lock) if lock.covers(&path) => {
                lock.timeout = timeout;
                lock.expires_at = deadline(timeout);
                Ok(lock.clone())
            }
            _ => Err(LockError::UnknownToken(path)),
        }
    }

    /// ## Summary
    /// Releases the lock identified by `token`.
    ///
    /// ## Errors
    /// Returns `UnknownToken` if no live lock with that token covers `path`.
    pub fn unlock(&self, path: &str, token: &str) -> Result<(), LockError> {
        let path = normalize(path);
        let mut locks = self.locks.lock();
        purge_expired(&mut locks);

        if locks.get(token).is_some_and(|lock| lock.covers(&path)) {
            locks.remove(token);
            tracing::debug!(token, path = %path, "Lock released");
            Ok(())
        } else {
            Err(LockError::UnknownToken(path))
        }
    }

    /// ## Summary
    /// Checks that a write to `path` (and anything below it) is permitted for a
    /// request that submitted `tokens`.
    ///
    /// ## Errors
    /// Returns `Locked` naming the first path whose lock token was not submitted.
    pub fn check_write(&self, path: &str, tokens: &[String]) -> Result<(), LockError> {
        let path = normalize(path);
        let mut locks = self.locks.lock();
        purge_expired(&mut locks);

        let blocking = locks.values().find(|lock| {
            (lock.covers(&path) || is_within(&lock.path, &path))
                && !tokens.iter().any(|t| t == &lock.token)
        });

        match blocking {
            Some(lock) => Err(LockError::Locked(lock.path.clone())),
            None => Ok(()),
        }
    }

    /// Live locks covering `path`.
    #[must_use]
    pub fn locks_on(&self, path: &str) -> Vec<ActiveLock> {
        let path = normalize(path);
        let mut locks = self.locks.lock();
        purge_expired(&mut locks);
        locks
            .values()
            .filter(|lock| lock.covers(&path))
            .cloned()
            .collect()
    }

    /// Drops every lock at or below `path`, after the resource is gone.
    pub fn release_under(&self, path: &str) {
        let path = normalize(path);
        self.locks
            .lock()
            .retain(|_, lock| !(lock.path == path || is_within(&lock.path, &path)));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let mut locks = self.locks.lock();
        purge_expired(&mut locks);
        locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A timeout too large to represent as an `Instant` never expires.
fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

fn purge_expired(locks: &mut HashMap<String, ActiveLock>) {
    let now = Instant::now();
    locks.retain(|_, lock| !lock.is_expired(now));
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Strict descendant test on normalized paths.
fn is_within(path: &str, ancestor: &str) -> bool {
    if path == ancestor {
        return false;
    }
    if ancestor == "/" {
        return true;
    }
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}
