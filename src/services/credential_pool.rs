use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin pool of provider credentials shared by every request in the process.
///
/// The cursor only ever moves forward; concurrent callers may interleave, which changes
/// who gets which key but never corrupts the pool.
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(Error::Config(
                "Credential pool requires at least one API key".to_string(),
            ));
        }

        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Hand out the next credential and advance the cursor by one.
    pub fn next(&self) -> (usize, &str) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        (index, self.keys[index].as_str())
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("keys", &format_args!("[{} redacted]", self.keys.len()))
            .field("cursor", &self.cursor())
            .finish()
    }
}
