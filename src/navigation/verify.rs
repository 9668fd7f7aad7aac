use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::FormResult;

/// Digit-field counts a code can be entered into.
pub const DIGIT_FIELD_COUNTS: [usize; 3] = [1, 4, 6];

/// Email retrieval on behalf of the navigator. The core only says how many
/// digit fields it found; finding the message is the collaborator's job.
pub trait Verifier {
    /// A recently received one-time code for a page with `digit_fields` inputs.
    fn fetch_code(&self, digit_fields: usize) -> FormResult<Option<String>>;

    /// A recently received account-verification link.
    fn fetch_link(&self) -> FormResult<Option<String>>;
}

/// Used when no mailbox is configured; every verification step fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerifier;

impl Verifier for NoVerifier {
    fn fetch_code(&self, _digit_fields: usize) -> FormResult<Option<String>> {
        Ok(None)
    }

    fn fetch_link(&self) -> FormResult<Option<String>> {
        Ok(None)
    }
}

/// Whether `code` fits a page with `digit_fields` inputs: one input takes a
/// 4 or 6 digit code, otherwise one digit per input. Leading zeros are
/// rejected.
pub fn accepts_code(code: &str, digit_fields: usize) -> bool {
    let len = code.chars().count();
    let fits = if digit_fields == 1 { len == 4 || len == 6 } else { len == digit_fields };
    fits && !code.starts_with('0') && code.chars().all(|c| c.is_ascii_alphanumeric())
}

// ============================================================================
// File-drop verifier
// ============================================================================

/// Reads codes and links dropped into a directory by an external mail
/// fetcher: `code.txt` and `link.txt`. Each file is consumed once read.
#[derive(Debug, Clone)]
pub struct FileVerifier {
    dir: PathBuf,
    wait: Duration,
    poll: Duration,
}

impl FileVerifier {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            wait: Duration::from_secs(90),
            poll: Duration::from_secs(1),
        }
    }

    /// How long to wait for a file to appear.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    fn take(&self, name: &str) -> FormResult<Option<String>> {
        let path = self.dir.join(name);
        let deadline = Instant::now() + self.wait;
        loop {
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                fs::remove_file(&path)?;
                let value = content.trim().to_string();
                if !value.is_empty() {
                    debug!(file = %path.display(), "verification value read");
                    return Ok(Some(value));
                }
            }
            if Instant::now() >= deadline {
                warn!(file = %path.display(), "no verification value arrived");
                return Ok(None);
            }
            thread::sleep(self.poll);
        }
    }
}

impl Verifier for FileVerifier {
    fn fetch_code(&self, digit_fields: usize) -> FormResult<Option<String>> {
        info!(digit_fields, dir = %self.dir.display(), "waiting for verification code");
        self.take("code.txt")
    }

    fn fetch_link(&self) -> FormResult<Option<String>> {
        info!(dir = %self.dir.display(), "waiting for verification link");
        self.take("link.txt")
    }
}
