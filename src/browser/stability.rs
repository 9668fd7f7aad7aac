use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::browser::Browser;
use crate::error::FormResult;

/// Polling parameters for DOM settling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityOpts {
    #[serde(with = "millis")]
    pub timeout: Duration,
    #[serde(with = "millis")]
    pub poll: Duration,
    /// Extra wait once the DOM has settled.
    #[serde(with = "millis")]
    pub padding: Duration,
    /// Consecutive identical captures that count as settled.
    pub required_identical: usize,
}

impl Default for StabilityOpts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll: Duration::from_millis(250),
            padding: Duration::from_millis(500),
            required_identical: 3,
        }
    }
}

impl StabilityOpts {
    /// No sleeping at all; for in-memory pages.
    pub fn immediate() -> Self {
        Self { poll: Duration::ZERO, padding: Duration::ZERO, ..Self::default() }
    }

    pub fn with_padding(self, padding: Duration) -> Self {
        Self { padding, ..self }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Capture until `required_identical` consecutive snapshots match, sleep the
/// padding, and return a fresh capture. A timeout is not an error: the last
/// capture is returned as is.
pub fn wait_until_stable<B: Browser + ?Sized>(browser: &mut B, opts: &StabilityOpts) -> FormResult<String> {
    let started = Instant::now();
    let mut last = browser.snapshot()?;
    let mut identical = 1;

    while identical < opts.required_identical {
        if started.elapsed() >= opts.timeout {
            warn!(elapsed_ms = started.elapsed().as_millis() as u64, "DOM did not settle before timeout");
            return Ok(last);
        }
        if !opts.poll.is_zero() {
            thread::sleep(opts.poll);
        }
        let current = browser.snapshot()?;
        if current == last {
            identical += 1;
        } else {
            identical = 1;
            last = current;
        }
    }

    if opts.padding.is_zero() {
        return Ok(last);
    }
    thread::sleep(opts.padding);
    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "DOM settled");
    browser.snapshot()
}
