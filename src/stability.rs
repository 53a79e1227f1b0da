//! Download-stability detection
//!
//! A file that is still being downloaded keeps growing. Before touching a
//! watched file, the pipeline samples its size until two consecutive samples
//! match — the heuristic proxy for "download complete".

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Polls a file's byte size until it stops changing or a timeout elapses
#[derive(Clone, Copy, Debug)]
pub struct StabilityWaiter {
    /// Interval between size samples
    pub poll_interval: Duration,

    /// Total time to wait for two equal consecutive samples
    pub timeout: Duration,
}

impl Default for StabilityWaiter {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl StabilityWaiter {
    /// Create a waiter with explicit sampling cadence and timeout.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Wait until the file's size stops changing.
    ///
    /// Returns `true` as soon as two consecutive samples report the same size
    /// (a zero-byte file that never grows is stable on the second sample).
    /// Returns `false` once the timeout elapses without a stable pair, or if
    /// the file cannot be stat'ed. Failure is reported, not raised — callers
    /// check the result and abort their own operation.
    pub async fn wait_until_stable(&self, path: &Path) -> bool {
        let start = Instant::now();
        let mut previous: Option<u64> = None;

        loop {
            let size = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(?path, error = %e, "could not stat file during stability wait");
                    return false;
                }
            };

            if previous == Some(size) {
                debug!(?path, size, "file size stable");
                return true;
            }
            previous = Some(size);

            if start.elapsed() >= self.timeout {
                warn!(
                    ?path,
                    timeout = ?self.timeout,
                    "file did not finish within the stability window"
                );
                return false;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn fast_waiter() -> StabilityWaiter {
        StabilityWaiter::new(Duration::from_millis(20), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn settled_file_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("done.bin");
        std::fs::write(&path, b"finished contents").unwrap();

        assert!(fast_waiter().wait_until_stable(&path).await);
    }

    #[tokio::test]
    async fn zero_byte_file_is_stable_on_second_sample() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        assert!(fast_waiter().wait_until_stable(&path).await);
    }

    #[tokio::test]
    async fn continuously_growing_file_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("growing.bin");
        std::fs::write(&path, b"").unwrap();

        // Append from a blocking thread faster than the waiter samples, for
        // longer than its timeout, so no two consecutive samples can match.
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .unwrap();
            let deadline = Instant::now() + Duration::from_millis(400);
            while Instant::now() < deadline {
                file.write_all(b"x").unwrap();
                file.flush().unwrap();
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        // Let the writer make its first appends before sampling starts
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!fast_waiter().wait_until_stable(&path).await);
        writer.join().unwrap();
    }

    #[tokio::test]
    async fn missing_file_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("never-existed.bin");

        assert!(!fast_waiter().wait_until_stable(&path).await);
    }
}
