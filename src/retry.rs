//! Bounded retry with doubling backoff for remote capability calls.

use std::thread::sleep;
use std::time::Duration;

use tracing::warn;

/// Run `op` up to `max_retries + 1` times.
///
/// `retryable` decides whether a failure is worth another attempt
/// (timeouts and transient transport errors are; a 4xx is not). The
/// backoff doubles after each failed attempt; the final error is
/// returned unchanged.
pub fn with_retries<T, E, F, R>(
    max_retries: usize,
    base_backoff: Duration,
    mut op: F,
    retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff = base_backoff;
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_retries || !retryable(&e) {
                    return Err(e);
                }
                warn!(
                    "Attempt {} failed, retrying in {:?}: {e}",
                    attempt + 1,
                    backoff
                );
                sleep(backoff);
                backoff *= 2;
                attempt += 1;
            }
        }
    }
}
