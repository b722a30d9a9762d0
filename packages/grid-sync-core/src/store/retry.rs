//! Bounded retry for snapshot reads.

use std::time::Duration;

/// Retries a read that may fail transiently.
///
/// Runs `operation` once plus up to `max_retries` retries, sleeping
/// `retry_delay` between attempts, and returns the last error when all
/// attempts fail. Only meant for reads; mutation batches are never retried.
pub fn retry_read<F, T, E>(
    mut operation: F,
    max_retries: u32,
    retry_delay: Duration,
    context: &str,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempt += 1;
                if attempt > max_retries {
                    tracing::error!(
                        "{} failed after {} attempts: {}",
                        context,
                        attempt,
                        err
                    );
                    return Err(err);
                }

                tracing::warn!(
                    "Read failed in {} (attempt {}/{}): {}",
                    context,
                    attempt,
                    max_retries,
                    err
                );

                if !retry_delay.is_zero() {
                    std::thread::sleep(retry_delay);
                }
            }
        }
    }
}
