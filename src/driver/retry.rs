//! Bounded retry for whole driver sequences.

use std::fmt::Display;
use std::future::Future;

use log::debug;

/// Attempts made by [`retry`] when the caller does not configure a count.
pub const DEFAULT_RETRY_COUNT: usize = 5;

/// Run `op` up to `count` times, returning the first success.
///
/// Failed attempts are retried immediately. When every attempt fails the last
/// error is returned unchanged. A `count` of zero still runs `op` once.
pub async fn retry<T, E, F, Fut>(count: usize, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let count = count.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < count => {
                debug!("attempt {}/{} failed: {}", attempt, count, e);
                attempt += 1;
            }
            Err(e) => {
                debug!("attempt {}/{} failed, giving up: {}", attempt, count, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn zero_count_runs_once() {
        let calls = Cell::new(0);
        let res: Result<(), String> = retry(0, || {
            calls.set(calls.get() + 1);
            async { Err("nope".to_string()) }
        })
        .await;
        assert_eq!(res, Err("nope".to_string()));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let calls = Cell::new(0);
        let res: Result<u32, String> = retry(5, || {
            calls.set(calls.get() + 1);
            async { Ok(7) }
        })
        .await;
        assert_eq!(res, Ok(7));
        assert_eq!(calls.get(), 1);
    }
}
