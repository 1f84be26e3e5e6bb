//! Bounded-retry combinator
//!
//! One retry loop shared by the parsing path (reload-and-reparse) and the
//! recovery path (client re-provisioning), instead of hand-rolled loops at
//! each call site.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Runs `op` up to `attempts` times, sleeping `backoff` between failures.
///
/// Mutable context is threaded through `op` by value and handed back with the
/// result, so the operation can hold `&mut` state across attempts. Errors for
/// which `is_fatal` returns true are returned immediately without consuming
/// the remaining attempts.
pub async fn with_retry<C, T, E, F, Fut, P>(
    attempts: usize,
    backoff: Duration,
    mut ctx: C,
    mut op: F,
    is_fatal: P,
) -> (C, Result<T, E>)
where
    F: FnMut(C, usize) -> Fut,
    Fut: Future<Output = (C, Result<T, E>)>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 1;
    loop {
        let (returned, result) = op(ctx, attempt).await;
        ctx = returned;

        match result {
            Ok(value) => return (ctx, Ok(value)),
            Err(e) if attempt >= attempts || is_fatal(&e) => return (ctx, Err(e)),
            Err(e) => {
                tracing::debug!("Attempt {}/{} failed: {}", attempt, attempts, e);
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
