//! Recovery policy for worker-side render failures
//!
//! Not a separate task: workers call [`classify`] inline from their error
//! handling. Only rate-limiting earns a client replacement and a requeue;
//! everything else consumes the item.

use crate::render::RenderError;

/// What a worker should do with the in-flight item after a render failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Replace the render client and put the item back on the queue
    Requeue,

    /// Log, mark the item consumed, move on
    DropAndContinue,
}

/// Classifies a render failure.
///
/// Rate-limit detection leans on the structured status code when present and
/// degrades to text matching otherwise (see `RenderError::is_rate_limit`);
/// render engines that only surface stringly-typed errors leave us no better
/// signal.
pub fn classify(error: &RenderError) -> RecoveryAction {
    if error.is_rate_limit() {
        RecoveryAction::Requeue
    } else {
        RecoveryAction::DropAndContinue
    }
}
