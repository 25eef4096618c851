//! Bounded retry of fallible numerical procedures

use tracing::debug;

/// Outcome of a bounded retry loop
#[derive(Clone, Debug, PartialEq)]
pub struct Retried<T> {
    /// Output of the last attempt
    pub value: T,

    /// Number of attempts which were made
    pub attempts: usize,

    /// Whether the last attempt was accepted
    pub succeeded: bool,
}

/// Run `attempt` until `accept` approves its output, at most `max_attempts`
/// times, and return the last output
///
/// The attempt closure receives the zero-based attempt number. A budget of
/// zero attempts is treated as one.
///
pub fn retry_bounded<T>(
    max_attempts: usize,
    mut attempt: impl FnMut(usize) -> T,
    mut accept: impl FnMut(&T) -> bool,
) -> Retried<T> {
    let max_attempts = max_attempts.max(1);
    let mut attempt_idx = 0;
    loop {
        let value = attempt(attempt_idx);
        attempt_idx += 1;
        let succeeded = accept(&value);
        if succeeded || attempt_idx >= max_attempts {
            return Retried {
                value,
                attempts: attempt_idx,
                succeeded,
            };
        }
        debug!("Attempt {attempt_idx}/{max_attempts} was rejected, retrying");
    }
}
