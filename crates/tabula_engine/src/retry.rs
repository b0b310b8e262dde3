//! Bounded-retry execution of transactional units of work.
//!
//! Every catalog and collection operation runs through [`atomic`] or
//! [`atomic_get`]. Each attempt gets a fresh transaction. A successful unit
//! of work is committed. A failure (from the work itself or from commit
//! validation) rolls the attempt back and the work runs again, up to the
//! given bound. When every attempt fails the caller receives a single
//! `TransactionExhausted` error carrying the last failure.
//!
//! Validation errors raised by the work (see [`Error::is_validation`]) are
//! deterministic: the attempt is rolled back and the error is returned as is.

use tabula_foundation::{Error, Result};
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::transaction::Transaction;

/// Runs `work` atomically, retrying up to `max_retries` times.
///
/// # Errors
///
/// Returns a validation error raised by `work`, `TransactionExhausted` if no
/// attempt committed, or `Closed` if the engine is closed.
pub fn atomic<F>(engine: &Engine, max_retries: u32, work: F) -> Result<()>
where
    F: FnMut(&mut Transaction<'_>) -> Result<()>,
{
    atomic_get(engine, max_retries, work)
}

/// Runs `work` atomically and returns its result, retrying up to
/// `max_retries` times.
///
/// The closure may run several times, so it must not have side effects
/// outside the transaction it is given.
///
/// # Errors
///
/// Returns a validation error raised by `work`, `TransactionExhausted` if no
/// attempt committed, or `Closed` if the engine is closed.
pub fn atomic_get<T, F>(engine: &Engine, max_retries: u32, mut work: F) -> Result<T>
where
    F: FnMut(&mut Transaction<'_>) -> Result<T>,
{
    let mut last: Option<Error> = None;

    for attempt in 1..=max_retries {
        let mut tx = engine.begin()?;
        let tx_id = tx.id();

        let failure = match work(&mut tx) {
            Ok(value) => match tx.commit() {
                Ok(()) => return Ok(value),
                Err(e) => e,
            },
            Err(e) => {
                tx.rollback();
                if e.is_validation() {
                    debug!(tx = tx_id, attempt, error = %e, "unit of work rejected");
                    return Err(e);
                }
                e
            }
        };

        debug!(tx = tx_id, attempt, max_retries, error = %failure, "transaction attempt failed");
        last = Some(failure);
    }

    warn!(
        attempts = max_retries,
        last_error = ?last,
        "unable to perform transaction correctly"
    );
    Err(Error::transaction_exhausted(max_retries, last))
}
