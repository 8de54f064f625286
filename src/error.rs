//! Contract-violation errors, kept separate from business-condition results.
//!
//! Expected business conditions (bad quantity, unavailable color, cap
//! breaches) never surface here; they come back as unsuccessful
//! [`CartOutcome`](crate::cart::CartOutcome) values. `EngineError` is
//! reserved for malformed inputs that indicate a caller bug.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session id must not be empty")]
    EmptySessionId,

    #[error("add_items called with an empty item batch")]
    EmptyItemBatch,
}
