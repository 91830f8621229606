pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "tariff")]
pub mod tariff;

#[cfg(feature = "leasing")]
pub mod leasing;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use error::ProposalError;
pub use types::*;

/// Standard result type for all proposal-engine operations
pub type ProposalResult<T> = Result<T, ProposalError>;
