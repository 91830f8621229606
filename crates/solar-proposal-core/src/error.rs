use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    /// A result that cannot be represented, such as an overflowing sum.
    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),
}
