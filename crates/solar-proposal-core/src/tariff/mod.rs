pub mod escalation;
pub mod projection;
pub mod tusd;
