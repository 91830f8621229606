pub mod leasing;
pub mod simulation;
pub mod tariff;
