pub mod kpi;
pub mod scenario;
