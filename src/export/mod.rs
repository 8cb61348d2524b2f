pub mod chart;
pub mod csv_export;
pub mod error;
pub mod job;
