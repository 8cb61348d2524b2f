pub mod boundary_set;
pub mod error;
