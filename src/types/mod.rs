pub mod composite;
pub mod data_source;
pub mod date_range;
pub mod image;
pub mod region;
pub mod sample;
