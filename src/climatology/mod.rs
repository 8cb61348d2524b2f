pub mod composite_collection;
pub mod day_of_year;
pub mod region_mask;
