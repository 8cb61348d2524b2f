pub mod error;
pub mod image_collection;
pub mod loader;
