pub mod dates;
pub mod models;
pub mod pages;

pub use models::*;
