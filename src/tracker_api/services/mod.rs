pub mod health;
pub mod listing;
pub mod preferences;
pub mod sync;
pub mod visit;
pub mod works;
