pub mod item;
pub mod requirement;
pub mod types;
