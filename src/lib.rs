pub mod config;
pub mod location;
pub mod map;
pub mod notice;
pub mod search;
pub mod task;

pub use search::{LocationSearchController, SearchContext};
