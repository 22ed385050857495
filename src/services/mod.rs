pub mod cache;
pub mod dashboard;
