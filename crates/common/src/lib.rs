pub mod cache;
pub mod config;
pub mod fanout;
pub mod observability;
pub mod types;
