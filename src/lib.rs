pub mod ai;
pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod exam;
pub mod progress;
pub mod rag;
