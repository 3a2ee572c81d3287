pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod output;
pub mod remote;
pub mod retrieval;

pub use error::Error;
