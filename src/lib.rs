pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod router;
pub mod state;
pub mod types;

pub use engine::{ContentEngine, MemoryEngine};
pub use router::app;
pub use state::{AdapterSettings, AppState};

#[cfg(test)]
pub mod testing;
