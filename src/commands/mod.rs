//! Command Execution
//!
//! Maps parsed protocol commands onto cache-engine transactions and turns
//! their outcomes into wire responses.
//!
//! ```text
//! Command ──► CommandHandler::execute ──► CacheEngine ──► Response
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::CommandHandler;
