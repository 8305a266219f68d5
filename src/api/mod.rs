// src/api/mod.rs
pub mod dispatch;
pub mod queue;
pub mod stats;

// Re-export all route functions
pub use dispatch::*;
pub use queue::*;
pub use stats::*;
