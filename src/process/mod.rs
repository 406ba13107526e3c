/*!
 * Process Module
 * Simulated process table and lifecycle state machine
 */

pub mod lifecycle;
pub mod table;
pub mod types;

// Re-export for convenience
pub use table::{CountedTransition, ProcessSnapshot, ProcessTable};
pub use types::*;
