//! Request execution infrastructure for the fleet node
//!
//! This module handles:
//! - Receiving requests from operator consoles
//! - Dispatching to the appropriate request handler
//! - Wrapping handler output in acknowledged response envelopes

mod executor;
pub mod handlers;

pub use executor::RequestExecutor;
