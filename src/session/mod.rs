//! Session management for connected operator consoles
//!
//! This module handles:
//! - Accepting console connections
//! - Reading framed requests and writing acknowledged responses
//! - Tracking connected clients and closing idle sessions

mod connection;
mod manager;

pub use connection::accept_loop;
pub use manager::SessionManager;
