//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept)
//!     → connection.rs (id assignment, lifetime tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - One task per connection, one request per connection
//! - Each connection tracked so shutdown can report what is still running

pub mod connection;
pub mod listener;
