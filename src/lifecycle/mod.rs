//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() → closed flag set → accept loop wakes → listener dropped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → caller closes the server handle
//! ```
//!
//! # Design Decisions
//! - The closed flag belongs to one server instance; there is no process global
//! - Closing stops accepting only; accepted connections run to completion

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
