//! # sumwire-client
//!
//! Client for a line-oriented challenge-response checksum protocol.
//!
//! The client connects, sends `HELLO\n`, scans the server's preamble for the
//! `RES` marker, decodes the length-prefixed frame that follows it, replies
//! with `SUM<checksum>\n` and returns the server's final line.
//!
//! ## Architecture
//!
//! - **Ring buffer**: lock-free SPSC byte ring between a socket reader thread
//!   and the marker scanner thread
//! - **Protocol**: marker scanner, frame decoder, payload checksum
//! - **Session**: the per-connection state machine
//! - **Transport**: TCP connect with explicit timeouts
//!
//! ## Example
//!
//! ```ignore
//! use sumwire_client::Client;
//!
//! let exchange = Client::builder()
//!     .host("127.0.0.1")
//!     .port(9048)
//!     .build()?
//!     .run()?;
//!
//! println!("{}", exchange.response);
//! ```

pub mod error;
pub mod output;
pub mod protocol;
pub mod ring_buffer;
pub mod session;
pub mod transport;

mod client;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::{Result, SumwireError};
pub use session::{Exchange, Session, SessionConfig, SessionState};
