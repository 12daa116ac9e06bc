//! TCP connection setup.
//!
//! The exchange runs on plain blocking sockets: the producer thread needs a
//! `Read` it can park in. Read and write timeouts put an upper bound on how
//! long a silent peer can stall any single step.
//!
//! # Example
//!
//! ```ignore
//! use sumwire_client::transport::{connect, Endpoint, SocketTimeouts};
//!
//! let endpoint = Endpoint::new("npm.mipt.ru", 9048);
//! let stream = connect(&endpoint, &SocketTimeouts::default())?;
//! ```

use std::fmt;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, SumwireError};

/// Default server host.
pub const DEFAULT_HOST: &str = "npm.mipt.ru";

/// Default server port.
pub const DEFAULT_PORT: u16 = 9048;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default socket read/write timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Server address as configured (resolved at connect time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Socket timeouts. `None` disables the corresponding bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketTimeouts {
    pub connect: Option<Duration>,
    pub io: Option<Duration>,
}

impl Default for SocketTimeouts {
    fn default() -> Self {
        Self {
            connect: Some(DEFAULT_CONNECT_TIMEOUT),
            io: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

/// Open a TCP connection to `endpoint`, trying each resolved address in
/// turn.
///
/// # Errors
///
/// Returns `Connection` if resolution fails or no address accepts.
pub fn connect(endpoint: &Endpoint, timeouts: &SocketTimeouts) -> Result<TcpStream> {
    let addr = endpoint.to_string();
    let connection_error = |source| SumwireError::Connection {
        addr: addr.clone(),
        source,
    };

    let candidates: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(connection_error)?
        .collect();

    let mut last_err = std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "host resolved to no addresses",
    );
    for candidate in candidates {
        let attempt = match timeouts.connect {
            Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
            None => TcpStream::connect(candidate),
        };
        match attempt {
            Ok(stream) => {
                configure(&stream, timeouts)?;
                tracing::debug!(%candidate, "connected");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(%candidate, "connect failed: {}", e);
                last_err = e;
            }
        }
    }

    Err(connection_error(last_err))
}

/// Handle that shuts `stream` down from another thread, waking any read
/// parked on it. Reads then see end-of-stream.
pub fn interrupt_handle(stream: &TcpStream) -> Result<impl Fn() + Send + 'static> {
    let handle = stream.try_clone()?;
    Ok(move || {
        if let Err(e) = handle.shutdown(Shutdown::Both) {
            tracing::debug!("socket shutdown failed: {}", e);
        }
    })
}

fn configure(stream: &TcpStream, timeouts: &SocketTimeouts) -> Result<()> {
    stream.set_read_timeout(timeouts.io)?;
    stream.set_write_timeout(timeouts.io)?;
    stream.set_nodelay(true)?;
    Ok(())
}
