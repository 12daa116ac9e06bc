//! Client builder and connection lifecycle.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the server
//! endpoint and protocol parameters. The [`Client`] then runs one exchange
//! per call:
//! 1. Connect to the configured endpoint
//! 2. Run a [`Session`] over the socket, shutting it down if the scan
//!    gives up while a read is still pending
//! 3. Close the socket
//!
//! # Example
//!
//! ```ignore
//! use sumwire_client::Client;
//!
//! let client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(9048)
//!     .capacity(4)
//!     .build()?;
//!
//! let exchange = client.run()?;
//! println!("{}", exchange.response);
//! ```

use std::time::Duration;

use crate::error::{Result, SumwireError};
use crate::session::{Exchange, Session, SessionConfig};
use crate::transport::{connect, interrupt_handle, Endpoint, SocketTimeouts};

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub timeouts: SocketTimeouts,
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Check the configuration before connecting.
    pub fn validate(&self) -> Result<()> {
        if self.session.capacity == 0 {
            return Err(SumwireError::Config(
                "ring buffer capacity must be at least 1".into(),
            ));
        }
        if self.session.marker.is_empty() {
            return Err(SumwireError::Config("marker must not be empty".into()));
        }
        if self.endpoint.host.is_empty() {
            return Err(SumwireError::Config("host must not be empty".into()));
        }
        Ok(())
    }
}

/// Builder for configuring and creating a client.
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Server host name or address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.endpoint.host = host.into();
        self
    }

    /// Server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.endpoint.port = port;
        self
    }

    /// Ring buffer capacity used while scanning for the marker.
    ///
    /// Default: 4
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.session.capacity = capacity;
        self
    }

    /// Greeting sent right after connecting.
    ///
    /// Default: `HELLO\n`
    pub fn greeting(mut self, greeting: impl Into<Vec<u8>>) -> Self {
        self.config.session.greeting = greeting.into();
        self
    }

    /// Marker that precedes the frame.
    ///
    /// Default: `RES`
    pub fn marker(mut self, marker: impl Into<Vec<u8>>) -> Self {
        self.config.session.marker = marker.into();
        self
    }

    /// Maximum preamble bytes scanned before giving up.
    ///
    /// Default: 64 KiB
    pub fn max_preamble(mut self, bytes: u64) -> Self {
        self.config.session.scan_limits.max_preamble = bytes;
        self
    }

    /// Scan deadline. `None` scans until the stream ends.
    ///
    /// Default: 30 seconds
    pub fn scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.session.scan_limits.timeout = timeout;
        self
    }

    /// Connect timeout.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeouts.connect = timeout;
        self
    }

    /// Socket read/write timeout.
    ///
    /// Default: 30 seconds
    pub fn io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeouts.io = timeout;
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<Client> {
        Client::new(self.config)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured client. Each [`Client::run`] opens a fresh connection.
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect and run one exchange, blocking the calling thread.
    pub fn run(&self) -> Result<Exchange> {
        let stream = connect(&self.config.endpoint, &self.config.timeouts)?;
        tracing::info!(endpoint = %self.config.endpoint, "connected");

        let interrupt = interrupt_handle(&stream)?;
        let mut session = Session::new(stream, self.config.session.clone()).with_interrupt(interrupt);
        let exchange = session.run()?;
        tracing::info!(checksum = exchange.checksum, "exchange complete");
        Ok(exchange)
    }

    /// Run the exchange on tokio's blocking pool.
    ///
    /// The scanning threads busy-wait, so the exchange must never run on an
    /// async worker thread.
    pub async fn run_async(self) -> Result<Exchange> {
        match tokio::task::spawn_blocking(move || self.run()).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(SumwireError::Io(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                e,
            ))),
        }
    }
}
