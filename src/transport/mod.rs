//! Transport module - TCP connection to the challenge server.

mod tcp;

pub use tcp::{
    connect, interrupt_handle, Endpoint, SocketTimeouts, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST,
    DEFAULT_IO_TIMEOUT, DEFAULT_PORT,
};
