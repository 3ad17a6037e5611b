//! Relay client that keeps a room membership alive across disconnects.

pub mod agent;
pub mod error;

pub use agent::{
    spawn, ClientConfig, ClientHandle, ConnectionState, Orientation, Role, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_RETRY_DELAY,
};
pub use error::TransportError;
