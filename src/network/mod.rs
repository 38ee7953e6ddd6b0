// Network module - SawitDB line protocol client

pub mod client;
pub mod connector;
pub mod protocol;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ClientConfig, ClientStats, RemoteClient};
pub use connector::{Connector, TcpConnector};
pub use protocol::{ResponseEnvelope, decode_response, encode_request};
