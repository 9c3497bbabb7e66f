//! Process split for the maze arena: blocking byte channels, the
//! request/reply client, the in-simulation adapter, and the controller-side
//! message server.

pub mod adapter;
pub mod server;
pub mod transport;

pub use adapter::{AdapterConfig, ClientAdapter, HostSnapshot};
pub use server::{
    ControllerServer, ServerConfig, ServerMetrics, SessionLogEntry, SessionLogKind,
};
pub use transport::{channel_pair, BlockingChannel, InMemoryChannel, RequestClient};
