//! Realtime core components: the per-client delivery pipeline and the
//! process-wide membership registry.

mod connection;
mod registry;

pub use connection::Connection;
pub use registry::Registry;
