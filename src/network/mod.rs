//! Peer communication seam
//!
//! The ledger never performs network I/O itself. Outbound broadcasts go
//! through a `Transport`; inbound traffic arrives as `Package`s handed to the
//! node's entry points.

pub mod message;
pub mod transport;

pub use message::Package;
pub use transport::{LoggingTransport, Transport};
