//! Translates simplified per-master read/write ports into a single
//! protocol-legal bursting AXI stream, and reassembles the responses.

mod bridge;
pub mod ports;

pub use bridge::Bridge;
