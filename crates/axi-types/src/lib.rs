//! Shared wire types for the AXI bridge/router/MMIO-bus simulation kit.
//!
//! Nothing in this crate runs a cycle; it only defines the bundles and the
//! packed-ID codec the three component crates agree on.

mod channels;
mod id;
mod latch;
mod map;
mod narrow;
mod resp;

pub use channels::{ArChannel, AwChannel, AxiIo, BChannel, RChannel, WChannel};
pub use id::{AxiId, IdDecodeError, MASTER_ID_BITS, OFFSET_BITS, ORIG_ID_BITS, TOTAL_SIZE_BITS};
pub use latch::Latched;
pub use map::MmioMap;
pub use narrow::{
    NarrowArChannel, NarrowAwChannel, NarrowAxiIo, NarrowBChannel, NarrowRChannel, NarrowWChannel,
};
pub use resp::Resp;

/// Width in bytes of one AXI3-side beat (256-bit data bus).
pub const BEAT_BYTES: u32 = 32;

/// `log2(BEAT_BYTES)`, the `arsize`/`awsize` value used on the 256-bit path.
pub const BEAT_SIZE_LOG2: u8 = 5;

/// Number of simplified read master ports the Bridge exposes.
pub const NUM_READ_MASTERS: usize = 4;

/// Number of simplified write master ports the Bridge exposes.
pub const NUM_WRITE_MASTERS: usize = 2;

/// Index of the data-cache read master port, matching the original layout.
pub const MASTER_ICACHE: usize = 0;
pub const MASTER_DCACHE_R: usize = 1;
pub const MASTER_MMU: usize = 2;
pub const MASTER_DCACHE_W: usize = 0;
pub const MASTER_EXTRA_W: usize = 1;

/// Burst type on the downstream AXI port. WRAP is never produced by this kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Burst {
    Fixed,
    Incr,
}

impl Default for Burst {
    fn default() -> Self {
        Burst::Incr
    }
}

/// Compute the number of 32-byte beats a `[offset, offset+bytes)` window spans.
///
/// Returns `None` when the window would span more than two beats, which is
/// never legal on this bus (payloads are at most 32 bytes).
pub fn calc_beats(offset: u32, bytes: u32) -> Option<u8> {
    if bytes == 0 {
        return None;
    }
    let span = offset.checked_add(bytes)?;
    let beats = span.div_ceil(BEAT_BYTES);
    if beats == 1 || beats == 2 {
        Some(beats as u8)
    } else {
        None
    }
}
