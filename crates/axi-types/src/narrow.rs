use crate::{Burst, Resp};

/// The 32-bit AXI4 variant's channel bundles.
///
/// Everything about the protocol discipline (latched AR/AW, handshake
/// timing) is shared with the 256-bit path; only the data path narrows from
/// eight 32-bit lanes down to one, and `wstrb` narrows from a 32-bit
/// per-byte mask to a 4-bit one. `size` on this path only ever takes values
/// up to 2 (4-byte beats).
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowArChannel {
    pub valid: bool,
    pub ready: bool,
    pub addr: u32,
    pub id: u32,
    pub len: u8,
    pub size: u8,
    pub burst: Burst,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowAwChannel {
    pub valid: bool,
    pub ready: bool,
    pub addr: u32,
    pub id: u32,
    pub len: u8,
    pub size: u8,
    pub burst: Burst,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowRChannel {
    pub valid: bool,
    pub ready: bool,
    pub id: u32,
    pub data: u32,
    pub resp: Resp,
    pub rlast: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowWChannel {
    pub valid: bool,
    pub ready: bool,
    pub data: u32,
    /// 4-bit per-byte lane mask (bits 4..31 unused).
    pub wstrb: u8,
    pub wlast: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowBChannel {
    pub valid: bool,
    pub ready: bool,
    pub id: u32,
    pub resp: Resp,
}

/// The full channel set for one 32-bit AXI4 link.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowAxiIo {
    pub ar: NarrowArChannel,
    pub r: NarrowRChannel,
    pub aw: NarrowAwChannel,
    pub w: NarrowWChannel,
    pub b: NarrowBChannel,
}
