use crate::{Burst, Resp};

/// AR (read address) channel signals, shared between a master (Bridge or
/// Router) and a slave (Router or target). `valid`/`addr`/`id`/`len`/`size`/
/// `burst` are driven by the master side; `ready` is driven by the slave.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArChannel {
    pub valid: bool,
    pub ready: bool,
    pub addr: u32,
    pub id: u32,
    pub len: u8,
    pub size: u8,
    pub burst: Burst,
}

/// AW (write address) channel; same shape as `ArChannel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwChannel {
    pub valid: bool,
    pub ready: bool,
    pub addr: u32,
    pub id: u32,
    pub len: u8,
    pub size: u8,
    pub burst: Burst,
}

/// R (read data) channel; driven by the slave side (`valid`/`data`/`id`/
/// `resp`/`rlast`), with `ready` driven by the master.
#[derive(Debug, Clone, Copy, Default)]
pub struct RChannel {
    pub valid: bool,
    pub ready: bool,
    pub id: u32,
    pub data: [u32; 8],
    pub resp: Resp,
    pub rlast: bool,
}

/// W (write data) channel; driven by the master side.
#[derive(Debug, Clone, Copy, Default)]
pub struct WChannel {
    pub valid: bool,
    pub ready: bool,
    pub data: [u32; 8],
    pub wstrb: u32,
    pub wlast: bool,
}

/// B (write response) channel; driven by the slave side.
#[derive(Debug, Clone, Copy, Default)]
pub struct BChannel {
    pub valid: bool,
    pub ready: bool,
    pub id: u32,
    pub resp: Resp,
}

/// The full set of AXI channels between one master port and one slave port.
///
/// A single `AxiIo` bundle sits between the Bridge and the Router, and
/// another (one per target) sits between the Router and each of the DRAM
/// and MMIO targets. Whichever component is "upstream" of a bundle drives
/// AR/AW/W payload and valid bits plus R/B ready bits; the "downstream"
/// component drives AR/AW/W ready and R/B payload and valid bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxiIo {
    pub ar: ArChannel,
    pub r: RChannel,
    pub aw: AwChannel,
    pub w: WChannel,
    pub b: BChannel,
}
