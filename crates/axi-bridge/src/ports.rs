use axi_types::Resp;

/// A master's simplified read request, valid for one cycle at a time until
/// `ready` pulses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadReq {
    pub valid: bool,
    pub ready: bool,
    pub addr: u32,
    /// Bytes requested minus one (`0..=31`).
    pub total_size: u8,
    pub id: u8,
}

/// A master's simplified read response. Stays `valid` until the master
/// pulses `ready`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadResp {
    pub valid: bool,
    pub ready: bool,
    pub data: [u32; 8],
    pub id: u8,
    pub status: Resp,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadMasterPort {
    pub req: ReadReq,
    pub resp: ReadResp,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteReq {
    pub valid: bool,
    pub ready: bool,
    pub addr: u32,
    pub wdata: [u32; 8],
    pub wstrb: u32,
    pub total_size: u8,
    pub id: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteResp {
    pub valid: bool,
    pub ready: bool,
    pub id: u8,
    pub resp: Resp,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteMasterPort {
    pub req: WriteReq,
    pub resp: WriteResp,
}
