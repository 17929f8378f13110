use axi_types::{AxiId, AxiIo, Resp};

use crate::device::MmioDevice;
use crate::region::{RegionError, RegionList};

fn words_to_bytes(words: &[u32; 8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, w) in words.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }
    out
}

fn bytes_to_words(bytes: &[u8; 32]) -> [u32; 8] {
    let mut out = [0u32; 8];
    for (i, chunk) in bytes.chunks(4).enumerate() {
        out[i] = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    out
}

struct PendingRead {
    packed_id: u32,
    data: [u8; 32],
    resp: Resp,
    latency_cnt: u32,
}

struct PendingWriteAddr {
    packed_id: u32,
    addr: u32,
}

struct PendingWriteResp {
    packed_id: u32,
    resp: Resp,
    latency_cnt: u32,
}

/// AXI slave on the 256-bit data bus: decodes region ranges, forwards
/// byte-granular access to a pluggable [`MmioDevice`], and applies a fixed
/// response latency. Every transaction on this path is single-beat FIXED —
/// the Bridge refuses to issue anything that would straddle two beats, so
/// this bus never has to reassemble a multi-beat MMIO burst.
pub struct MmioBus {
    pub axi_io: AxiIo,
    regions: RegionList,
    latency: u32,

    pending_read: Option<PendingRead>,
    pending_write_addr: Option<PendingWriteAddr>,
    pending_write_resp: Option<PendingWriteResp>,
}

/// Number of cycles a request sits in the bus before its response channel
/// goes valid, absent a configured override.
pub const DEFAULT_MMIO_LATENCY: u32 = 1;

impl MmioBus {
    pub fn new(latency: u32) -> Self {
        Self {
            axi_io: AxiIo::default(),
            regions: RegionList::default(),
            latency,
            pending_read: None,
            pending_write_addr: None,
            pending_write_resp: None,
        }
    }

    /// Register a device over `[base, base + size)`. First-match wins on
    /// overlap with an already-registered region.
    pub fn add_device(&mut self, base: u32, size: u32, device: Box<dyn MmioDevice>) -> Result<(), RegionError> {
        self.regions.add(base, size, device)
    }

    pub fn comb_outputs(&mut self) {
        self.axi_io.ar.ready = self.pending_read.is_none();
        self.axi_io.aw.ready = self.pending_write_addr.is_none() && self.pending_write_resp.is_none();
        self.axi_io.w.ready = self.pending_write_addr.is_some();

        match &self.pending_read {
            Some(p) if p.latency_cnt >= self.latency => {
                self.axi_io.r.valid = true;
                self.axi_io.r.id = p.packed_id;
                self.axi_io.r.data = bytes_to_words(&p.data);
                self.axi_io.r.resp = p.resp;
                self.axi_io.r.rlast = true;
            }
            _ => self.axi_io.r.valid = false,
        }

        match &self.pending_write_resp {
            Some(p) if p.latency_cnt >= self.latency => {
                self.axi_io.b.valid = true;
                self.axi_io.b.id = p.packed_id;
                self.axi_io.b.resp = p.resp;
            }
            _ => self.axi_io.b.valid = false,
        }
    }

    /// The MMIO Bus has nothing to decide from fresh upstream signals that
    /// it didn't already settle in `comb_outputs`; this is a no-op kept for
    /// symmetry with the other components' three-phase interface.
    pub fn comb_inputs(&mut self) {}

    pub fn seq(&mut self) {
        if let Some(p) = &mut self.pending_read {
            if !(self.axi_io.r.valid && self.axi_io.r.ready) {
                p.latency_cnt += 1;
            }
        }
        if let Some(p) = &mut self.pending_write_resp {
            if !(self.axi_io.b.valid && self.axi_io.b.ready) {
                p.latency_cnt += 1;
            }
        }

        if self.axi_io.r.valid && self.axi_io.r.ready {
            self.pending_read = None;
        }
        if self.axi_io.b.valid && self.axi_io.b.ready {
            self.pending_write_resp = None;
        }

        if self.axi_io.ar.valid && self.axi_io.ar.ready && self.pending_read.is_none() {
            self.accept_ar();
        }
        if self.axi_io.aw.valid
            && self.axi_io.aw.ready
            && self.pending_write_addr.is_none()
            && self.pending_write_resp.is_none()
        {
            self.pending_write_addr = Some(PendingWriteAddr { packed_id: self.axi_io.aw.id, addr: self.axi_io.aw.addr });
        }
        if self.axi_io.w.valid && self.axi_io.w.ready && self.axi_io.w.wlast {
            if let Some(pw) = self.pending_write_addr.take() {
                self.accept_w(pw);
            }
        }

        self.regions.tick_all();
    }

    fn accept_ar(&mut self) {
        let id = AxiId::unpack(self.axi_io.ar.id);
        let offset = id.offset as u32;
        let bytes = id.bytes();
        let addr = self.axi_io.ar.addr + offset;

        let mut data = [0u8; 32];
        let resp = match self.regions.find_mut(addr) {
            Some((region, rel)) => {
                region.device.read(rel, &mut data[offset as usize..(offset + bytes) as usize]);
                Resp::Okay
            }
            None => {
                tracing::debug!(target: "mmio_bus", addr, "AR region miss");
                Resp::DecErr
            }
        };

        self.pending_read = Some(PendingRead { packed_id: self.axi_io.ar.id, data, resp, latency_cnt: 0 });
    }

    fn accept_w(&mut self, pw: PendingWriteAddr) {
        let id = AxiId::unpack(pw.packed_id);
        let offset = id.offset as u32;
        let bytes = id.bytes();
        let addr = pw.addr + offset;

        let beat = words_to_bytes(&self.axi_io.w.data);
        let mut buf = [0u8; 32];
        let mut mask = 0u32;
        for j in 0..bytes {
            let bit = offset + j;
            if (self.axi_io.w.wstrb >> bit) & 1 == 1 {
                buf[j as usize] = beat[bit as usize];
                mask |= 1 << j;
            }
        }

        let resp = match self.regions.find_mut(addr) {
            Some((region, rel)) => {
                region.device.write(rel, &buf[..bytes as usize], mask);
                Resp::Okay
            }
            None => {
                tracing::debug!(target: "mmio_bus", addr, "AW region miss");
                Resp::DecErr
            }
        };

        self.pending_write_resp = Some(PendingWriteResp { packed_id: pw.packed_id, resp, latency_cnt: 0 });
    }
}
