//! A fixed-latency DRAM fixture behind the Router's DDR port.
//!
//! Named in the core specification as an external collaborator (the
//! backing store the three CORE components never touch directly) and kept
//! deliberately small: a flat word array and the AXI3-constrained,
//! single-outstanding read/write state machine the 256-bit path needs to
//! exercise the Bridge/Router/MMIO Bus against something real. It replaces
//! the original's globally-linked `p_memory` array with an owned
//! [`Backing`] handle passed into the model's constructor.

use axi_types::{AxiIo, Resp, BEAT_BYTES};

/// Owned backing memory, word-addressed. Replaces the original's
/// process-wide `uint32_t *p_memory` global: a simulation constructs one,
/// hands it to [`DramModel::new`], and it is dropped with the model.
pub struct Backing {
    words: Vec<u32>,
}

impl Backing {
    /// Allocate a zeroed backing store of `word_count` 32-bit words.
    pub fn new(word_count: usize) -> Self {
        Self { words: vec![0; word_count] }
    }

    /// Preload a single word at a byte address, for test setup.
    pub fn set_word(&mut self, byte_addr: u32, value: u32) {
        if let Some(slot) = self.words.get_mut(byte_addr as usize / 4) {
            *slot = value;
        }
    }

    pub fn word(&self, byte_addr: u32) -> u32 {
        self.words.get(byte_addr as usize / 4).copied().unwrap_or(0xDEAD_BEEF)
    }

    fn read_word(&self, byte_addr: u32) -> u32 {
        self.words.get(byte_addr as usize / 4).copied().unwrap_or(0xDEAD_BEEF)
    }

    /// Apply a 4-bit per-byte write-enable nibble to the word at `byte_addr`.
    fn write_word(&mut self, byte_addr: u32, data: u32, wstrb_nibble: u8) {
        let Some(slot) = self.words.get_mut(byte_addr as usize / 4) else { return };
        let mut mask = 0u32;
        if wstrb_nibble & 0x1 != 0 {
            mask |= 0x0000_00FF;
        }
        if wstrb_nibble & 0x2 != 0 {
            mask |= 0x0000_FF00;
        }
        if wstrb_nibble & 0x4 != 0 {
            mask |= 0x00FF_0000;
        }
        if wstrb_nibble & 0x8 != 0 {
            mask |= 0xFF00_0000;
        }
        *slot = (data & mask) | (*slot & !mask);
    }
}

struct ReadActive {
    addr: u32,
    id: u32,
    len: u8,
    size: u8,
    beat_cnt: u8,
    latency_cnt: u32,
    in_data_phase: bool,
}

struct WriteActive {
    addr: u32,
    id: u32,
    len: u8,
    size: u8,
    beat_cnt: u8,
}

struct WriteResp {
    id: u32,
    latency_cnt: u32,
}

/// Default per-transaction latency (cycles from address-phase acceptance
/// to the first data/response beat becoming valid), matching the
/// reference model's `SIM_DDR_AXI3_LATENCY`.
pub const DEFAULT_DRAM_LATENCY: u32 = 100;

/// Cycle-accurate AXI3-constrained DRAM target: 256-bit beats, `INCR`
/// bursts only, a single outstanding read and a single outstanding write
/// at a time (a write's response may still be draining its latency
/// counter while the next AW is refused, mirroring the Bridge/Router's
/// own one-outstanding-per-direction invariant).
pub struct DramModel {
    pub axi_io: AxiIo,
    backing: Backing,
    latency: u32,
    r_active: Option<ReadActive>,
    w_active: Option<WriteActive>,
    w_resp: Option<WriteResp>,
    stall_ar: bool,
}

impl DramModel {
    pub fn new(backing: Backing, latency: u32) -> Self {
        Self {
            axi_io: AxiIo::default(),
            backing,
            latency,
            r_active: None,
            w_active: None,
            w_resp: None,
            stall_ar: false,
        }
    }

    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    pub fn backing_mut(&mut self) -> &mut Backing {
        &mut self.backing
    }

    /// Force `arready` low regardless of read-channel state, for exercising
    /// sustained AR backpressure in tests without racing `comb_outputs`.
    pub fn set_ar_stall(&mut self, stall: bool) {
        self.stall_ar = stall;
    }

    pub fn comb_outputs(&mut self) {
        self.axi_io.ar.ready = self.r_active.is_none() && !self.stall_ar;
        self.axi_io.aw.ready = self.w_active.is_none() && self.w_resp.is_none();
        self.axi_io.w.ready = self.w_active.is_some();

        match &self.r_active {
            Some(r) if r.in_data_phase => {
                let beat_addr = r.addr + (r.beat_cnt as u32) * BEAT_BYTES;
                let mut data = [0u32; 8];
                for (i, word) in data.iter_mut().enumerate() {
                    *word = self.backing.read_word(beat_addr + (i as u32) * 4);
                }
                self.axi_io.r.valid = true;
                self.axi_io.r.id = r.id;
                self.axi_io.r.data = data;
                self.axi_io.r.resp = Resp::Okay;
                self.axi_io.r.rlast = r.beat_cnt == r.len;
            }
            _ => self.axi_io.r.valid = false,
        }

        match &self.w_resp {
            Some(w) if w.latency_cnt >= self.latency => {
                self.axi_io.b.valid = true;
                self.axi_io.b.id = w.id;
                self.axi_io.b.resp = Resp::Okay;
            }
            _ => self.axi_io.b.valid = false,
        }
    }

    /// No live upstream signal to observe beyond what `comb_outputs`
    /// already settled; kept for symmetry with the other components.
    pub fn comb_inputs(&mut self) {}

    pub fn seq(&mut self) {
        if self.axi_io.aw.valid && self.axi_io.aw.ready {
            tracing::debug!(
                target: "sim_ddr",
                addr = self.axi_io.aw.addr,
                len = self.axi_io.aw.len,
                latency = self.latency,
                "AW accepted"
            );
            self.w_active = Some(WriteActive {
                addr: self.axi_io.aw.addr,
                id: self.axi_io.aw.id,
                len: self.axi_io.aw.len,
                size: self.axi_io.aw.size,
                beat_cnt: 0,
            });
        }

        if self.axi_io.w.valid && self.axi_io.w.ready {
            if let Some(active) = &mut self.w_active {
                let beat_addr = active.addr + (active.beat_cnt as u32) * BEAT_BYTES;
                for i in 0..8u32 {
                    let nibble = ((self.axi_io.w.wstrb >> (i * 4)) & 0xF) as u8;
                    if nibble != 0 {
                        self.backing.write_word(beat_addr + i * 4, self.axi_io.w.data[i as usize], nibble);
                    }
                }
                active.beat_cnt += 1;
                if self.axi_io.w.wlast {
                    self.w_resp = Some(WriteResp { id: active.id, latency_cnt: 0 });
                    self.w_active = None;
                }
            }
        }

        if self.axi_io.b.valid && self.axi_io.b.ready {
            self.w_resp = None;
        }
        if let Some(w) = &mut self.w_resp {
            w.latency_cnt += 1;
        }

        if self.axi_io.ar.valid && self.axi_io.ar.ready {
            tracing::debug!(
                target: "sim_ddr",
                addr = self.axi_io.ar.addr,
                len = self.axi_io.ar.len,
                latency = self.latency,
                "AR accepted"
            );
            self.r_active = Some(ReadActive {
                addr: self.axi_io.ar.addr,
                id: self.axi_io.ar.id,
                len: self.axi_io.ar.len,
                size: self.axi_io.ar.size,
                beat_cnt: 0,
                latency_cnt: 0,
                in_data_phase: false,
            });
        }

        if self.axi_io.r.valid && self.axi_io.r.ready {
            if let Some(active) = &mut self.r_active {
                if self.axi_io.r.rlast {
                    self.r_active = None;
                } else {
                    active.beat_cnt += 1;
                }
            }
        }

        if let Some(active) = &mut self.r_active {
            if !active.in_data_phase {
                active.latency_cnt += 1;
                if active.latency_cnt >= self.latency {
                    active.in_data_phase = true;
                }
            }
        }
    }
}
