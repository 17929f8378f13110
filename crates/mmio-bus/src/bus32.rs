use axi_types::{Burst, NarrowAxiIo, Resp};

use crate::region::RegionList;

struct PendingRead {
    id: u32,
    addr: u32,
    burst: Burst,
    len: u8,
    beat: u8,
    data: u32,
    resp: Resp,
    latency_cnt: u32,
}

struct PendingWriteAddr {
    id: u32,
    addr: u32,
    burst: Burst,
    len: u8,
    beat: u8,
}

struct PendingWriteResp {
    id: u32,
    resp: Resp,
    latency_cnt: u32,
}

/// The 32-bit AXI4 MMIO bus variant: one beat at a time, supporting
/// multi-beat `INCR` bursts (each beat touches the next 4-byte address) as
/// well as `FIXED` (every beat touches the same address, used for
/// FIFO-style device registers). Unlike the 256-bit path this variant has
/// no single-beat invariant to lean on, so every beat runs its own
/// independent region lookup.
pub struct MmioBus32 {
    pub axi_io: NarrowAxiIo,
    regions: RegionList,
    latency: u32,

    pending_read: Option<PendingRead>,
    pending_write_addr: Option<PendingWriteAddr>,
    pending_write_resp: Option<PendingWriteResp>,
}

impl MmioBus32 {
    pub fn new(latency: u32) -> Self {
        Self {
            axi_io: NarrowAxiIo::default(),
            regions: RegionList::default(),
            latency,
            pending_read: None,
            pending_write_addr: None,
            pending_write_resp: None,
        }
    }

    pub fn add_device(
        &mut self,
        base: u32,
        size: u32,
        device: Box<dyn crate::device::MmioDevice>,
    ) -> Result<(), crate::region::RegionError> {
        self.regions.add(base, size, device)
    }

    pub fn comb_outputs(&mut self) {
        self.axi_io.ar.ready = self.pending_read.is_none();
        self.axi_io.aw.ready = self.pending_write_addr.is_none() && self.pending_write_resp.is_none();
        self.axi_io.w.ready = self.pending_write_addr.is_some();

        match &self.pending_read {
            Some(p) if p.latency_cnt >= self.latency => {
                self.axi_io.r.valid = true;
                self.axi_io.r.id = p.id;
                self.axi_io.r.data = p.data;
                self.axi_io.r.resp = p.resp;
                self.axi_io.r.rlast = p.beat == p.len;
            }
            _ => self.axi_io.r.valid = false,
        }

        match &self.pending_write_resp {
            Some(p) if p.latency_cnt >= self.latency => {
                self.axi_io.b.valid = true;
                self.axi_io.b.id = p.id;
                self.axi_io.b.resp = p.resp;
            }
            _ => self.axi_io.b.valid = false,
        }
    }

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
            let done = self.pending_read.as_ref().unwrap().beat == self.pending_read.as_ref().unwrap().len;
            if done {
                self.pending_read = None;
            } else {
                self.advance_read_beat();
            }
        }
        if self.axi_io.b.valid && self.axi_io.b.ready {
            self.pending_write_resp = None;
        }

        if self.axi_io.ar.valid && self.axi_io.ar.ready && self.pending_read.is_none() {
            let (addr, id, len, burst) = (self.axi_io.ar.addr, self.axi_io.ar.id, self.axi_io.ar.len, self.axi_io.ar.burst);
            self.pending_read = Some(self.fetch_beat(id, addr, burst, len, 0));
        }
        if self.axi_io.aw.valid
            && self.axi_io.aw.ready
            && self.pending_write_addr.is_none()
            && self.pending_write_resp.is_none()
        {
            self.pending_write_addr = Some(PendingWriteAddr {
                id: self.axi_io.aw.id,
                addr: self.axi_io.aw.addr,
                burst: self.axi_io.aw.burst,
                len: self.axi_io.aw.len,
                beat: 0,
            });
        }
        if self.axi_io.w.valid && self.axi_io.w.ready {
            self.accept_w_beat();
        }

        self.regions.tick_all();
    }

    fn beat_addr(addr: u32, burst: Burst, beat: u8) -> u32 {
        match burst {
            Burst::Incr => addr + (beat as u32) * 4,
            Burst::Fixed => addr,
        }
    }

    fn fetch_beat(&mut self, id: u32, addr: u32, burst: Burst, len: u8, beat: u8) -> PendingRead {
        let beat_addr = Self::beat_addr(addr, burst, beat);
        let mut bytes = [0u8; 4];
        let resp = match self.regions.find_mut(beat_addr) {
            Some((region, rel)) => {
                region.device.read(rel, &mut bytes);
                Resp::Okay
            }
            None => {
                tracing::debug!(target: "mmio_bus", addr = beat_addr, "AR region miss (AXI4)");
                Resp::DecErr
            }
        };
        PendingRead { id, addr, burst, len, beat, data: u32::from_le_bytes(bytes), resp, latency_cnt: 0 }
    }

    fn advance_read_beat(&mut self) {
        let p = self.pending_read.take().unwrap();
        let next_beat = p.beat + 1;
        self.pending_read = Some(self.fetch_beat(p.id, p.addr, p.burst, p.len, next_beat));
    }

    fn accept_w_beat(&mut self) {
        let Some(pw) = &self.pending_write_addr else { return };
        let beat_addr = Self::beat_addr(pw.addr, pw.burst, pw.beat);
        let data = self.axi_io.w.data.to_le_bytes();
        let mut buf = [0u8; 4];
        let mut mask = 0u32;
        for i in 0..4 {
            if (self.axi_io.w.wstrb >> i) & 1 == 1 {
                buf[i] = data[i];
                mask |= 1 << i;
            }
        }
        let resp = match self.regions.find_mut(beat_addr) {
            Some((region, rel)) => {
                region.device.write(rel, &buf, mask);
                Resp::Okay
            }
            None => {
                tracing::debug!(target: "mmio_bus", addr = beat_addr, "AW region miss (AXI4)");
                Resp::DecErr
            }
        };

        let pw = self.pending_write_addr.as_mut().unwrap();
        if self.axi_io.w.wlast || pw.beat == pw.len {
            let id = pw.id;
            self.pending_write_addr = None;
            self.pending_write_resp = Some(PendingWriteResp { id, resp, latency_cnt: 0 });
        } else {
            pw.beat += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MmioDevice;
    use axi_types::NarrowArChannel;

    struct Reg(Vec<u8>);
    impl MmioDevice for Reg {
        fn read(&mut self, addr: u32, out: &mut [u8]) {
            for (i, b) in out.iter_mut().enumerate() {
                *b = self.0.get(addr as usize + i).copied().unwrap_or(0);
            }
        }
        fn write(&mut self, addr: u32, data: &[u8], wstrb_mask: u32) {
            for (i, &b) in data.iter().enumerate() {
                if (wstrb_mask >> i) & 1 == 1 {
                    if let Some(slot) = self.0.get_mut(addr as usize + i) {
                        *slot = b;
                    }
                }
            }
        }
    }

    fn run_cycle(bus: &mut MmioBus32) {
        bus.comb_outputs();
        bus.comb_inputs();
        bus.seq();
    }

    #[test]
    fn three_beat_incr_burst_touches_consecutive_addresses() {
        let mut bus = MmioBus32::new(1);
        bus.add_device(0, 0x10, Box::new(Reg(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]))).unwrap();

        bus.axi_io.ar = NarrowArChannel { valid: true, ready: false, addr: 0, id: 9, len: 2, size: 2, burst: Burst::Incr };

        let mut beats = Vec::new();
        for _ in 0..40 {
            run_cycle(&mut bus);
            if bus.axi_io.r.valid {
                beats.push((bus.axi_io.r.data, bus.axi_io.r.rlast));
                bus.axi_io.r.ready = true;
                bus.axi_io.ar.valid = false;
                if bus.axi_io.r.rlast {
                    break;
                }
            } else {
                bus.axi_io.r.ready = false;
            }
        }
        assert_eq!(beats.len(), 3);
        assert!(!beats[0].1 && !beats[1].1 && beats[2].1);
        assert_eq!(beats[0].0.to_le_bytes()[..4], [1, 2, 3, 4]);
        assert_eq!(beats[1].0.to_le_bytes()[..4], [5, 6, 7, 8]);
        assert_eq!(beats[2].0.to_le_bytes()[..4], [9, 10, 11, 12]);
    }

    #[test]
    fn fixed_burst_rereads_same_address_every_beat() {
        let mut bus = MmioBus32::new(1);
        bus.add_device(0, 0x10, Box::new(Reg(vec![0x42; 16]))).unwrap();
        bus.axi_io.ar = NarrowArChannel { valid: true, ready: false, addr: 4, id: 0, len: 1, size: 2, burst: Burst::Fixed };

        let mut count = 0;
        for _ in 0..20 {
            run_cycle(&mut bus);
            if bus.axi_io.r.valid {
                assert_eq!(bus.axi_io.r.data & 0xFF, 0x42);
                bus.axi_io.r.ready = true;
                bus.axi_io.ar.valid = false;
                count += 1;
                if bus.axi_io.r.rlast {
                    break;
                }
            } else {
                bus.axi_io.r.ready = false;
            }
        }
        assert_eq!(count, 2);
    }
}
