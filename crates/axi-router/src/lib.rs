//! Demultiplexes a single bursting AXI master stream (from the Bridge) to
//! one of two downstream targets — DRAM or MMIO — based on address decode.
//!
//! The Router tracks exactly one outstanding read and one outstanding write
//! transaction, matching the Bridge's own single-outstanding invariant. It
//! never buffers a beat: every cycle it combinationally mirrors signals
//! between the upstream link and whichever downstream link is currently (or,
//! for a fresh AW+W, about to be) selected.

use axi_types::{ArChannel, AwChannel, AxiIo, BChannel, MmioMap, RChannel, Resp, WChannel};

fn mirror_ar(dst: &mut ArChannel, src: &ArChannel) {
    dst.valid = src.valid;
    dst.addr = src.addr;
    dst.id = src.id;
    dst.len = src.len;
    dst.size = src.size;
    dst.burst = src.burst;
}

fn mirror_aw(dst: &mut AwChannel, src: &AwChannel) {
    dst.valid = src.valid;
    dst.addr = src.addr;
    dst.id = src.id;
    dst.len = src.len;
    dst.size = src.size;
    dst.burst = src.burst;
}

fn mirror_w(dst: &mut WChannel, src: &WChannel) {
    dst.valid = src.valid;
    dst.data = src.data;
    dst.wstrb = src.wstrb;
    dst.wlast = src.wlast;
}

fn mirror_r(dst: &mut RChannel, src: &RChannel) {
    dst.valid = src.valid;
    dst.id = src.id;
    dst.data = src.data;
    dst.resp = src.resp;
    dst.rlast = src.rlast;
}

fn mirror_b(dst: &mut BChannel, src: &BChannel) {
    dst.valid = src.valid;
    dst.id = src.id;
    dst.resp = src.resp;
}

/// Single-master, dual-target AXI demultiplexer.
///
/// `up` is the link shared with the Bridge; `ddr` and `mmio` are the links
/// shared with the DRAM and MMIO targets respectively. A component using
/// this crate (the `axi-sim` composition root) is responsible for copying
/// the master- and slave-driven halves of each link between this struct's
/// fields and the neighbouring component's own `AxiIo`, each cycle, at the
/// boundary between phases — see that crate's wiring helpers.
pub struct Router {
    pub up: AxiIo,
    pub ddr: AxiIo,
    pub mmio: AxiIo,
    mmio_map: MmioMap,

    r_active: bool,
    r_to_mmio: bool,
    w_active: bool,
    w_to_mmio: bool,
}

impl Router {
    pub fn new(mmio_map: MmioMap) -> Self {
        Self {
            up: AxiIo::default(),
            ddr: AxiIo::default(),
            mmio: AxiIo::default(),
            mmio_map,
            r_active: false,
            r_to_mmio: false,
            w_active: false,
            w_to_mmio: false,
        }
    }

    /// Response direction: mirror the selected target's R/B channel onto
    /// the upstream link. With no active transaction, upstream R is driven
    /// to a benign idle rather than left at whatever the last beat left it.
    pub fn comb_outputs(&mut self) {
        if self.r_active {
            let src = if self.r_to_mmio { self.mmio.r } else { self.ddr.r };
            mirror_r(&mut self.up.r, &src);
        } else {
            self.up.r.valid = false;
            self.up.r.resp = Resp::Okay;
        }

        if self.w_active {
            let src = if self.w_to_mmio { self.mmio.b } else { self.ddr.b };
            mirror_b(&mut self.up.b, &src);
        } else {
            self.up.b.valid = false;
            self.up.b.resp = Resp::Okay;
        }
    }

    /// Request direction: decode the upstream AR/AW address, mirror the
    /// channel onto the selected target, and route that target's `ready`
    /// back upstream. The W channel's target is the latched write's
    /// affinity unless an AW is handshaking fresh this very cycle, in which
    /// case the freshly decoded address wins — this is what lets a master
    /// present AW and its sole W beat on the same cycle.
    pub fn comb_inputs(&mut self) {
        let ar_sel_mmio = self.mmio_map.is_mmio(self.up.ar.addr);
        let aw_sel_mmio = self.mmio_map.is_mmio(self.up.aw.addr);

        if self.r_active {
            self.up.ar.ready = false;
            self.ddr.ar.valid = false;
            self.mmio.ar.valid = false;
        } else {
            let up_ar = self.up.ar;
            if ar_sel_mmio {
                mirror_ar(&mut self.mmio.ar, &up_ar);
                self.up.ar.ready = self.mmio.ar.ready;
                self.ddr.ar.valid = false;
            } else {
                mirror_ar(&mut self.ddr.ar, &up_ar);
                self.up.ar.ready = self.ddr.ar.ready;
                self.mmio.ar.valid = false;
            }
        }

        if self.w_active {
            self.up.aw.ready = false;
            self.ddr.aw.valid = false;
            self.mmio.aw.valid = false;
        } else {
            let up_aw = self.up.aw;
            if aw_sel_mmio {
                mirror_aw(&mut self.mmio.aw, &up_aw);
                self.up.aw.ready = self.mmio.aw.ready;
                self.ddr.aw.valid = false;
            } else {
                mirror_aw(&mut self.ddr.aw, &up_aw);
                self.up.aw.ready = self.ddr.aw.ready;
                self.mmio.aw.valid = false;
            }
        }

        let w_target_mmio = if self.w_active { self.w_to_mmio } else { aw_sel_mmio };
        let up_w = self.up.w;
        if w_target_mmio {
            mirror_w(&mut self.mmio.w, &up_w);
            self.up.w.ready = self.mmio.w.ready;
            self.ddr.w.valid = false;
        } else {
            mirror_w(&mut self.ddr.w, &up_w);
            self.up.w.ready = self.ddr.w.ready;
            self.mmio.w.valid = false;
        }

        self.ddr.r.ready = self.r_active && !self.r_to_mmio && self.up.r.ready;
        self.mmio.r.ready = self.r_active && self.r_to_mmio && self.up.r.ready;
        self.ddr.b.ready = self.w_active && !self.w_to_mmio && self.up.b.ready;
        self.mmio.b.ready = self.w_active && self.w_to_mmio && self.up.b.ready;
    }

    pub fn seq(&mut self) {
        if self.up.ar.valid && self.up.ar.ready {
            debug_assert!(!self.r_active, "AR handshake while a read is already active");
            self.r_active = true;
            self.r_to_mmio = self.mmio_map.is_mmio(self.up.ar.addr);
        } else if self.r_active {
            let r = if self.r_to_mmio { self.mmio.r } else { self.ddr.r };
            if r.valid && r.ready && r.rlast {
                self.r_active = false;
            }
        }

        if self.up.aw.valid && self.up.aw.ready {
            debug_assert!(!self.w_active, "AW handshake while a write is already active");
            self.w_active = true;
            self.w_to_mmio = self.mmio_map.is_mmio(self.up.aw.addr);
        } else if self.w_active {
            let b = if self.w_to_mmio { self.mmio.b } else { self.ddr.b };
            if b.valid && b.ready {
                self.w_active = false;
            }
        }
    }

    pub fn r_active(&self) -> bool {
        self.r_active
    }

    pub fn w_active(&self) -> bool {
        self.w_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axi_types::Burst;

    fn run_cycle(r: &mut Router) {
        r.comb_outputs();
        r.comb_inputs();
        r.seq();
    }

    #[test]
    fn ar_to_dram_when_below_mmio_base() {
        let mut r = Router::new(MmioMap::default());
        r.up.ar = ArChannel { valid: true, addr: 0x1000, id: 7, len: 0, size: 5, burst: Burst::Incr, ready: false };
        r.ddr.ar.ready = true;
        run_cycle(&mut r);
        assert!(r.ddr.ar.valid);
        assert!(!r.mmio.ar.valid);
        assert!(r.up.ar.ready);
        assert!(r.r_active());
    }

    #[test]
    fn ar_to_mmio_inside_window() {
        let mut r = Router::new(MmioMap::default());
        let addr = MmioMap::default().base;
        r.up.ar = ArChannel { valid: true, addr, id: 1, len: 0, size: 5, burst: Burst::Fixed, ready: false };
        r.mmio.ar.ready = true;
        run_cycle(&mut r);
        assert!(r.mmio.ar.valid);
        assert!(!r.ddr.ar.valid);
        assert!(r.r_active());
    }

    #[test]
    fn same_cycle_aw_and_w_route_to_fresh_target() {
        let mut r = Router::new(MmioMap::default());
        let addr = MmioMap::default().base + 4;
        r.up.aw = AwChannel { valid: true, addr, id: 2, len: 0, size: 5, burst: Burst::Fixed, ready: false };
        r.up.w = WChannel { valid: true, data: [0xAA; 8], wstrb: 0xF, wlast: true, ready: false };
        r.mmio.aw.ready = true;
        r.mmio.w.ready = true;
        run_cycle(&mut r);
        assert!(r.mmio.w.valid, "the fresh AW's address must steer the same-cycle W beat");
        assert!(!r.ddr.w.valid);
    }

    #[test]
    fn read_and_write_never_both_reach_both_targets() {
        let mut r = Router::new(MmioMap::default());
        r.up.ar = ArChannel { valid: true, addr: 0x2000, id: 0, len: 0, size: 5, burst: Burst::Incr, ready: false };
        r.ddr.ar.ready = true;
        run_cycle(&mut r);
        assert!(r.ddr.ar.valid);
        assert!(!r.mmio.ar.valid);

        // While the read is still active, a fresh AR must not be forwarded anywhere.
        r.up.ar.valid = true;
        r.ddr.ar.ready = false;
        r.mmio.ar.ready = true;
        run_cycle(&mut r);
        assert!(!r.mmio.ar.valid, "a second AR must not leak to the other target while one is outstanding");
    }

    #[test]
    fn r_active_clears_on_rlast() {
        let mut r = Router::new(MmioMap::default());
        r.up.ar = ArChannel { valid: true, addr: 0x3000, id: 0, len: 0, size: 5, burst: Burst::Incr, ready: false };
        r.ddr.ar.ready = true;
        run_cycle(&mut r);
        assert!(r.r_active());

        r.up.ar.valid = false;
        r.up.r.ready = true;
        r.ddr.r = RChannel { valid: true, id: 0, data: [0; 8], resp: Resp::Okay, rlast: true, ready: false };
        run_cycle(&mut r);
        assert!(!r.r_active());
    }
}
