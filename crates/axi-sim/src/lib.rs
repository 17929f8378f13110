//! The composition root: wires one [`Bridge`], one [`Router`], one
//! [`MmioBus`], and one [`DramModel`] into a single cycle-stepped
//! simulation, exposing the Bridge's master-facing ports.
//!
//! Each component keeps its own `AxiIo` copy of the link it shares with a
//! neighbour; [`Interconnect::tick`] is responsible for shuttling the
//! driven half of each link across that boundary at the right point in the
//! phase order, since the components themselves only know about their own
//! side (see `axi-router`'s crate docs).

use axi_bridge::Bridge;
use axi_router::Router;
use axi_types::{ArChannel, AwChannel, AxiIo, BChannel, MmioMap, NUM_READ_MASTERS, NUM_WRITE_MASTERS, RChannel, WChannel};
use mmio_bus::MmioBus;
use sim_ddr::DramModel;

pub use axi_bridge::ports::{ReadMasterPort, ReadReq, ReadResp, WriteMasterPort, WriteReq, WriteResp};

/// Copy the master-driven half of a link (request channels plus the R/B
/// `ready` bits) from the upstream component's `AxiIo` into the downstream
/// component's mirror of the same link.
fn sync_request(from: &AxiIo, to: &mut AxiIo) {
    mirror_ar(&mut to.ar, &from.ar);
    mirror_aw(&mut to.aw, &from.aw);
    mirror_w(&mut to.w, &from.w);
    to.r.ready = from.r.ready;
    to.b.ready = from.b.ready;
}

/// Copy the slave-driven half of a link (AR/AW/W `ready` plus the R/B
/// channels) from the downstream component's `AxiIo` into the upstream
/// component's mirror of the same link.
fn sync_response(from: &AxiIo, to: &mut AxiIo) {
    to.ar.ready = from.ar.ready;
    to.aw.ready = from.aw.ready;
    to.w.ready = from.w.ready;
    mirror_r(&mut to.r, &from.r);
    mirror_b(&mut to.b, &from.b);
}

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

/// A complete Bridge/Router/MMIO Bus/DRAM simulation, stepped one cycle at
/// a time. Owns every component the three CORE parts need to exchange
/// traffic with a real target; the only thing a caller supplies is the
/// devices registered on the MMIO Bus before the first [`Interconnect::tick`].
pub struct Interconnect {
    pub bridge: Bridge,
    pub router: Router,
    pub mmio_bus: MmioBus,
    pub dram: DramModel,
    cycle: u64,
}

impl Interconnect {
    pub fn new(mmio_map: MmioMap, mmio_bus: MmioBus, dram: DramModel) -> Self {
        Self {
            bridge: Bridge::new(mmio_map),
            router: Router::new(mmio_map),
            mmio_bus,
            dram,
            cycle: 0,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn read_ports(&mut self) -> &mut [ReadMasterPort; NUM_READ_MASTERS] {
        &mut self.bridge.read_ports
    }

    pub fn write_ports(&mut self) -> &mut [WriteMasterPort; NUM_WRITE_MASTERS] {
        &mut self.bridge.write_ports
    }

    /// Advance the whole simulation by one clock cycle: `comb_outputs`
    /// leaves-first (targets, then Router, then Bridge), then `comb_inputs`
    /// root-first (Bridge, then Router, then targets), then `seq` for every
    /// component, matching the fixed per-cycle phase order.
    pub fn tick(&mut self) {
        self.dram.comb_outputs();
        self.mmio_bus.comb_outputs();
        sync_response(&self.dram.axi_io, &mut self.router.ddr);
        sync_response(&self.mmio_bus.axi_io, &mut self.router.mmio);

        self.router.comb_outputs();
        sync_response(&self.router.up, &mut self.bridge.axi_io);

        self.bridge.comb_outputs();

        self.bridge.comb_inputs();
        sync_request(&self.bridge.axi_io, &mut self.router.up);

        self.router.comb_inputs();
        sync_request(&self.router.ddr, &mut self.dram.axi_io);
        sync_request(&self.router.mmio, &mut self.mmio_bus.axi_io);

        self.dram.comb_inputs();
        self.mmio_bus.comb_inputs();

        self.bridge.seq();
        self.router.seq();
        self.mmio_bus.seq();
        self.dram.seq();

        self.cycle += 1;
    }

    /// Run `tick` until `done` returns true or `max_cycles` elapses,
    /// returning whether `done` was satisfied. Tests use this rather than
    /// hand-rolled polling loops; see each scenario test for the
    /// `MAX_CYCLES` it picks.
    pub fn run_until(&mut self, max_cycles: u64, mut done: impl FnMut(&mut Self) -> bool) -> bool {
        for _ in 0..max_cycles {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }
}
