/// A byte-addressable peripheral hosted behind the MMIO Bus.
///
/// Implementors see only byte-granular, already-decoded offsets relative to
/// their own registered region base — they never see the bus's own address
/// map or the AXI transaction machinery above them.
pub trait MmioDevice {
    /// Fill `out` with `out.len()` bytes starting at `addr` (region-relative).
    /// Unmapped device-internal offsets should be filled with zero rather
    /// than left untouched, since `out` is not pre-zeroed by the caller.
    fn read(&mut self, addr: u32, out: &mut [u8]);

    /// Apply `data[i]` at `addr + i` for every `i` where bit `i` of
    /// `wstrb_mask` is set. Bytes outside the enabled mask must not be
    /// touched.
    fn write(&mut self, addr: u32, data: &[u8], wstrb_mask: u32);

    /// Advance one cycle of device-internal state. Most devices (plain
    /// registers, RAM-backed regions) have nothing to do here.
    fn tick(&mut self) {}
}
