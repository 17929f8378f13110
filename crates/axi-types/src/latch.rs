/// State of an AR/AW channel that must keep `VALID` (and its payload)
/// stable until the matching `READY` handshake completes.
///
/// AXI forbids retracting `VALID` once asserted, so a request that isn't
/// accepted in the cycle it's issued has to be re-driven verbatim every
/// cycle until it is. Modelling that as a two-state machine instead of a
/// `valid: bool` + a shadow payload keeps "what's currently on the wire"
/// and "is there anything to drive at all" from drifting apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Latched<T> {
    #[default]
    Idle,
    Driving(T),
}

impl<T: Copy> Latched<T> {
    pub fn is_driving(&self) -> bool {
        matches!(self, Latched::Driving(_))
    }

    pub fn payload(&self) -> Option<T> {
        match self {
            Latched::Idle => None,
            Latched::Driving(p) => Some(*p),
        }
    }

    /// Latch a payload that wasn't accepted this cycle.
    pub fn latch(&mut self, payload: T) {
        *self = Latched::Driving(payload);
    }

    /// Clear the latch after the handshake completes.
    pub fn clear(&mut self) {
        *self = Latched::Idle;
    }
}
