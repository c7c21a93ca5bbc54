//! Shift-register serialization protocol

use tracing::{debug, error};

use crate::{GpioLines, GpioResult, Line};

/// Hardware link breaker. Transitions one way: any line failure moves to
/// `Disconnected` and only constructing a new register recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connected,
    Disconnected,
}

/// Drives the daisy-chained shift register over four GPIO lines.
///
/// Construction clocks the given status vector out immediately so the
/// hardware matches the persisted software state before the register is
/// handed to callers.
///
/// Any line-level failure latches a one-way disconnected state: every
/// subsequent `write`/`close` becomes a no-op until a new instance is
/// constructed. This stops retry storms against dead hardware.
pub struct ShiftRegister {
    lines: Box<dyn GpioLines>,
    link: LinkState,
}

impl ShiftRegister {
    /// Initialize the register and write `bits` as the starting state.
    ///
    /// Outputs are disabled for the duration of the initial write, then
    /// enabled so the valves display the state immediately.
    pub fn new(lines: Box<dyn GpioLines>, bits: &[bool]) -> Self {
        let mut register = Self {
            lines,
            link: LinkState::Connected,
        };

        if let Err(e) = register.init(bits) {
            register.link = LinkState::Disconnected;
            error!(error = %e, "Failed to initialize shift register");
        }

        register
    }

    /// A register that was never reachable. Writes no-op from the start;
    /// the daemon keeps serving state changes without hardware.
    pub fn disconnected() -> Self {
        Self {
            lines: Box::new(NullLines),
            link: LinkState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    /// Clock the status vector out to the register chain.
    ///
    /// `bits` is in zone-index order; the chain is physically wired
    /// little-endian relative to zone index, so bits go out last to first.
    pub fn write(&mut self, bits: &[bool]) {
        if self.link == LinkState::Disconnected {
            return;
        }

        debug!(?bits, "Writing zone status to shift register");

        if let Err(e) = self.shift_out(bits) {
            self.link = LinkState::Disconnected;
            error!(error = %e, "Failed to write to shift register");
        }
    }

    /// Write a final status vector (typically all-off) and release the
    /// hardware resource.
    pub fn close(&mut self, bits: &[bool]) {
        self.write(bits);

        if let Err(e) = self.lines.release() {
            error!(error = %e, "Failed to release GPIO lines");
        }
    }

    fn init(&mut self, bits: &[bool]) -> GpioResult<()> {
        self.lines.set(Line::OutputEnable, true)?;
        self.shift_out(bits)?;
        self.lines.set(Line::OutputEnable, false)?;
        Ok(())
    }

    fn shift_out(&mut self, bits: &[bool]) -> GpioResult<()> {
        self.lines.set(Line::Clock, false)?;
        self.lines.set(Line::Latch, false)?;

        for &bit in bits.iter().rev() {
            self.lines.set(Line::Clock, false)?;
            self.lines.set(Line::Data, bit)?;
            self.lines.set(Line::Clock, true)?;
        }

        self.lines.set(Line::Latch, true)?;
        Ok(())
    }
}

struct NullLines;

impl GpioLines for NullLines {
    fn set(&mut self, _line: Line, _high: bool) -> GpioResult<()> {
        Ok(())
    }

    fn release(&mut self) -> GpioResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockLines;

    #[test]
    fn construction_writes_initial_state_and_enables_outputs() {
        let lines = MockLines::new();
        let probe = lines.clone();

        let register = ShiftRegister::new(Box::new(lines), &[true, false, true]);

        assert!(register.is_connected());
        assert!(probe.outputs_enabled());
        assert_eq!(probe.committed(), vec![true, false, true]);
        assert_eq!(probe.commit_count(), 1);
    }

    #[test]
    fn write_sends_bits_in_reverse_wire_order() {
        let lines = MockLines::new();
        let probe = lines.clone();
        let mut register = ShiftRegister::new(Box::new(lines), &[false; 4]);

        register.write(&[true, false, false, false]);

        // Zone 0 goes out last, so it sits nearest the register input.
        assert_eq!(probe.shifted_history(), vec![false, false, false, true]);
        assert_eq!(probe.committed(), vec![true, false, false, false]);
    }

    #[test]
    fn failure_latches_disconnected_state() {
        let lines = MockLines::new();
        let probe = lines.clone();
        let mut register = ShiftRegister::new(Box::new(lines), &[false; 2]);
        assert_eq!(probe.commit_count(), 1);

        probe.set_fail(true);
        register.write(&[true, true]);
        assert!(!register.is_connected());

        // Recovering the mock does not recover the register.
        probe.set_fail(false);
        register.write(&[true, true]);
        assert_eq!(probe.commit_count(), 1);
    }

    #[test]
    fn close_writes_final_state_and_releases() {
        let lines = MockLines::new();
        let probe = lines.clone();
        let mut register = ShiftRegister::new(Box::new(lines), &[true, true]);

        register.close(&[false, false]);

        assert_eq!(probe.committed(), vec![false, false]);
        assert!(probe.released());
    }

    #[test]
    fn close_releases_even_when_disconnected() {
        let lines = MockLines::new();
        let probe = lines.clone();
        let mut register = ShiftRegister::new(Box::new(lines), &[true]);

        probe.set_fail(true);
        register.write(&[false]);
        probe.set_fail(false);

        register.close(&[false]);
        assert!(probe.released());
        // The final write was skipped; the last commit is the initial one.
        assert_eq!(probe.committed(), vec![true]);
    }
}
