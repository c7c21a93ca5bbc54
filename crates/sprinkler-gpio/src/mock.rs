//! Mock GPIO backend for testing
//!
//! Simulates the shift register at the line level: a rising clock edge
//! samples the data line into the shift chain, a rising latch edge commits
//! the chain to the outputs. Clones share state, so tests keep a clone as
//! a probe after handing the backend to the register.

use std::sync::{Arc, Mutex};

use crate::{GpioError, GpioLines, GpioResult, Line};

#[derive(Debug, Default)]
struct MockState {
    clock: bool,
    latch: bool,
    data: bool,
    output_disabled: bool,

    /// Bits sampled since the last commit, in wire order.
    shifting: Vec<bool>,
    /// Last committed outputs, in zone-index order.
    committed: Vec<bool>,
    /// Wire-order trace of the most recent commit.
    last_shift: Vec<bool>,
    commits: usize,

    fail: bool,
    released: bool,
}

/// Mock GPIO line backend for unit/integration testing
#[derive(Clone, Default)]
pub struct MockLines {
    state: Arc<Mutex<MockState>>,
}

impl MockLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every subsequent line operation to fail.
    pub fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Outputs as of the last latch commit, in zone-index order.
    pub fn committed(&self) -> Vec<bool> {
        self.state.lock().unwrap().committed.clone()
    }

    /// Bits of the last commit in the order they arrived on the wire.
    pub fn shifted_history(&self) -> Vec<bool> {
        self.state.lock().unwrap().last_shift.clone()
    }

    /// Number of latch commits observed.
    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn outputs_enabled(&self) -> bool {
        !self.state.lock().unwrap().output_disabled
    }

    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }
}

impl GpioLines for MockLines {
    fn set(&mut self, line: Line, high: bool) -> GpioResult<()> {
        let mut state = self.state.lock().unwrap();

        if state.fail {
            return Err(GpioError::Backend("mock line failure".into()));
        }

        match line {
            Line::Clock => {
                if high && !state.clock {
                    let bit = state.data;
                    state.shifting.push(bit);
                }
                state.clock = high;
            }
            Line::Data => state.data = high,
            Line::Latch => {
                if high && !state.latch {
                    state.last_shift = state.shifting.clone();
                    state.committed = state.shifting.iter().rev().copied().collect();
                    state.shifting.clear();
                    state.commits += 1;
                }
                state.latch = high;
            }
            Line::OutputEnable => state.output_disabled = high,
        }

        Ok(())
    }

    fn release(&mut self) -> GpioResult<()> {
        self.state.lock().unwrap().released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_edge_samples_data() {
        let mut lines = MockLines::new();

        lines.set(Line::Latch, false).unwrap();
        lines.set(Line::Data, true).unwrap();
        lines.set(Line::Clock, true).unwrap();
        lines.set(Line::Clock, false).unwrap();
        lines.set(Line::Data, false).unwrap();
        lines.set(Line::Clock, true).unwrap();
        lines.set(Line::Latch, true).unwrap();

        // Wire order [1, 0] commits to zone order [0, 1].
        assert_eq!(lines.committed(), vec![false, true]);
        assert_eq!(lines.commit_count(), 1);
    }

    #[test]
    fn held_clock_does_not_resample() {
        let mut lines = MockLines::new();

        lines.set(Line::Data, true).unwrap();
        lines.set(Line::Clock, true).unwrap();
        lines.set(Line::Clock, true).unwrap();
        lines.set(Line::Latch, true).unwrap();

        assert_eq!(lines.committed(), vec![true]);
    }
}
