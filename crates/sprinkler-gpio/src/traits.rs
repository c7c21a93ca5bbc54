//! GPIO line traits

use thiserror::Error;

/// Errors from GPIO line operations
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("GPIO backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GpioResult<T> = Result<T, GpioError>;

/// The four control lines of the shift-register chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Shift clock; the register samples data on the rising edge
    Clock,
    /// Output enable, active low
    OutputEnable,
    /// Serial data
    Data,
    /// Latch; a rising edge commits the shifted bits to the outputs
    Latch,
}

/// Line-level access trait - implemented by platform-specific backends
pub trait GpioLines: Send {
    /// Drive one line high or low
    fn set(&mut self, line: Line, high: bool) -> GpioResult<()>;

    /// Release the underlying hardware resource
    fn release(&mut self) -> GpioResult<()>;
}
