//! Raspberry Pi GPIO backend
//!
//! Drives the four shift-register lines through the Pi's GPIO header
//! (BCM numbering). This is the only crate that touches real hardware;
//! everything above it talks to the [`GpioLines`] trait.

use rppal::gpio::{Gpio, OutputPin};
use tracing::info;

use sprinkler_gpio::{GpioError, GpioLines, GpioResult, Line};

/// GPIO line backend backed by the Pi's pin header
pub struct PiLines {
    clk: OutputPin,
    noe: OutputPin,
    dat: OutputPin,
    lat: OutputPin,
}

impl PiLines {
    /// Acquire the four register lines as outputs.
    pub fn open(pin_clk: u8, pin_noe: u8, pin_dat: u8, pin_lat: u8) -> GpioResult<Self> {
        let gpio = Gpio::new().map_err(backend)?;

        let lines = Self {
            clk: gpio.get(pin_clk).map_err(backend)?.into_output(),
            noe: gpio.get(pin_noe).map_err(backend)?.into_output(),
            dat: gpio.get(pin_dat).map_err(backend)?.into_output(),
            lat: gpio.get(pin_lat).map_err(backend)?.into_output(),
        };

        info!(pin_clk, pin_noe, pin_dat, pin_lat, "GPIO lines acquired");
        Ok(lines)
    }

    fn pin_mut(&mut self, line: Line) -> &mut OutputPin {
        match line {
            Line::Clock => &mut self.clk,
            Line::OutputEnable => &mut self.noe,
            Line::Data => &mut self.dat,
            Line::Latch => &mut self.lat,
        }
    }
}

impl GpioLines for PiLines {
    fn set(&mut self, line: Line, high: bool) -> GpioResult<()> {
        let pin = self.pin_mut(line);
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }

    fn release(&mut self) -> GpioResult<()> {
        // rppal resets pins to inputs when the OutputPin drops; nothing
        // further to do at the line level.
        info!("Releasing GPIO lines");
        Ok(())
    }
}

fn backend(e: rppal::gpio::Error) -> GpioError {
    GpioError::Backend(e.to_string())
}
