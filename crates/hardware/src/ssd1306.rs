//! SSD1306 128x64 OLED over 4-wire SPI.
//!
//! The panel is written from a page-organised buffer: byte `x + page * 128`
//! holds the eight vertical pixels of column `x` in that page, LSB on top.

use embedded_hal::{
    delay::DelayNs,
    digital::{self, OutputPin},
    spi::{self, SpiDevice},
};
use frontend_core::hardware::MonoDisplay;
use shared::Frame;
use thiserror::Error;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 64;
const PAGES: usize = (HEIGHT / 8) as usize;
const BUFFER_LEN: usize = WIDTH as usize * PAGES;

mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
    pub const SET_MEMORY_MODE: u8 = 0x20;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const RESUME_FROM_RAM: u8 = 0xA4;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_COLUMN_ADDR: u8 = 0x21;
    pub const SET_PAGE_ADDR: u8 = 0x22;
}

/// Power-up sequence for the internal charge pump and horizontal addressing.
const INIT_SEQUENCE: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::SET_CLOCK_DIV,
    0x80,
    cmd::SET_MUX_RATIO,
    0x3F, // 64 lines
    cmd::SET_DISPLAY_OFFSET,
    0x00,
    cmd::SET_START_LINE,
    cmd::SET_CHARGE_PUMP,
    0x14,
    cmd::SET_MEMORY_MODE,
    0x00, // horizontal
    cmd::SET_SEG_REMAP,
    cmd::SET_COM_SCAN_DEC,
    cmd::SET_COM_PINS,
    0x12,
    cmd::SET_CONTRAST,
    0xCF,
    cmd::SET_PRECHARGE,
    0xF1,
    cmd::SET_VCOM_DETECT,
    0x40,
    cmd::RESUME_FROM_RAM,
    cmd::SET_NORMAL,
    cmd::DISPLAY_ON,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ssd1306Error {
    #[error("SPI transfer failed: {0}")]
    Spi(spi::ErrorKind),
    #[error("driving {pin} line failed: {kind}")]
    Pin {
        pin: &'static str,
        kind: digital::ErrorKind,
    },
    #[error("frame is {width}x{height}, panel is 128x64")]
    FrameSize { width: u32, height: u32 },
}

pub struct Ssd1306<SPI, DC, RST, D> {
    spi: SPI,
    dc: DC,
    rst: RST,
    delay: D,
    buffer: [u8; BUFFER_LEN],
}

impl<SPI, DC, RST, D> Ssd1306<SPI, DC, RST, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, delay: D) -> Self {
        Self {
            spi,
            dc,
            rst,
            delay,
            buffer: [0; BUFFER_LEN],
        }
    }

    pub fn reset(&mut self) -> Result<(), Ssd1306Error> {
        self.rst.set_high().map_err(|err| pin_error("reset", err))?;
        self.delay.delay_ms(1);
        self.rst.set_low().map_err(|err| pin_error("reset", err))?;
        self.delay.delay_ms(10);
        self.rst.set_high().map_err(|err| pin_error("reset", err))?;
        self.delay.delay_ms(10);
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), Ssd1306Error> {
        self.reset()?;
        self.command(INIT_SEQUENCE)
    }

    /// Blank the local buffer. Call [`flush`](Self::flush) to show it.
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    pub fn image(&mut self, frame: &Frame) -> Result<(), Ssd1306Error> {
        if !frame.has_size(WIDTH, HEIGHT) {
            return Err(Ssd1306Error::FrameSize {
                width: frame.width(),
                height: frame.height(),
            });
        }

        self.buffer.fill(0);
        for y in 0..HEIGHT {
            let page = (y / 8) as usize;
            let bit = 1u8 << (y % 8);
            for x in 0..WIDTH {
                if frame.is_lit(x, y) {
                    self.buffer[x as usize + page * WIDTH as usize] |= bit;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Ssd1306Error> {
        self.command(&[
            cmd::SET_COLUMN_ADDR,
            0,
            (WIDTH - 1) as u8,
            cmd::SET_PAGE_ADDR,
            0,
            (PAGES - 1) as u8,
        ])?;
        self.dc.set_high().map_err(|err| pin_error("data/command", err))?;
        self.spi
            .write(&self.buffer)
            .map_err(|err| Ssd1306Error::Spi(spi::Error::kind(&err)))
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), Ssd1306Error> {
        self.dc.set_low().map_err(|err| pin_error("data/command", err))?;
        self.spi
            .write(bytes)
            .map_err(|err| Ssd1306Error::Spi(spi::Error::kind(&err)))
    }
}

fn pin_error<E: digital::Error>(pin: &'static str, err: E) -> Ssd1306Error {
    Ssd1306Error::Pin {
        pin,
        kind: err.kind(),
    }
}

impl<SPI, DC, RST, D> MonoDisplay for Ssd1306<SPI, DC, RST, D>
where
    SPI: SpiDevice + Send,
    DC: OutputPin + Send,
    RST: OutputPin + Send,
    D: DelayNs + Send,
{
    fn begin(&mut self) -> anyhow::Result<()> {
        Ssd1306::begin(self)?;
        tracing::debug!("ssd1306 initialised");
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        Ssd1306::clear(self);
        self.flush()?;
        Ok(())
    }

    fn display(&mut self, frame: &Frame) -> anyhow::Result<()> {
        self.image(frame)?;
        self.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/ssd1306_tests.rs"]
mod tests;
