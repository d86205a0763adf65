//! Differential renderer and driver for 3.5" USB-attached smart screen
//! panels.
//!
//! These panels enumerate as a CDC serial device and expose a 320x480
//! RGB565 framebuffer behind a small byte-packed command protocol. Pushing
//! full frames over the wire is slow, so the driver keeps a shadow copy of
//! device state, diffs every submitted frame against it, and transmits only
//! what changed, either as individual pixel commands or as tiled bulk
//! rectangles depending on a calibrated cost model.
//!
//! ## Features
//!
//! - Differential rendering with a vectorized (AVX2) diff scanner and a
//!   bit-exact scalar fallback
//! - Sparse vs. rectangle transmission chosen per frame by wire cost
//! - Software-rotated landscape orientations (transpose at pack time)
//! - Automatic link recovery: reconnect, replay device state, re-blit the
//!   shadow, retry the in-flight write
//! - `serial` feature (default): ready-made `serialport` transport
//! - `graphics` feature: `embedded-graphics` `DrawTarget` for
//!   [`ScreenBuffer`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use smartscreen::{color, Orientation, Screen, ScreenBuffer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut screen = Screen::open("/dev/ttyACM0")?;
//! screen.set_brightness(80)?;
//! screen.set_orientation(Orientation::Landscape)?;
//!
//! let mut frame = ScreenBuffer::new(480, 320);
//! frame.fill(color::rgb565(0x20, 0x20, 0x20));
//! screen.display_buffer(0, 0, &frame)?;
//! # Ok(())
//! # }
//! ```
//!
//! The driver is single-threaded: operations are synchronous and mutate
//! shared state, so share a [`Screen`] across threads only behind external
//! synchronization. Submitted frames are borrowed read-only for the
//! duration of the call.

/// Logical-dimensioned RGB565 pixel store
pub mod buffer;
/// RGB565 color codec
pub mod color;
/// Wire command codes and frame packing
pub mod command;
/// Panel geometry and orientation
pub mod config;
/// Differential frame scanner
pub mod diff;
/// Driver facade
pub mod display;
/// Driver error types
pub mod error;
/// Serial link abstraction
pub mod interface;
/// Transmission strategy and tile packing
pub mod render;

/// embedded-graphics integration (requires the `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

pub use buffer::ScreenBuffer;
pub use command::{CommandFrame, HEADER_LEN};
pub use config::{Orientation, PANEL_HEIGHT, PANEL_WIDTH};
pub use diff::DiffRegion;
pub use display::Screen;
pub use error::Error;
pub use interface::{LinkError, PanelPort, DEFAULT_BAUD};
#[cfg(feature = "serial")]
pub use interface::{SerialConfig, SerialLink};
pub use render::{Strategy, MAX_BLOCK_HEIGHT};
