//! Driver facade
//!
//! [`Screen`] owns the serial link, the shadow framebuffer and the render
//! pipeline. Callers submit logical frames; the driver diffs them against
//! the shadow, picks the cheaper transmission strategy and emits the
//! minimal command sequence. Every write failure triggers the recovery
//! protocol: reopen the link, replay brightness, orientation and the full
//! shadow, then retry the in-flight write once.

use std::mem;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::buffer::ScreenBuffer;
use crate::color;
use crate::command::{self, CommandFrame};
use crate::config::{Orientation, PANEL_HEIGHT, PANEL_WIDTH};
use crate::diff::{self, DiffRegion};
use crate::error::Error;
use crate::interface::PanelPort;
use crate::render::{self, Strategy};

type ScreenResult<P> = Result<(), Error<P>>;

/// Reconnect window for mid-write recovery.
const RECOVERY_WINDOW: Duration = Duration::from_secs(1);
/// Reconnect window for an explicit reset.
const RESET_WINDOW: Duration = Duration::from_secs(5);
/// Settle time after a reset frame before further commands.
const RESET_SETTLE: Duration = Duration::from_millis(50);

const DEFAULT_BRIGHTNESS: u8 = 100;
const MAX_BRIGHTNESS: u8 = 100;

/// Driver for one 320x480 USB-CDC smart panel.
///
/// All operations are synchronous and run on the caller's thread; one
/// instance is single-threaded by design. Distinct instances on distinct
/// ports are independent.
pub struct Screen<P: PanelPort> {
    port: P,
    orientation: Orientation,
    width: usize,
    height: usize,
    software_rotation: bool,
    brightness: u8,
    shadow: ScreenBuffer,
    /// Pooled tile payload, reused across transmissions.
    payload: Vec<u8>,
}

impl<P: PanelPort> Screen<P> {
    /// Wrap an already-open port: portrait orientation, full brightness,
    /// zeroed shadow.
    pub fn new(port: P) -> Self {
        Self {
            port,
            orientation: Orientation::Portrait,
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
            software_rotation: false,
            brightness: DEFAULT_BRIGHTNESS,
            shadow: ScreenBuffer::new(PANEL_WIDTH, PANEL_HEIGHT),
            payload: Vec::new(),
        }
    }

    /// Current orientation.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Logical surface size as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Last brightness level sent to the panel.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// The driver's mirror of current device contents.
    pub fn shadow(&self) -> &ScreenBuffer {
        &self.shadow
    }

    /// Release the link. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.port.close();
    }

    /// Reset the panel controller and reconnect.
    pub fn reset(&mut self) -> ScreenResult<P> {
        self.send(CommandFrame::control(command::RESET), None)?;
        self.port.close();
        self.port.reopen(RESET_WINDOW).map_err(Error::Link)?;
        info!("panel reset and reconnected");
        Ok(())
    }

    /// Clear the panel to white.
    pub fn clear(&mut self) -> ScreenResult<P> {
        self.send(CommandFrame::control(command::CLEAR), None)?;
        self.shadow.fill(color::WHITE);
        Ok(())
    }

    /// Turn the panel on.
    pub fn screen_on(&mut self) -> ScreenResult<P> {
        self.send(CommandFrame::control(command::SCREEN_ON), None)
    }

    /// Turn the panel off. Device contents and shadow are unaffected.
    pub fn screen_off(&mut self) -> ScreenResult<P> {
        self.send(CommandFrame::control(command::SCREEN_OFF), None)
    }

    /// Set backlight brightness, clamped to `0..=100`.
    pub fn set_brightness(&mut self, level: u8) -> ScreenResult<P> {
        let level = level.min(MAX_BRIGHTNESS);
        self.send(CommandFrame::brightness(level), None)?;
        self.brightness = level;
        Ok(())
    }

    /// Switch orientation.
    ///
    /// Sends the orientation command (always with the native panel size),
    /// then swaps the logical surface, allocates a fresh shadow and clears
    /// the panel. On failure the driver stays in its prior state.
    pub fn set_orientation(&mut self, orientation: Orientation) -> ScreenResult<P> {
        self.send(
            CommandFrame::orientation(
                orientation.ordinal(),
                PANEL_WIDTH as u16,
                PANEL_HEIGHT as u16,
            ),
            None,
        )?;
        let (width, height) = orientation.logical_size();
        self.orientation = orientation;
        self.width = width;
        self.height = height;
        self.software_rotation = orientation.software_rotated();
        self.shadow = ScreenBuffer::new(width, height);
        self.clear()
    }

    /// Set one pixel from 8-bit channels (round-to-nearest conversion).
    pub fn set_pixel(&mut self, x: usize, y: usize, r: u8, g: u8, b: u8) -> ScreenResult<P> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                w: 1,
                h: 1,
                width: self.width,
                height: self.height,
            });
        }
        let color = color::rgb565_nearest(r, g, b);
        self.shadow.set(x, y, color);
        let (px, py) = self.physical_point(x, y);
        self.send(CommandFrame::pixel(px as u16, py as u16, color), None)
    }

    /// Render a frame region placed at logical `(x, y)`.
    ///
    /// Compares the submitted buffer against the shadow, and sends either
    /// per-pixel commands or tiled bulk payloads for the changed bounding
    /// box, whichever is cheaper. A submission identical to the shadow
    /// writes nothing. On return the shadow region equals the submitted
    /// buffer.
    pub fn display_buffer(&mut self, x: usize, y: usize, frame: &ScreenBuffer) -> ScreenResult<P> {
        let (w, h) = (frame.width(), frame.height());
        if x + w > self.width || y + h > self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                w,
                h,
                width: self.width,
                height: self.height,
            });
        }

        let Some(region) = diff::scan(frame.pixels(), w, h, self.shadow.pixels(), self.width, x, y)
        else {
            debug!("render: no change, nothing sent");
            return Ok(());
        };

        let strategy = render::select_strategy(region.changed, region.width(), region.height());
        debug!(
            "render: {} changed in {}x{} box at ({}, {}), {:?}",
            region.changed,
            region.width(),
            region.height(),
            x + region.min_x,
            y + region.min_y,
            strategy
        );

        match strategy {
            Strategy::Sparse => self.send_sparse(x, y, frame, &region),
            Strategy::Rectangle => self.send_rectangle(x, y, frame, &region),
        }
    }

    /// Map a logical point to panel axes.
    fn physical_point(&self, x: usize, y: usize) -> (usize, usize) {
        if self.software_rotation {
            (y, x)
        } else {
            (x, y)
        }
    }

    fn send_sparse(
        &mut self,
        left: usize,
        top: usize,
        frame: &ScreenBuffer,
        region: &DiffRegion,
    ) -> ScreenResult<P> {
        for sy in region.min_y..=region.max_y {
            for sx in region.min_x..=region.max_x {
                let color = frame.get(sx, sy);
                if self.shadow.get(left + sx, top + sy) == color {
                    continue;
                }
                self.shadow.set(left + sx, top + sy, color);
                let (px, py) = self.physical_point(left + sx, top + sy);
                self.send(CommandFrame::pixel(px as u16, py as u16, color), None)?;
            }
        }
        Ok(())
    }

    fn send_rectangle(
        &mut self,
        left: usize,
        top: usize,
        frame: &ScreenBuffer,
        region: &DiffRegion,
    ) -> ScreenResult<P> {
        // Synchronize the shadow before transmission so recovery replays
        // the submitted contents.
        let x0 = region.min_x;
        let w = region.width();
        for sy in region.min_y..=region.max_y {
            let src = &frame.row(sy)[x0..x0 + w];
            self.shadow.row_mut(top + sy)[left + x0..left + x0 + w].copy_from_slice(src);
        }

        let mut payload = mem::take(&mut self.payload);
        let result = self.send_tiles(left, top, frame, region, &mut payload);
        payload.clear();
        self.payload = payload;
        result
    }

    fn send_tiles(
        &mut self,
        left: usize,
        top: usize,
        frame: &ScreenBuffer,
        region: &DiffRegion,
        payload: &mut Vec<u8>,
    ) -> ScreenResult<P> {
        let w = region.width();
        let log_x = left + region.min_x;
        for (offset, tile_h) in render::tile_spans(region.height()) {
            let log_y = top + region.min_y + offset;
            payload.clear();
            let cmd = if self.software_rotation {
                render::pack_transposed(
                    frame.pixels(),
                    frame.width(),
                    region.min_x,
                    region.min_y + offset,
                    w,
                    tile_h,
                    payload,
                );
                CommandFrame::rect(
                    log_y as u16,
                    log_x as u16,
                    (log_y + tile_h - 1) as u16,
                    (log_x + w - 1) as u16,
                    command::DRAW,
                )
            } else {
                render::pack_rows(
                    frame.pixels(),
                    frame.width(),
                    region.min_x,
                    region.min_y + offset,
                    w,
                    tile_h,
                    payload,
                );
                CommandFrame::rect(
                    log_x as u16,
                    log_y as u16,
                    (log_x + w - 1) as u16,
                    (log_y + tile_h - 1) as u16,
                    command::DRAW,
                )
            };
            self.send(cmd, Some(payload.as_slice()))?;
        }
        Ok(())
    }

    /// Write one command, recovering the link and retrying once on failure.
    fn send(&mut self, cmd: CommandFrame, payload: Option<&[u8]>) -> ScreenResult<P> {
        match self.port.write_frame(cmd.as_bytes(), payload) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("write failed ({err:?}), recovering link");
                self.recover()?;
                self.port
                    .write_frame(cmd.as_bytes(), payload)
                    .map_err(Error::Link)
            }
        }
    }

    /// Reopen the link and restore device state: reset, settle, clear,
    /// brightness, orientation, then a full re-blit of the shadow so the
    /// visible state matches the driver's belief again.
    fn recover(&mut self) -> ScreenResult<P> {
        self.port.close();
        self.port
            .reopen(RECOVERY_WINDOW)
            .map_err(Error::RecoveryExhausted)?;
        info!("link reopened, restoring device state");
        self.restore_device().map_err(Error::RecoveryExhausted)
    }

    fn restore_device(&mut self) -> Result<(), P::Error> {
        self.write_direct(CommandFrame::control(command::RESET), None)?;
        thread::sleep(RESET_SETTLE);
        self.write_direct(CommandFrame::control(command::CLEAR), None)?;
        self.write_direct(CommandFrame::brightness(self.brightness), None)?;
        self.write_direct(
            CommandFrame::orientation(
                self.orientation.ordinal(),
                PANEL_WIDTH as u16,
                PANEL_HEIGHT as u16,
            ),
            None,
        )?;
        self.reblit_shadow()
    }

    /// Retransmit the entire shadow as tiled bulk draws.
    fn reblit_shadow(&mut self) -> Result<(), P::Error> {
        let mut payload = mem::take(&mut self.payload);
        let result = self.reblit_tiles(&mut payload);
        payload.clear();
        self.payload = payload;
        result
    }

    fn reblit_tiles(&mut self, payload: &mut Vec<u8>) -> Result<(), P::Error> {
        for (offset, tile_h) in render::tile_spans(self.height) {
            payload.clear();
            let cmd = if self.software_rotation {
                render::pack_transposed(
                    self.shadow.pixels(),
                    self.width,
                    0,
                    offset,
                    self.width,
                    tile_h,
                    payload,
                );
                CommandFrame::rect(
                    offset as u16,
                    0,
                    (offset + tile_h - 1) as u16,
                    (self.width - 1) as u16,
                    command::DRAW,
                )
            } else {
                render::pack_rows(
                    self.shadow.pixels(),
                    self.width,
                    0,
                    offset,
                    self.width,
                    tile_h,
                    payload,
                );
                CommandFrame::rect(
                    0,
                    offset as u16,
                    (self.width - 1) as u16,
                    (offset + tile_h - 1) as u16,
                    command::DRAW,
                )
            };
            self.write_direct(cmd, Some(payload.as_slice()))?;
        }
        Ok(())
    }

    /// Write without the recovery wrapper; used inside recovery itself,
    /// where a failure is terminal.
    fn write_direct(&mut self, cmd: CommandFrame, payload: Option<&[u8]>) -> Result<(), P::Error> {
        self.port.write_frame(cmd.as_bytes(), payload)
    }
}

#[cfg(feature = "serial")]
impl Screen<crate::interface::SerialLink> {
    /// Open `path` with default serial parameters and wrap it in a driver.
    pub fn open(path: &str) -> Result<Self, Error<crate::interface::SerialLink>> {
        Self::with_config(crate::interface::SerialConfig::new(path))
    }

    /// Open a port described by `config` and wrap it in a driver.
    pub fn with_config(
        config: crate::interface::SerialConfig,
    ) -> Result<Self, Error<crate::interface::SerialLink>> {
        let path = config.path.clone();
        let link = crate::interface::SerialLink::open(config).map_err(Error::Link)?;
        info!("panel connected on {path}");
        Ok(Self::new(link))
    }
}
