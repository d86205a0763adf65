//! Wire command codes and frame packing
//!
//! Every outbound message starts with a 6-byte header. For rectangle-shaped
//! commands the header nibble-packs four 10-bit coordinates
//! `(x, y, ex, ey)` big-endian, with the command code in the last byte:
//!
//! ```text
//! b0 = x >> 2
//! b1 = ((x & 0x3) << 6) | (y >> 4)
//! b2 = ((y & 0xF) << 4) | (ex >> 6)
//! b3 = ((ex & 0x3F) << 2) | (ey >> 8)
//! b4 = ey & 0xFF
//! b5 = command code
//! ```
//!
//! Control commands reuse the same layout with the coordinate fields zeroed
//! (brightness repurposes the x field for its level). [`CommandFrame`] is a
//! fixed 16-byte staging area, so packing a command never allocates.

/// Reset the panel controller (6 bytes).
pub const RESET: u8 = 101;
/// Clear the panel to white (6 bytes).
pub const CLEAR: u8 = 102;
/// Turn the backlight and panel off (6 bytes).
pub const SCREEN_OFF: u8 = 108;
/// Turn the backlight and panel on (6 bytes).
pub const SCREEN_ON: u8 = 109;
/// Set backlight brightness; level rides in the x field (6 bytes).
pub const BRIGHTNESS: u8 = 110;
/// Select hardware orientation; followed by ordinal and native size (11 bytes).
pub const ORIENTATION: u8 = 121;
/// Draw a rectangle of pixels; followed by row-major RGB565 little-endian
/// payload of `w * h * 2` bytes.
pub const DRAW: u8 = 197;

/// Packed header length in bytes.
pub const HEADER_LEN: usize = 6;

const FRAME_CAPACITY: usize = 16;

/// One packed command: a 6-byte header plus up to 10 bytes of inline
/// payload (pixel color, orientation parameters).
///
/// Bulk draw payloads are not staged here; they follow the header through
/// the link as a separate slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandFrame {
    buf: [u8; FRAME_CAPACITY],
    len: usize,
}

impl CommandFrame {
    /// Header for the rectangle `(x, y) ..= (ex, ey)` with a command code.
    ///
    /// Coordinates are physical and must fit in 10 bits.
    pub fn rect(x: u16, y: u16, ex: u16, ey: u16, code: u8) -> Self {
        debug_assert!(x < 1024 && y < 1024 && ex < 1024 && ey < 1024);
        let mut buf = [0u8; FRAME_CAPACITY];
        buf[0] = (x >> 2) as u8;
        buf[1] = (((x & 0x3) << 6) | (y >> 4)) as u8;
        buf[2] = (((y & 0xF) << 4) | (ex >> 6)) as u8;
        buf[3] = (((ex & 0x3F) << 2) | (ey >> 8)) as u8;
        buf[4] = (ey & 0xFF) as u8;
        buf[5] = code;
        Self {
            buf,
            len: HEADER_LEN,
        }
    }

    /// Zero-padded control header carrying only a command code.
    pub fn control(code: u8) -> Self {
        Self::rect(0, 0, 0, 0, code)
    }

    /// Brightness command; `level` is expected pre-clamped to `0..=100`.
    pub fn brightness(level: u8) -> Self {
        Self::rect(level as u16, 0, 0, 0, BRIGHTNESS)
    }

    /// Orientation command: zeroed header, then `ord + 100` and the native
    /// panel size big-endian.
    pub fn orientation(ordinal: u8, width: u16, height: u16) -> Self {
        let mut frame = Self::control(ORIENTATION);
        frame.buf[6] = ordinal + 100;
        frame.buf[7] = (width >> 8) as u8;
        frame.buf[8] = (width & 0xFF) as u8;
        frame.buf[9] = (height >> 8) as u8;
        frame.buf[10] = (height & 0xFF) as u8;
        frame.len = 11;
        frame
    }

    /// Single-pixel draw: a 1x1 rectangle at `(x, y)` with the color inline,
    /// little-endian.
    pub fn pixel(x: u16, y: u16, color: u16) -> Self {
        let mut frame = Self::rect(x, y, x, y, DRAW);
        let le = color.to_le_bytes();
        frame.buf[6] = le[0];
        frame.buf[7] = le[1];
        frame.len = 8;
        frame
    }

    /// The packed bytes of this command.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Decode a packed header back into `(x, y, ex, ey, code)`.
///
/// The inverse of [`CommandFrame::rect`]; handy when inspecting captured
/// traffic.
pub fn decode_rect(header: &[u8; HEADER_LEN]) -> (u16, u16, u16, u16, u8) {
    let x = ((header[0] as u16) << 2) | (header[1] as u16 >> 6);
    let y = ((header[1] as u16 & 0x3F) << 4) | (header[2] as u16 >> 4);
    let ex = ((header[2] as u16 & 0xF) << 6) | (header[3] as u16 >> 2);
    let ey = ((header[3] as u16 & 0x3) << 8) | header[4] as u16;
    (x, y, ex, ey, header[5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_packs_known_vector() {
        let frame = CommandFrame::rect(10, 20, 10, 20, DRAW);
        assert_eq!(frame.as_bytes(), &[2, 0x81, 0x40, 0x28, 20, 197]);
    }

    #[test]
    fn rect_round_trips_across_the_coordinate_domain() {
        // Sample the 10-bit domain on a coarse grid plus both extremes.
        let samples = [0u16, 1, 2, 63, 64, 319, 320, 479, 512, 1022, 1023];
        for &x in &samples {
            for &y in &samples {
                for &ex in &samples {
                    for &ey in &samples {
                        let frame = CommandFrame::rect(x, y, ex, ey, DRAW);
                        let mut header = [0u8; HEADER_LEN];
                        header.copy_from_slice(frame.as_bytes());
                        assert_eq!(decode_rect(&header), (x, y, ex, ey, DRAW));
                    }
                }
            }
        }
    }

    #[test]
    fn control_is_zero_padded() {
        let frame = CommandFrame::control(CLEAR);
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 0, 0, 102]);
    }

    #[test]
    fn brightness_rides_the_x_field() {
        let frame = CommandFrame::brightness(100);
        assert_eq!(frame.as_bytes(), &[25, 0, 0, 0, 0, 110]);

        let frame = CommandFrame::brightness(3);
        assert_eq!(frame.as_bytes(), &[0, 0xC0, 0, 0, 0, 110]);
    }

    #[test]
    fn orientation_carries_ordinal_and_native_size() {
        let frame = CommandFrame::orientation(1, 320, 480);
        assert_eq!(
            frame.as_bytes(),
            &[0, 0, 0, 0, 0, 121, 101, 0x01, 0x40, 0x01, 0xE0]
        );
    }

    #[test]
    fn pixel_is_eight_bytes_with_little_endian_color() {
        let frame = CommandFrame::pixel(10, 20, 0xF800);
        assert_eq!(frame.as_bytes().len(), 8);
        assert_eq!(&frame.as_bytes()[..6], CommandFrame::rect(10, 20, 10, 20, DRAW).as_bytes());
        assert_eq!(&frame.as_bytes()[6..], &[0x00, 0xF8]);
    }
}
