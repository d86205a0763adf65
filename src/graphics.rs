//! embedded-graphics support (requires the `graphics` feature)
//!
//! [`ScreenBuffer`] implements
//! [`DrawTarget`](embedded_graphics_core::draw_target::DrawTarget) with
//! [`Rgb565`] pixels, so application content can be composed with the
//! embedded-graphics ecosystem and then submitted through
//! [`Screen::display_buffer`](crate::display::Screen::display_buffer).
//! Out-of-bounds pixels are discarded, per the `DrawTarget` contract.

use core::convert::Infallible;

use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{OriginDimensions, Size};
use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_graphics_core::prelude::{IntoStorage, Pixel};

use crate::buffer::ScreenBuffer;

impl DrawTarget for ScreenBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as usize, point.y as usize);
            if x >= self.width() || y >= self.height() {
                continue;
            }
            self.set(x, y, color.into_storage());
        }
        Ok(())
    }
}

impl OriginDimensions for ScreenBuffer {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics_core::geometry::Point;
    use embedded_graphics_core::prelude::RgbColor;

    #[test]
    fn drawn_pixels_land_as_rgb565_words() {
        let mut buf = ScreenBuffer::new(16, 8);
        buf.draw_iter([
            Pixel(Point::new(0, 0), Rgb565::RED),
            Pixel(Point::new(15, 7), Rgb565::BLUE),
            Pixel(Point::new(3, 2), Rgb565::WHITE),
        ])
        .unwrap();

        assert_eq!(buf.get(0, 0), 0xF800);
        assert_eq!(buf.get(15, 7), 0x001F);
        assert_eq!(buf.get(3, 2), 0xFFFF);
    }

    #[test]
    fn out_of_bounds_pixels_are_discarded() {
        let mut buf = ScreenBuffer::new(4, 4);
        buf.draw_iter([
            Pixel(Point::new(-1, 0), Rgb565::RED),
            Pixel(Point::new(0, -3), Rgb565::RED),
            Pixel(Point::new(4, 0), Rgb565::RED),
            Pixel(Point::new(0, 4), Rgb565::RED),
        ])
        .unwrap();
        assert!(buf.pixels().iter().all(|&c| c == 0));
    }

    #[test]
    fn size_reports_logical_dimensions() {
        let buf = ScreenBuffer::new(480, 320);
        assert_eq!(buf.size(), Size::new(480, 320));
    }
}
