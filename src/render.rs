//! Transmission strategy and tile packing
//!
//! Once the scanner has sized up a change, the driver picks between two ways
//! of putting it on the wire: one draw command per changed pixel, or the
//! whole bounding box as bulk payload. The crossover comes from a calibrated
//! cost model; per-pixel commands carry an 8-byte minimum plus per-message
//! latency at low occupancy, which amortizes to roughly twelve bulk-payload
//! bytes each.
//!
//! Bulk transmission is tiled into horizontal strips of at most
//! [`MAX_BLOCK_HEIGHT`] rows so a single payload stays within the device's
//! 16-bit byte counter.

use crate::command::HEADER_LEN;

/// Calibrated bytes-equivalent cost of one per-pixel draw command.
pub const PIXEL_COMMAND_COST: usize = 12;

/// Maximum rows per bulk payload strip.
pub const MAX_BLOCK_HEIGHT: usize = 40;

/// How a change region goes on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One 8-byte draw command per changed pixel.
    Sparse,
    /// The bounding box as one or more tiled bulk payloads.
    Rectangle,
}

/// Pick the cheaper transmission strategy for a change region.
///
/// Deterministic in its inputs: sparse wins exactly when
/// `changed * PIXEL_COMMAND_COST` undercuts the header-plus-payload cost of
/// the bounding box.
pub fn select_strategy(changed: usize, diff_w: usize, diff_h: usize) -> Strategy {
    let box_cost = HEADER_LEN + diff_w * diff_h * 2;
    let point_cost = changed * PIXEL_COMMAND_COST;
    if point_cost < box_cost {
        Strategy::Sparse
    } else {
        Strategy::Rectangle
    }
}

/// Split `rows` into strips of at most [`MAX_BLOCK_HEIGHT`], yielding
/// `(row_offset, strip_height)` pairs.
pub fn tile_spans(rows: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..rows)
        .step_by(MAX_BLOCK_HEIGHT)
        .map(move |y| (y, MAX_BLOCK_HEIGHT.min(rows - y)))
}

/// Pack the `w` x `h` rectangle at `(x0, y0)` of a row-major source into
/// `out` as little-endian RGB565, row by row.
pub fn pack_rows(src: &[u16], stride: usize, x0: usize, y0: usize, w: usize, h: usize, out: &mut Vec<u8>) {
    out.reserve(w * h * 2);
    for row in 0..h {
        let line = &src[(y0 + row) * stride + x0..][..w];
        for &px in line {
            out.extend_from_slice(&px.to_le_bytes());
        }
    }
}

/// Pack the `w` x `h` logical rectangle at `(x0, y0)` transposed into its
/// physical layout: the output walks the physical rectangle
/// `(y0, x0, h, w)` row-major, so output cell `(row, col)` reads source cell
/// `(x0 + row, y0 + col)`.
pub fn pack_transposed(
    src: &[u16],
    stride: usize,
    x0: usize,
    y0: usize,
    w: usize,
    h: usize,
    out: &mut Vec<u8>,
) {
    out.reserve(w * h * 2);
    for row in 0..w {
        for col in 0..h {
            let px = src[(y0 + col) * stride + x0 + row];
            out.extend_from_slice(&px.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_box_prefers_rectangle() {
        // One changed pixel: 8 bytes as a rectangle vs 12 as a point.
        assert_eq!(select_strategy(1, 1, 1), Strategy::Rectangle);
    }

    #[test]
    fn dense_region_prefers_rectangle() {
        // 100x100 fully changed: 20 006 vs 120 000.
        assert_eq!(select_strategy(10_000, 100, 100), Strategy::Rectangle);
    }

    #[test]
    fn scattered_pixels_prefer_sparse() {
        // 50 points over a 100x100 box: 600 vs 20 006.
        assert_eq!(select_strategy(50, 100, 100), Strategy::Sparse);
    }

    #[test]
    fn selection_boundary_is_exact() {
        // box_cost = 6 + 24*1*2 = 54; 4 points cost 48, 5 points cost 60.
        assert_eq!(select_strategy(4, 24, 1), Strategy::Sparse);
        assert_eq!(select_strategy(5, 24, 1), Strategy::Rectangle);
        // Equal costs fall to rectangle: box_cost = 6 + 21*1*2 = 48.
        assert_eq!(select_strategy(4, 21, 1), Strategy::Rectangle);
    }

    #[test]
    fn tile_spans_cap_strip_height() {
        let spans: Vec<_> = tile_spans(100).collect();
        assert_eq!(spans, vec![(0, 40), (40, 40), (80, 20)]);
        assert_eq!(spans.iter().map(|&(_, h)| h).sum::<usize>(), 100);

        assert_eq!(tile_spans(40).collect::<Vec<_>>(), vec![(0, 40)]);
        assert_eq!(tile_spans(1).collect::<Vec<_>>(), vec![(0, 1)]);
        assert_eq!(tile_spans(0).count(), 0);
    }

    #[test]
    fn pack_rows_copies_row_major_little_endian() {
        // 4x3 source, pack the middle 2x2 at (1, 1).
        #[rustfmt::skip]
        let src: Vec<u16> = vec![
            0x0001, 0x0002, 0x0003, 0x0004,
            0x0005, 0x1122, 0x3344, 0x0008,
            0x0009, 0x5566, 0x7788, 0x000C,
        ];
        let mut out = Vec::new();
        pack_rows(&src, 4, 1, 1, 2, 2, &mut out);
        assert_eq!(out, vec![0x22, 0x11, 0x44, 0x33, 0x66, 0x55, 0x88, 0x77]);
    }

    #[test]
    fn pack_transposed_walks_the_physical_rectangle() {
        // Logical 3x2 at the origin of a 3-wide source.
        #[rustfmt::skip]
        let src: Vec<u16> = vec![
            0x000A, 0x000B, 0x000C,
            0x000D, 0x000E, 0x000F,
        ];
        let mut out = Vec::new();
        pack_transposed(&src, 3, 0, 0, 3, 2, &mut out);
        // Physical rows follow logical columns: (A, D), (B, E), (C, F).
        assert_eq!(
            out,
            vec![0x0A, 0, 0x0D, 0, 0x0B, 0, 0x0E, 0, 0x0C, 0, 0x0F, 0]
        );
    }

    #[test]
    fn pack_transposed_single_row_reads_straight_through() {
        // A w x 1 logical strip transposes to a 1-wide physical column whose
        // payload is the strip in order.
        let src: Vec<u16> = (0..480).collect();
        let mut out = Vec::new();
        pack_transposed(&src, 480, 0, 0, 480, 1, &mut out);
        assert_eq!(out.len(), 960);
        for (i, pair) in out.chunks(2).enumerate() {
            assert_eq!(u16::from_le_bytes([pair[0], pair[1]]), i as u16);
        }
    }
}
