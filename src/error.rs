//! Driver error types
//!
//! [`Error`] is generic over the transport so the underlying link error
//! stays matchable; [`LinkError`](crate::interface::LinkError) is what the
//! bundled serial transport produces.
//!
//! Link failures during a write are not surfaced directly: the driver runs
//! its recovery protocol and retries the write once, so the caller only
//! sees [`Error::Link`] when the retry itself fails, or
//! [`Error::RecoveryExhausted`] when the link cannot be re-established.

use crate::interface::PanelPort;

/// Errors surfaced by the driver facade.
#[derive(Debug)]
pub enum Error<P: PanelPort> {
    /// The transport failed after recovery had already been attempted.
    Link(P::Error),
    /// The link could not be re-established, or replaying device state
    /// failed, inside the recovery window.
    RecoveryExhausted(P::Error),
    /// A coordinate or region does not fit the logical surface.
    ///
    /// The link is never touched when this is returned.
    OutOfBounds {
        /// Requested x placement.
        x: usize,
        /// Requested y placement.
        y: usize,
        /// Region width.
        w: usize,
        /// Region height.
        h: usize,
        /// Logical surface width at the time of the call.
        width: usize,
        /// Logical surface height at the time of the call.
        height: usize,
    },
}

impl<P: PanelPort> core::fmt::Display for Error<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link error: {e:?}"),
            Self::RecoveryExhausted(e) => {
                write!(f, "link recovery exhausted: {e:?}")
            }
            Self::OutOfBounds {
                x,
                y,
                w,
                h,
                width,
                height,
            } => write!(
                f,
                "region {w}x{h} at ({x}, {y}) exceeds the {width}x{height} logical surface"
            ),
        }
    }
}

impl<P: PanelPort + core::fmt::Debug> std::error::Error for Error<P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug)]
    struct NullPort;

    impl PanelPort for NullPort {
        type Error = ();

        fn write_frame(&mut self, _header: &[u8], _payload: Option<&[u8]>) -> Result<(), ()> {
            Ok(())
        }

        fn reopen(&mut self, _window: Duration) -> Result<(), ()> {
            Ok(())
        }

        fn close(&mut self) {}
    }

    #[test]
    fn out_of_bounds_names_region_and_surface() {
        let err: Error<NullPort> = Error::OutOfBounds {
            x: 300,
            y: 0,
            w: 100,
            h: 50,
            width: 320,
            height: 480,
        };
        assert_eq!(
            err.to_string(),
            "region 100x50 at (300, 0) exceeds the 320x480 logical surface"
        );
    }
}
