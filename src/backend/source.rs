//! FrameSource trait for frame acquisition
//!
//! Every producer owns one source. Simulated sources synthesize payloads;
//! a hardware source would read them from a serial link. Tests substitute
//! a mockall-generated `MockFrameSource`.

use crate::error::Result;
use crate::types::Direction;

/// Supplies raw frame payloads to a channel producer
///
/// Implementations must return errors rather than panic; a failed read
/// only skips the current producer iteration.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSource: Send {
    /// Produce one frame of `length` bytes for `direction`
    fn read_frame(&mut self, direction: Direction, length: usize) -> Result<Vec<u8>>;

    /// Short label used in logs
    fn describe(&self) -> String;
}
