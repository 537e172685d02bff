//! Frame source helpers for pipeline tests

use busdata_monitor::backend::{FrameSource, SimPattern, SimulatedSource, SourceFactory};
use busdata_monitor::error::{MonitorError, Result};
use busdata_monitor::types::Direction;
use std::sync::Arc;
use std::time::Duration;

/// Source that fails every read
pub struct FailingSource;

impl FrameSource for FailingSource {
    fn read_frame(&mut self, _direction: Direction, _length: usize) -> Result<Vec<u8>> {
        Err(MonitorError::Source("no link".to_string()))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Tx frames filled with 0x01, Rx frames with 0x02
pub fn direction_tagged_factory() -> SourceFactory {
    Arc::new(|direction| {
        let fill = match direction {
            Direction::Tx => 0x01,
            Direction::Rx => 0x02,
        };
        Box::new(SimulatedSource::new().with_pattern(SimPattern::Constant(fill)))
            as Box<dyn FrameSource>
    })
}

pub fn failing_factory() -> SourceFactory {
    Arc::new(|_| Box::new(FailingSource) as Box<dyn FrameSource>)
}

/// Source whose reads block for `delay` before returning a frame
pub struct StalledSource {
    pub delay: Duration,
}

impl FrameSource for StalledSource {
    fn read_frame(&mut self, _direction: Direction, length: usize) -> Result<Vec<u8>> {
        std::thread::sleep(self.delay);
        Ok(vec![0; length])
    }

    fn describe(&self) -> String {
        "stalled".to_string()
    }
}

/// Tx reads stall for `delay`; Rx reads come from a normal simulated source
pub fn stalled_tx_factory(delay: Duration) -> SourceFactory {
    Arc::new(move |direction| match direction {
        Direction::Tx => Box::new(StalledSource { delay }) as Box<dyn FrameSource>,
        Direction::Rx => Box::new(SimulatedSource::new()) as Box<dyn FrameSource>,
    })
}
