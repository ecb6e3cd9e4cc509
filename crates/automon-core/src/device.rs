//! Device collaborator interface

use crate::frame::Frame;
use crate::geometry::Orientation;

/// Screen capture and input injection for the controlled device.
///
/// Implementations wrap a device transport. Frames are returned at canonical
/// resolution (see [`Frame::canonicalize`]); input coordinates are
/// device-native, which is what [`Detection`](crate::Detection) carries.
pub trait FrameSource: Send {
    /// Grab the current screen.
    fn capture_frame(&mut self) -> anyhow::Result<Frame>;

    /// Press and release at a device point.
    fn tap(&mut self, x: i32, y: i32) -> anyhow::Result<()>;

    /// Drag from one device point to another.
    fn swipe(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u32) -> anyhow::Result<()>;

    /// Send the platform "back" action.
    fn back(&mut self) -> anyhow::Result<()>;

    fn orientation(&mut self) -> anyhow::Result<Orientation>;

    /// Device-native screen size.
    fn resolution(&self) -> (u32, u32);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture_frame(&mut self) -> anyhow::Result<Frame> {
        (**self).capture_frame()
    }

    fn tap(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        (**self).tap(x, y)
    }

    fn swipe(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u32) -> anyhow::Result<()> {
        (**self).swipe(x1, y1, x2, y2, duration_ms)
    }

    fn back(&mut self) -> anyhow::Result<()> {
        (**self).back()
    }

    fn orientation(&mut self) -> anyhow::Result<Orientation> {
        (**self).orientation()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}
