use crate::error::Result;

pub type Frame = image::DynamicImage;

/// An open capture device.
pub trait FrameSource: Send {
    /// Pulls the latest frame into the internal buffer.
    /// An `Err` means the device is gone and capture cannot continue.
    fn refresh(&mut self) -> Result<()>;

    fn current_frame(&self) -> Result<Frame>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}

pub trait FrameSourceProvider: Send + Sync {
    /// Fails with `Error::DeviceUnavailable` when no device grants access.
    fn open(&self, width: u32, height: u32, mirror: bool) -> Result<Box<dyn FrameSource>>;
}
