//! Video sources.

pub mod udp;

use crate::frame::Frame;

/// A source of video frames, such as a network stream.
///
/// The interface mirrors a capture device: it is opened by its constructor, reports whether it is
/// still open, reads frames into a caller-provided [`Frame`], and is released once when the
/// consumer is done with it.
pub trait VideoSource {
    /// Returns whether the source can still produce frames.
    fn is_open(&self) -> bool;

    /// Reads the next frame into `frame`, overwriting its contents.
    ///
    /// If no frame could be obtained, `frame` is left empty (see [`Frame::is_empty`]). This is
    /// not an error: network streams can drop or fail to decode individual frames.
    fn read(&mut self, frame: &mut Frame);

    /// Releases the resources held by the source. After this, [`VideoSource::is_open`] returns
    /// `false`.
    ///
    /// Calling this again on a released source does nothing.
    fn release(&mut self);
}

impl<S: VideoSource + ?Sized> VideoSource for &mut S {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn read(&mut self, frame: &mut Frame) {
        (**self).read(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn read(&mut self, frame: &mut Frame) {
        (**self).read(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
