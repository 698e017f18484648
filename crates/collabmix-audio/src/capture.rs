//! Microphone capture boundary, present only on recordable tracks.

use collabmix_core::CaptureError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Future returned by [`MicrophoneCapture::request_stream`].
pub type StreamFuture = Pin<Box<dyn Future<Output = Result<CaptureStream, CaptureError>> + Send>>;

/// Future returned by [`MicrophoneCapture::stop_capture`], yielding the encoded take.
pub type TakeFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, CaptureError>> + Send>>;

/// Opaque granted input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureStream(u64);

impl CaptureStream {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CaptureStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Access to the environment's microphone.
pub trait MicrophoneCapture: Send {
    /// Ask for an input stream. May resolve to `CaptureError::PermissionDenied`.
    fn request_stream(&mut self) -> StreamFuture;

    /// Begin capturing from a granted stream.
    fn start_capture(&mut self, stream: CaptureStream);

    /// Finish the current take and hand back its bytes in a format the
    /// track's engine can decode.
    fn stop_capture(&mut self) -> TakeFuture;
}
