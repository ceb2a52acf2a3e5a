use crate::models::error::CaptureError;
use crate::models::format::{RecordingFormat, StreamFormat};

/// Output of a finalized encoder: the complete container bytes and the
/// duration actually encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTrack {
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
}

/// Incremental audio encoder bound to one negotiated recording format.
///
/// Fed interleaved f32 device samples by the session's encoder worker;
/// `finalize` flushes internal buffers and yields the finished container.
/// A finalized encoder is never pushed to again.
pub trait TrackEncoder: Send {
    fn push(&mut self, samples: &[f32]) -> Result<(), CaptureError>;

    fn finalize(&mut self) -> Result<EncodedTrack, CaptureError>;
}

/// The runtime's encoder facility.
///
/// Each runtime encodes its own set of containers — the negotiator picks
/// among them, and asking for anything else is an
/// [`CaptureError::EncodingFailed`], not a silent empty recording.
pub trait EncoderFactory: Send + Sync {
    /// Whether this runtime can encode `format`.
    fn supports(&self, format: &RecordingFormat) -> bool;

    /// Create an encoder for `format` consuming samples shaped like
    /// `input`.
    fn create(
        &self,
        format: &RecordingFormat,
        input: StreamFormat,
    ) -> Result<Box<dyn TrackEncoder>, CaptureError>;
}
