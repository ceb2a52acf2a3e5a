use serde::{Deserialize, Serialize};

/// Preferred recording container, supported by most runtimes' encoders.
pub const WEBM_MIME: &str = "audio/webm";

/// Fallback container for WebKit-derived runtimes, whose encoders do not
/// produce WebM.
pub const MP4_MIME: &str = "audio/mp4";

/// Container choice for one recording session.
///
/// Decided once by format negotiation before the session starts and
/// immutable afterwards; the finished artifact reports this MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingFormat {
    pub container_mime: String,
    pub is_fallback: bool,
}

impl RecordingFormat {
    pub fn preferred() -> Self {
        Self {
            container_mime: WEBM_MIME.to_string(),
            is_fallback: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            container_mime: MP4_MIME.to_string(),
            is_fallback: true,
        }
    }

    /// File extension for the playable preview file.
    pub fn extension(&self) -> &'static str {
        if self.container_mime == MP4_MIME {
            "m4a"
        } else {
            "webm"
        }
    }
}

/// Shape of the raw samples a live stream delivers to its taps:
/// interleaved f32 at the device rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Device sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl StreamFormat {
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }

    /// Frames per interleaved sample slice.
    pub fn frame_count(&self, samples: usize) -> usize {
        samples / self.channels.max(1) as usize
    }
}
