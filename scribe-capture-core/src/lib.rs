//! # scribe-capture-core
//!
//! Platform-agnostic dictation capture core.
//!
//! Records a live microphone stream into a compressed container while a
//! display-cadence loop paints the waveform, and tears every acquired
//! device/media resource down deterministically however recording ends.
//! Platform backends (e.g. `scribe-capture-cpal`) implement the
//! `StreamAcquirer` trait and plug into the generic `RecorderController`.
//!
//! ## Architecture
//!
//! ```text
//! scribe-capture-core (this crate)
//! ├── traits/       ← StreamAcquirer, TrackEncoder/EncoderFactory,
//! │                   RenderSurface, FrameClock, RecorderDelegate
//! ├── models/       ← CaptureError, CaptureState, RecordingFormat,
//! │                   AudioStream, AmplitudeFrame, Artifact
//! ├── negotiation   ← runtime identity → recording container
//! ├── processing/   ← sample queueing, downmix/resample, Opus, WebM
//! ├── analysis/     ← RealtimeAnalyzer (2048-sample live probe)
//! ├── render/       ← WaveformRenderer loop, pixmap surface, clock
//! └── session/      ← CaptureSession state machine, RecorderController
//! ```

pub mod analysis;
pub mod models;
pub mod negotiation;
pub mod processing;
pub mod render;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use analysis::realtime::{AnalyzerHandle, RealtimeAnalyzer};
pub use models::artifact::{Artifact, ArtifactMetadata, PlayableHandle};
pub use models::error::CaptureError;
pub use models::format::{RecordingFormat, StreamFormat, MP4_MIME, WEBM_MIME};
pub use models::frame::{AmplitudeFrame, ANALYSIS_WINDOW};
pub use models::state::CaptureState;
pub use models::stream::{AudioStream, InputTrack, TapHandle};
pub use negotiation::choose_recording_format;
pub use processing::opus_webm::{OpusEncoderFactory, OpusWebmEncoder};
pub use render::clock::RefreshClock;
pub use render::pixmap::PixmapSurface;
pub use render::waveform::{RenderLoopHandle, WaveformRenderer};
pub use session::capture::CaptureSession;
pub use session::recorder::RecorderController;
pub use traits::frame_clock::FrameClock;
pub use traits::recorder_delegate::RecorderDelegate;
pub use traits::render_surface::RenderSurface;
pub use traits::stream_acquirer::StreamAcquirer;
pub use traits::track_encoder::{EncodedTrack, EncoderFactory, TrackEncoder};
