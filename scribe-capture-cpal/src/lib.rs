//! # scribe-capture-cpal
//!
//! cpal microphone backend for scribe-capture.
//!
//! Provides:
//! - `CpalMicAcquirer` — default-microphone acquisition implementing the
//!   core `StreamAcquirer` seam
//! - `runtime_identity` — platform identity string for container
//!   negotiation
//!
//! ## Usage
//! ```ignore
//! use scribe_capture_core::{
//!     OpusEncoderFactory, PixmapSurface, RecorderController, RefreshClock,
//! };
//! use scribe_capture_cpal::{runtime_identity, CpalMicAcquirer};
//! use std::sync::Arc;
//!
//! let surface = Arc::new(PixmapSurface::new(500, 100).unwrap());
//! let mut recorder = RecorderController::new(
//!     CpalMicAcquirer::new(),
//!     Arc::new(OpusEncoderFactory),
//!     surface,
//!     Arc::new(RefreshClock::standard()),
//!     runtime_identity(),
//! );
//! recorder.start_recording()?;
//! // ...
//! let artifact = recorder.stop_recording()?;
//! ```

pub mod mic;
pub mod runtime;

pub use mic::CpalMicAcquirer;
pub use runtime::runtime_identity;
