//! Seams between the capture core and everything platform- or
//! runtime-owned: device acquisition, encoding, rasterization, display
//! pacing, and UI notification. Backends and tests supply the
//! implementations.

pub mod frame_clock;
pub mod recorder_delegate;
pub mod render_surface;
pub mod stream_acquirer;
pub mod track_encoder;
