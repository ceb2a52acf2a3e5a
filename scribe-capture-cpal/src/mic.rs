//! Microphone acquisition via cpal.
//!
//! `cpal::Stream` is not `Send`, so each acquired stream is owned by a
//! dedicated capture thread: the thread opens the device, hands the live
//! `AudioStream` handle back over a channel, then parks until the
//! track's stop hook wakes it to drop the device stream.

use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

use scribe_capture_core::models::error::CaptureError;
use scribe_capture_core::models::format::StreamFormat;
use scribe_capture_core::models::stream::{AudioStream, InputTrack};
use scribe_capture_core::traits::stream_acquirer::StreamAcquirer;

/// Acquires audio-only input streams from the default microphone.
#[derive(Debug, Default)]
pub struct CpalMicAcquirer;

impl CpalMicAcquirer {
    pub fn new() -> Self {
        Self
    }
}

impl StreamAcquirer for CpalMicAcquirer {
    fn acquire(&self) -> Result<AudioStream, CaptureError> {
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || capture_thread(ready_tx))
            .map_err(|e| CaptureError::Unknown(format!("spawn capture thread: {e}")))?;

        // The thread reports either the live stream or why it could not
        // open the device; a thread that dies without reporting counts as
        // the device going away.
        ready_rx
            .recv()
            .map_err(|_| CaptureError::DeviceUnavailable)?
    }
}

fn capture_thread(ready_tx: mpsc::Sender<Result<AudioStream, CaptureError>>) {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable));
        return;
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(map_config_error(e)));
            return;
        }
    };

    let stream_format = StreamFormat {
        sample_rate: supported.sample_rate().0,
        channels: supported.channels(),
    };
    let label = device
        .name()
        .unwrap_or_else(|_| "default input".to_string());

    // The track's stop hook wakes this thread; dropping the last stream
    // handle drops the hook and wakes it too.
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let audio_stream = AudioStream::new(
        stream_format,
        vec![InputTrack::new(label, move || {
            let _ = stop_tx.send(());
        })],
    );

    let config = supported.config();
    let built = match supported.sample_format() {
        SampleFormat::F32 => {
            let fan = audio_stream.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| fan.deliver(data),
                log_stream_error,
                None,
            )
        }
        SampleFormat::I16 => {
            let fan = audio_stream.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| s as f32 / 32_768.0).collect();
                    fan.deliver(&floats);
                },
                log_stream_error,
                None,
            )
        }
        SampleFormat::U16 => {
            let fan = audio_stream.clone();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> = data
                        .iter()
                        .map(|&s| (s as f32 - 32_768.0) / 32_768.0)
                        .collect();
                    fan.deliver(&floats);
                },
                log_stream_error,
                None,
            )
        }
        other => {
            let _ = ready_tx.send(Err(CaptureError::Unknown(format!(
                "unsupported sample format {other:?}"
            ))));
            return;
        }
    };

    let stream = match built {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(map_build_error(e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Unknown(format!("play stream: {e}"))));
        return;
    }

    log::debug!(
        "mic capture running at {} Hz, {} channel(s)",
        stream_format.sample_rate,
        stream_format.channels
    );
    let _ = ready_tx.send(Ok(audio_stream));

    // Park until released, then drop the device stream.
    let _ = stop_rx.recv();
    drop(stream);
    log::debug!("mic capture released");
}

fn log_stream_error(err: cpal::StreamError) {
    log::error!("mic stream error: {err}");
}

fn map_config_error(e: cpal::DefaultStreamConfigError) -> CaptureError {
    match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            map_backend_description(&err.description)
        }
        other => CaptureError::Unknown(other.to_string()),
    }
}

fn map_build_error(e: cpal::BuildStreamError) -> CaptureError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::BuildStreamError::BackendSpecific { err } => {
            map_backend_description(&err.description)
        }
        other => CaptureError::Unknown(other.to_string()),
    }
}

/// Platform backends report permission refusals as free-form text; pick
/// them out so the UI can say "could not access microphone" rather than
/// showing a driver string.
fn map_backend_description(description: &str) -> CaptureError {
    let lower = description.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not allowed") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Unknown(description.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_phrases_map_to_permission_denied() {
        for description in [
            "Access denied by user",
            "microphone permission missing",
            "Operation not allowed",
        ] {
            assert_eq!(
                map_backend_description(description),
                CaptureError::PermissionDenied
            );
        }
    }

    #[test]
    fn other_backend_errors_stay_opaque() {
        assert!(matches!(
            map_backend_description("device exploded"),
            CaptureError::Unknown(_)
        ));
    }
}
