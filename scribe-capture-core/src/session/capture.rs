use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::artifact::Artifact;
use crate::models::error::CaptureError;
use crate::models::format::RecordingFormat;
use crate::models::state::CaptureState;
use crate::models::stream::{AudioStream, TapHandle};
use crate::processing::sample_queue::SampleQueue;
use crate::traits::track_encoder::{EncodedTrack, EncoderFactory, TrackEncoder};

/// Cadence of the encoder worker's queue drain.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Queue headroom between the capture callback and the worker, in seconds.
const QUEUE_SECONDS: usize = 5;

/// One recording session: owns the acquired stream and an encoder bound
/// to the negotiated format.
///
/// State machine: `Idle → Active → Finalized`, with no way back out of
/// `Finalized`. `start` registers a stream tap and spawns the encoder
/// worker, which drains the tap queue on a fixed cadence — the encoder's
/// buffering runs independently of (and unsynchronized with) the render
/// loop over the same stream. `stop` joins the worker and is the single
/// release point for the device tracks; release happens even when the
/// encoder fails to flush.
pub struct CaptureSession {
    encoders: Arc<dyn EncoderFactory>,
    state: CaptureState,
    format: Option<RecordingFormat>,
    stream: Option<AudioStream>,
    tap: Option<TapHandle>,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<Result<EncodedTrack, CaptureError>>>,
}

impl CaptureSession {
    pub fn new(encoders: Arc<dyn EncoderFactory>) -> Self {
        Self {
            encoders,
            state: CaptureState::Idle,
            format: None,
            stream: None,
            tap: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The negotiated format, once `start` has accepted it.
    pub fn format(&self) -> Option<&RecordingFormat> {
        self.format.as_ref()
    }

    /// Begin encoding `stream` into `format`. The only Idle → Active edge.
    ///
    /// On failure nothing is retained: no tap is registered, no worker
    /// runs, and the caller still owns the stream (and its release).
    pub fn start(
        &mut self,
        stream: AudioStream,
        format: RecordingFormat,
    ) -> Result<(), CaptureError> {
        if !self.state.is_idle() {
            return Err(CaptureError::AlreadyActive);
        }

        let input = stream.format();
        let mut encoder = self.encoders.create(&format, input)?;

        let capacity = input.sample_rate as usize * input.channels.max(1) as usize * QUEUE_SECONDS;
        let queue = Arc::new(Mutex::new(SampleQueue::new(capacity)));

        let tap_queue = Arc::clone(&queue);
        let tap = stream.add_tap(move |samples| tap_queue.lock().push(samples));

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        let worker = thread::Builder::new()
            .name("encoder-flush".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(DRAIN_INTERVAL);
                    let chunk = queue.lock().drain_all();
                    if !chunk.is_empty() {
                        encoder.push(&chunk)?;
                    }
                }
                // Flush whatever arrived between the last drain and the
                // stop signal, then let the encoder close the container.
                let chunk = queue.lock().drain_all();
                if !chunk.is_empty() {
                    encoder.push(&chunk)?;
                }
                encoder.finalize()
            })
            .expect("failed to spawn encoder thread");

        log::debug!(
            "capture session started: {} at {} Hz",
            format.container_mime,
            input.sample_rate
        );

        self.format = Some(format);
        self.stream = Some(stream);
        self.tap = Some(tap);
        self.worker = Some(worker);
        self.state = CaptureState::Active;
        Ok(())
    }

    /// Finalize the recording. The only Active → Finalized edge.
    ///
    /// Signals the encoder worker, waits for its flush, and releases
    /// every device track — unconditionally, before the encoder's outcome
    /// is even inspected, so a failed finalize can never leak the device.
    /// Returns the artifact only once encoding has fully completed.
    pub fn stop(&mut self) -> Result<Artifact, CaptureError> {
        if !self.state.is_active() {
            return Err(CaptureError::NotActive);
        }
        self.state = CaptureState::Finalized;

        // Initiate finalize and wait for the worker to flush.
        self.running.store(false, Ordering::SeqCst);
        let joined = self.worker.take().map(thread::JoinHandle::join);

        // Single release point for the hardware resource.
        if let Some(stream) = self.stream.take() {
            if let Some(tap) = self.tap.take() {
                stream.remove_tap(tap);
            }
            stream.stop_tracks();
        }

        let encoded = match joined {
            Some(Ok(result)) => result?,
            Some(Err(_)) => {
                return Err(CaptureError::EncodingFailed(
                    "encoder worker panicked".to_string(),
                ))
            }
            None => {
                return Err(CaptureError::EncodingFailed(
                    "encoder worker missing".to_string(),
                ))
            }
        };

        let format = self.format.clone().expect("format is set while active");
        log::debug!(
            "capture session finalized: {:.2}s, {} bytes",
            encoded.duration_secs,
            encoded.bytes.len()
        );
        Artifact::from_encoded(&format, encoded.bytes, encoded.duration_secs)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.state.is_active() {
            log::warn!("capture session dropped while active; releasing device");
            let _ = self.stop();
        }
    }
}
