use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::format::StreamFormat;

/// Callback receiving interleaved f32 sample slices from the capture
/// backend. Fires on the backend's audio thread — keep work minimal.
pub type SampleTap = Box<dyn Fn(&[f32]) + Send + Sync>;

/// One hardware input track backing a stream.
///
/// `stop` releases the underlying device resource via the backend hook and
/// is idempotent; after the first call the track permanently reports
/// stopped. Mirrors a media track's `stop()`/`readyState` pair.
pub struct InputTrack {
    label: String,
    stopped: AtomicBool,
    on_stop: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl InputTrack {
    /// Track whose device resource is released by `on_stop`.
    pub fn new(label: impl Into<String>, on_stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            stopped: AtomicBool::new(false),
            on_stop: Mutex::new(Some(Box::new(on_stop))),
        }
    }

    /// Track with no backing device hook (synthetic streams).
    pub fn unmanaged(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stopped: AtomicBool::new(false),
            on_stop: Mutex::new(None),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Release the device resource. Only the first call runs the hook.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(hook) = self.on_stop.lock().take() {
            hook();
        }
    }
}

struct StreamShared {
    format: StreamFormat,
    tracks: Vec<InputTrack>,
    taps: Mutex<Vec<(u64, SampleTap)>>,
    next_tap_id: AtomicU64,
    released: AtomicBool,
}

/// Live handle to one acquired audio input resource.
///
/// Cloning is cheap and yields another reference to the same underlying
/// device tracks — one clone per consumer (encoder, analyzer, controller),
/// the way several components hold the same media stream. Consumers
/// observe samples through read-only taps; the backend pushes into every
/// registered tap via [`AudioStream::deliver`].
///
/// The tracks are released exactly once, through [`AudioStream::stop_tracks`];
/// after release, delivered samples are discarded and the stream must not
/// be read again.
#[derive(Clone)]
pub struct AudioStream {
    shared: Arc<StreamShared>,
}

/// Registration receipt for a sample tap; pass back to
/// [`AudioStream::remove_tap`] to unregister.
#[derive(Debug)]
pub struct TapHandle {
    id: u64,
}

impl AudioStream {
    pub fn new(format: StreamFormat, tracks: Vec<InputTrack>) -> Self {
        Self {
            shared: Arc::new(StreamShared {
                format,
                tracks,
                taps: Mutex::new(Vec::new()),
                next_tap_id: AtomicU64::new(1),
                released: AtomicBool::new(false),
            }),
        }
    }

    pub fn format(&self) -> StreamFormat {
        self.shared.format
    }

    pub fn tracks(&self) -> &[InputTrack] {
        &self.shared.tracks
    }

    /// Register a read-only sample tap.
    pub fn add_tap(&self, tap: impl Fn(&[f32]) + Send + Sync + 'static) -> TapHandle {
        let id = self.shared.next_tap_id.fetch_add(1, Ordering::SeqCst);
        self.shared.taps.lock().push((id, Box::new(tap)));
        TapHandle { id }
    }

    /// Unregister a tap. Detaching a consumer never releases the device;
    /// only `stop_tracks` does that.
    pub fn remove_tap(&self, handle: TapHandle) {
        self.shared.taps.lock().retain(|(id, _)| *id != handle.id);
    }

    #[cfg(test)]
    pub(crate) fn tap_count(&self) -> usize {
        self.shared.taps.lock().len()
    }

    /// Push one interleaved sample slice to every registered tap.
    ///
    /// Called by the capture backend on its audio thread. Slices arriving
    /// after release are dropped.
    pub fn deliver(&self, samples: &[f32]) {
        if self.shared.released.load(Ordering::SeqCst) {
            return;
        }
        for (_, tap) in self.shared.taps.lock().iter() {
            tap(samples);
        }
    }

    /// Release every device track. The single release point for the
    /// hardware resource; later calls are no-ops.
    pub fn stop_tracks(&self) {
        if self.shared.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for track in &self.shared.tracks {
            track.stop();
        }
    }

    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::SeqCst)
    }

    pub fn all_tracks_stopped(&self) -> bool {
        self.shared.tracks.iter().all(InputTrack::is_stopped)
    }
}
