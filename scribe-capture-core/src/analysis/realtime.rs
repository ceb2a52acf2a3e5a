use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::frame::{AmplitudeFrame, ANALYSIS_WINDOW};
use crate::models::stream::{AudioStream, TapHandle};
use crate::processing::resample::downmix_to_mono;
use crate::processing::sample_queue::SampleQueue;

struct AnalyzerShared {
    /// Rolling window of the most recent mono samples.
    window: Mutex<SampleQueue>,
    torn_down: AtomicBool,
    tap: Mutex<Option<TapHandle>>,
}

/// Non-destructive amplitude analysis over a live stream.
///
/// Attaching registers a read-only tap; the encoder keeps consuming the
/// same stream untouched.
pub struct RealtimeAnalyzer;

impl RealtimeAnalyzer {
    /// Tap `stream` and start filling the analysis window.
    pub fn attach(stream: &AudioStream) -> AnalyzerHandle {
        let shared = Arc::new(AnalyzerShared {
            window: Mutex::new(SampleQueue::new(ANALYSIS_WINDOW)),
            torn_down: AtomicBool::new(false),
            tap: Mutex::new(None),
        });

        let channels = stream.format().channels as usize;
        let writer = Arc::clone(&shared);
        let tap = stream.add_tap(move |samples| {
            let mono = downmix_to_mono(samples, channels);
            writer.window.lock().push(&mono);
        });
        *shared.tap.lock() = Some(tap);

        AnalyzerHandle {
            shared,
            stream: stream.clone(),
        }
    }
}

/// Handle to an attached analyzer. Clones share the same underlying
/// analysis graph — one for the render loop, one for the owner that will
/// eventually detach.
#[derive(Clone)]
pub struct AnalyzerHandle {
    shared: Arc<AnalyzerShared>,
    stream: AudioStream,
}

impl AnalyzerHandle {
    /// Non-blocking probe of the current time-domain window.
    ///
    /// Legal at any cadence: returns whatever the window holds right now
    /// (padded with silence until [`ANALYSIS_WINDOW`] samples have
    /// arrived). This is a live probe, not a queue — nothing is buffered
    /// between calls.
    ///
    /// Fails with [`CaptureError::RenderGraphTornDown`] once the analyzer
    /// has been detached; the render loop must be cancelled first.
    pub fn sample(&self) -> Result<AmplitudeFrame, CaptureError> {
        if self.shared.torn_down.load(Ordering::SeqCst) {
            return Err(CaptureError::RenderGraphTornDown);
        }
        let window = self.shared.window.lock().tail(ANALYSIS_WINDOW);
        Ok(AmplitudeFrame::from_centered(&window))
    }

    /// Tear down the analysis graph: unregister the tap and fail all
    /// later probes. Idempotent. Detaching never releases the device —
    /// only the session's stop edge does that.
    pub fn detach(&self) {
        if self.shared.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tap) = self.shared.tap.lock().take() {
            self.stream.remove_tap(tap);
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.shared.torn_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::StreamFormat;
    use crate::models::stream::InputTrack;

    fn stream(channels: u16) -> AudioStream {
        AudioStream::new(
            StreamFormat {
                sample_rate: 48_000,
                channels,
            },
            vec![InputTrack::unmanaged("mic")],
        )
    }

    #[test]
    fn window_length_is_a_power_of_two() {
        assert!(ANALYSIS_WINDOW.is_power_of_two());
        assert_eq!(ANALYSIS_WINDOW, 2048);
    }

    #[test]
    fn probe_before_any_audio_is_silence() {
        let stream = stream(1);
        let analyzer = RealtimeAnalyzer::attach(&stream);

        let frame = analyzer.sample().expect("probe");
        assert_eq!(frame.len(), ANALYSIS_WINDOW);
        assert!(frame.samples().iter().all(|&s| s == AmplitudeFrame::MIDLINE));
    }

    #[test]
    fn probe_reflects_the_most_recent_window() {
        let stream = stream(1);
        let analyzer = RealtimeAnalyzer::attach(&stream);

        stream.deliver(&vec![1.0; ANALYSIS_WINDOW]);
        let loud = analyzer.sample().expect("probe");
        assert!(loud.samples().iter().all(|&s| s == 255));

        stream.deliver(&vec![0.0; ANALYSIS_WINDOW]);
        let quiet = analyzer.sample().expect("probe");
        assert!(quiet.samples().iter().all(|&s| s == AmplitudeFrame::MIDLINE));
    }

    #[test]
    fn off_cadence_probes_return_the_same_live_state() {
        let stream = stream(1);
        let analyzer = RealtimeAnalyzer::attach(&stream);
        stream.deliver(&[0.5; 100]);

        let a = analyzer.sample().expect("probe");
        let b = analyzer.sample().expect("probe");
        assert_eq!(a, b);
    }

    #[test]
    fn stereo_streams_are_downmixed_for_analysis() {
        let stream = stream(2);
        let analyzer = RealtimeAnalyzer::attach(&stream);

        // L = 1.0, R = -1.0 → mono 0.0 → midline.
        let interleaved: Vec<f32> = (0..256).flat_map(|_| [1.0, -1.0]).collect();
        stream.deliver(&interleaved);

        let frame = analyzer.sample().expect("probe");
        assert!(frame.samples().iter().all(|&s| s == AmplitudeFrame::MIDLINE));
    }

    #[test]
    fn probe_after_detach_reports_torn_down_graph() {
        let stream = stream(1);
        let analyzer = RealtimeAnalyzer::attach(&stream);
        assert_eq!(stream.tap_count(), 1);

        analyzer.detach();
        analyzer.detach();

        assert_eq!(stream.tap_count(), 0);
        assert!(!analyzer.is_attached());
        assert_eq!(
            analyzer.sample().unwrap_err(),
            CaptureError::RenderGraphTornDown
        );
    }

    #[test]
    fn clones_share_the_graph() {
        let stream = stream(1);
        let analyzer = RealtimeAnalyzer::attach(&stream);
        let probe = analyzer.clone();

        analyzer.detach();
        assert!(probe.sample().is_err());
    }
}
