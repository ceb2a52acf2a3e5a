use std::sync::Arc;

use crate::analysis::realtime::{AnalyzerHandle, RealtimeAnalyzer};
use crate::models::artifact::Artifact;
use crate::models::error::CaptureError;
use crate::models::format::RecordingFormat;
use crate::models::state::CaptureState;
use crate::models::stream::AudioStream;
use crate::negotiation;
use crate::render::waveform::{RenderLoopHandle, WaveformRenderer};
use crate::session::capture::CaptureSession;
use crate::traits::frame_clock::FrameClock;
use crate::traits::recorder_delegate::RecorderDelegate;
use crate::traits::render_surface::RenderSurface;
use crate::traits::stream_acquirer::StreamAcquirer;
use crate::traits::track_encoder::EncoderFactory;

/// Everything live during one recording, torn down in a fixed order.
struct ActiveRecording {
    stream: AudioStream,
    session: CaptureSession,
    analyzer: AnalyzerHandle,
    render: RenderLoopHandle,
}

/// Composition root tying the capture session and the visualization loop
/// to one acquired stream, so they start and stop together and no
/// resource outlives its owner.
///
/// Generic over the device acquirer; encoders, surface, and clock are
/// injected through their seams.
///
/// Start order: acquire → negotiate → session start → analyzer attach →
/// renderer start. A failure at any step releases everything acquired by
/// the earlier steps before surfacing.
///
/// Stop order: renderer cancel → analyzer detach → session stop. The
/// render loop is joined before the analyzer graph goes away, and the
/// session's stop edge releases the device tracks.
pub struct RecorderController<A: StreamAcquirer> {
    acquirer: A,
    encoders: Arc<dyn EncoderFactory>,
    surface: Arc<dyn RenderSurface>,
    clock: Arc<dyn FrameClock>,
    runtime_identity: String,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    active: Option<ActiveRecording>,
}

impl<A: StreamAcquirer> RecorderController<A> {
    pub fn new(
        acquirer: A,
        encoders: Arc<dyn EncoderFactory>,
        surface: Arc<dyn RenderSurface>,
        clock: Arc<dyn FrameClock>,
        runtime_identity: impl Into<String>,
    ) -> Self {
        Self {
            acquirer,
            encoders,
            surface,
            clock,
            runtime_identity: runtime_identity.into(),
            delegate: None,
            active: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// The live stream handle while recording (for UI components that
    /// observe it), `None` otherwise.
    pub fn live_stream(&self) -> Option<&AudioStream> {
        self.active.as_ref().map(|rec| &rec.stream)
    }

    /// The container negotiated for the current recording.
    pub fn negotiated_format(&self) -> Option<&RecordingFormat> {
        self.active.as_ref().and_then(|rec| rec.session.format())
    }

    /// Acquire the microphone and start encoding plus visualization.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyActive);
        }

        let stream = match self.acquirer.acquire() {
            Ok(stream) => stream,
            Err(e) => return Err(self.surface_error(e)),
        };

        let format = negotiation::choose_recording_format(&self.runtime_identity);
        log::debug!(
            "negotiated {} for runtime '{}'",
            format.container_mime,
            self.runtime_identity
        );

        let mut session = CaptureSession::new(Arc::clone(&self.encoders));
        if let Err(e) = session.start(stream.clone(), format) {
            // The stream is the only resource acquired so far; release it
            // before surfacing the failure.
            stream.stop_tracks();
            return Err(self.surface_error(e));
        }

        let analyzer = RealtimeAnalyzer::attach(&stream);
        let render = WaveformRenderer::start(
            analyzer.clone(),
            Arc::clone(&self.surface),
            Arc::clone(&self.clock),
        );

        self.active = Some(ActiveRecording {
            stream,
            session,
            analyzer,
            render,
        });
        self.notify_state(CaptureState::Active);
        Ok(())
    }

    /// Stop recording, yielding the finalized artifact once the encoder
    /// has flushed. Device tracks are released on every path out.
    pub fn stop_recording(&mut self) -> Result<Artifact, CaptureError> {
        let Some(mut rec) = self.active.take() else {
            return Err(CaptureError::NotActive);
        };

        // Fixed shutdown order: no tick may run once the analyzer graph
        // starts tearing down, and only the session's stop edge releases
        // the device.
        rec.render.cancel();
        rec.analyzer.detach();
        let result = rec.session.stop();

        self.notify_state(CaptureState::Finalized);
        match &result {
            Ok(artifact) => {
                if let Some(delegate) = &self.delegate {
                    delegate.on_artifact_ready(artifact);
                }
            }
            Err(e) => {
                if let Some(delegate) = &self.delegate {
                    delegate.on_error(e);
                }
            }
        }
        result
    }

    fn surface_error(&self, e: CaptureError) -> CaptureError {
        if let Some(delegate) = &self.delegate {
            delegate.on_error(&e);
        }
        e
    }

    fn notify_state(&self, state: CaptureState) {
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(&state);
        }
    }
}

impl<A: StreamAcquirer> Drop for RecorderController<A> {
    fn drop(&mut self) {
        if self.active.is_some() {
            log::warn!("recorder dropped while active; running the stop sequence");
            let _ = self.stop_recording();
        }
    }
}
