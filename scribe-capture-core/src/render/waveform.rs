use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::analysis::realtime::AnalyzerHandle;
use crate::models::frame::AmplitudeFrame;
use crate::traits::frame_clock::FrameClock;
use crate::traits::render_surface::RenderSurface;

/// Display-cadence waveform painter.
///
/// Each tick pulls one amplitude frame from the analyzer, clears the
/// surface, and strokes one connected polyline spanning the surface
/// width — instantaneous amplitude over the analysis window, no trails.
///
/// The loop never decides to stop on its own: it runs until its handle is
/// cancelled (or the clock shuts down). The owner cancels it whenever the
/// stream or the recording stops being live.
pub struct WaveformRenderer;

impl WaveformRenderer {
    pub fn start(
        analyzer: AnalyzerHandle,
        surface: Arc<dyn RenderSurface>,
        clock: Arc<dyn FrameClock>,
    ) -> RenderLoopHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let worker = thread::Builder::new()
            .name("waveform-render".into())
            .spawn(move || {
                while clock.wait_frame() {
                    if flag.load(Ordering::SeqCst) {
                        break;
                    }
                    let frame = match analyzer.sample() {
                        Ok(frame) => frame,
                        Err(e) => {
                            // Probing a torn-down analyzer means the owner
                            // detached before cancelling — an ordering bug.
                            log::error!("render tick after analyzer teardown: {e}");
                            break;
                        }
                    };
                    draw_frame(surface.as_ref(), &frame);
                }
            })
            .expect("failed to spawn render thread");

        RenderLoopHandle {
            cancelled,
            worker: Some(worker),
        }
    }
}

/// Map one frame across the surface and stroke it.
///
/// Unsigned samples normalize to `v = s / 128` (midline at 1.0), scaled
/// onto the surface height; the line settles back to the midline at the
/// right edge.
fn draw_frame(surface: &dyn RenderSurface, frame: &AmplitudeFrame) {
    let width = surface.width() as f32;
    let height = surface.height() as f32;
    let samples = frame.samples();
    if samples.is_empty() {
        return;
    }

    let slice_width = width / samples.len() as f32;
    let mut points = Vec::with_capacity(samples.len() + 1);
    for (i, &s) in samples.iter().enumerate() {
        let v = s as f32 / AmplitudeFrame::MIDLINE as f32;
        points.push((i as f32 * slice_width, v * height / 2.0));
    }
    points.push((width, height / 2.0));

    surface.clear();
    surface.stroke_polyline(&points);
}

/// Owned cancellation token for one render loop.
///
/// `cancel` is the only way the loop ends (short of clock shutdown):
/// after it returns, the worker has been joined and no further tick can
/// run — which is what lets the owner tear the analyzer down safely
/// afterwards. An in-flight tick finishes its draw; it is not aborted
/// mid-stroke.
pub struct RenderLoopHandle {
    cancelled: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl RenderLoopHandle {
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("render worker panicked");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for RenderLoopHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::realtime::RealtimeAnalyzer;
    use crate::models::format::StreamFormat;
    use crate::models::frame::ANALYSIS_WINDOW;
    use crate::models::stream::{AudioStream, InputTrack};
    use crate::render::clock::RefreshClock;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct CountingSurface {
        polylines: Mutex<Vec<Vec<(f32, f32)>>>,
        clears: Mutex<usize>,
    }

    impl CountingSurface {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                polylines: Mutex::new(Vec::new()),
                clears: Mutex::new(0),
            })
        }

        fn polyline_count(&self) -> usize {
            self.polylines.lock().len()
        }
    }

    impl RenderSurface for CountingSurface {
        fn width(&self) -> u32 {
            500
        }

        fn height(&self) -> u32 {
            100
        }

        fn clear(&self) {
            *self.clears.lock() += 1;
        }

        fn stroke_polyline(&self, points: &[(f32, f32)]) {
            self.polylines.lock().push(points.to_vec());
        }
    }

    fn live_setup() -> (AudioStream, AnalyzerHandle) {
        let stream = AudioStream::new(
            StreamFormat::mono(48_000),
            vec![InputTrack::unmanaged("mic")],
        );
        let analyzer = RealtimeAnalyzer::attach(&stream);
        (stream, analyzer)
    }

    fn wait_for(deadline_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..deadline_ms {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn ticks_clear_then_stroke_one_polyline_each() {
        let (stream, analyzer) = live_setup();
        let surface = CountingSurface::new();
        let clock = Arc::new(RefreshClock::with_refresh_rate(240));

        stream.deliver(&vec![0.5; ANALYSIS_WINDOW]);
        let mut handle =
            WaveformRenderer::start(analyzer, Arc::clone(&surface) as Arc<dyn RenderSurface>, clock);

        assert!(wait_for(500, || surface.polyline_count() >= 3));
        handle.cancel();

        let polylines = surface.polylines.lock();
        assert!(*surface.clears.lock() >= polylines.len());
        // Window plus the closing midline point, spanning the full width.
        let first = &polylines[0];
        assert_eq!(first.len(), ANALYSIS_WINDOW + 1);
        assert_eq!(first.last(), Some(&(500.0, 50.0)));
    }

    #[test]
    fn no_tick_runs_after_cancel_returns() {
        let (_stream, analyzer) = live_setup();
        let surface = CountingSurface::new();
        let clock = Arc::new(RefreshClock::with_refresh_rate(240));

        let mut handle =
            WaveformRenderer::start(analyzer, Arc::clone(&surface) as Arc<dyn RenderSurface>, clock);
        assert!(wait_for(500, || surface.polyline_count() >= 1));

        handle.cancel();
        assert!(handle.is_cancelled());

        let after_cancel = surface.polyline_count();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(surface.polyline_count(), after_cancel);
    }

    #[test]
    fn cancel_is_idempotent_and_drop_cancels() {
        let (_stream, analyzer) = live_setup();
        let surface = CountingSurface::new();
        let clock = Arc::new(RefreshClock::with_refresh_rate(240));

        let mut handle =
            WaveformRenderer::start(analyzer.clone(), Arc::clone(&surface) as Arc<dyn RenderSurface>, clock);
        handle.cancel();
        handle.cancel();
        drop(handle);

        // The loop is gone; the analyzer is still attached (cancelling
        // the renderer never tears the graph down).
        assert!(analyzer.is_attached());
    }

    #[test]
    fn loop_exits_rather_than_ticking_a_torn_down_graph() {
        let (_stream, analyzer) = live_setup();
        let surface = CountingSurface::new();
        let clock = Arc::new(RefreshClock::with_refresh_rate(240));

        let mut handle =
            WaveformRenderer::start(analyzer.clone(), Arc::clone(&surface) as Arc<dyn RenderSurface>, clock);
        assert!(wait_for(500, || surface.polyline_count() >= 1));

        // Wrong order on purpose: detach before cancel. The next tick
        // observes the torn-down graph and stops instead of panicking.
        analyzer.detach();
        thread::sleep(Duration::from_millis(30));
        handle.cancel();
    }
}
