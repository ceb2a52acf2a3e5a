use parking_lot::Mutex;
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::traits::render_surface::RenderSurface;

/// Waveform trace stroke width in pixels.
const STROKE_WIDTH: f32 = 2.0;

// Indigo, matching the product's accent color.
fn trace_color() -> Color {
    Color::from_rgba8(0x4F, 0x46, 0xE5, 0xFF)
}

/// Software raster surface backed by a tiny-skia pixmap.
///
/// The UI collaborator reads frames out via [`PixmapSurface::snapshot`];
/// the render thread draws in through the `RenderSurface` seam.
pub struct PixmapSurface {
    pixmap: Mutex<Pixmap>,
    width: u32,
    height: u32,
}

impl PixmapSurface {
    /// `None` when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Mutex::new(Pixmap::new(width, height)?),
            width,
            height,
        })
    }

    /// Copy of the current frame.
    pub fn snapshot(&self) -> Pixmap {
        self.pixmap.lock().clone()
    }
}

impl RenderSurface for PixmapSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&self) {
        self.pixmap.lock().fill(Color::TRANSPARENT);
    }

    fn stroke_polyline(&self, points: &[(f32, f32)]) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(first.0, first.1);
        for &(x, y) in rest {
            pb.line_to(x, y);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(trace_color());
        paint.anti_alias = true;

        let stroke = Stroke {
            width: STROKE_WIDTH,
            ..Stroke::default()
        };

        self.pixmap.lock().stroke_path(
            &path,
            &paint,
            &stroke,
            Transform::identity(),
            None,
        );
    }
}
