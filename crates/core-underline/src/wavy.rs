//! Wavy underline geometry: a smooth periodic curve built from cubic
//! segments approximating a sine wave, sized exactly to a rectangle width.
//!
//! The curve alternates half-period arches above and below the baseline.
//! When the width is not a whole number of half-periods, the final arch is
//! horizontally scaled to fit — never clipped, never overflowing.

/// Point relative to the marker rect origin; y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One cubic Bézier segment (the start point is the previous segment's end).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavyPath {
    pub start: Point,
    pub segments: Vec<CubicSegment>,
}

/// Full sine period in device units.
pub const WAVE_PERIOD: f32 = 6.0;
/// Peak displacement from the baseline.
pub const WAVE_AMPLITUDE: f32 = 1.5;

/// Control-point lift making a cubic arch hug a sine half-wave.
const ARCH_LIFT: f32 = 4.0 / 3.0;

/// Build the path for a marker `width` units wide. Zero or negative width
/// yields an empty path.
pub fn wavy_path(width: f32, period: f32, amplitude: f32) -> WavyPath {
    let start = Point { x: 0.0, y: 0.0 };
    let mut segments = Vec::new();
    if width <= 0.0 || period <= 0.0 {
        return WavyPath { start, segments };
    }
    let half = period / 2.0;
    let mut x = 0.0_f32;
    let mut up = true;
    while x < width {
        // Final arch shrinks to exactly consume the remaining width.
        let w = half.min(width - x);
        let lift = if up { -amplitude } else { amplitude } * ARCH_LIFT;
        segments.push(CubicSegment {
            c1: Point { x: x + w / 3.0, y: lift },
            c2: Point { x: x + 2.0 * w / 3.0, y: lift },
            to: Point { x: x + w, y: 0.0 },
        });
        x += w;
        up = !up;
    }
    WavyPath { start, segments }
}
