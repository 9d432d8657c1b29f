use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::policy::{FitDirection, FitPolicy};

/// Placement of a fixed-size source inside a viewport for a single frame.
///
/// All rectangles live in one coordinate space each: `dest` in viewport
/// coordinates (origin at the viewport's top-left corner), `source` in the
/// source surface's own coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFit {
    /// Per-axis scale factor after the direction clamp.
    pub scale: Vec2,
    /// Source size multiplied by `scale`, before clipping.
    pub scaled_size: Size,
    /// Where the source lands in the viewport, already clipped to it.
    pub dest: Rect,
    /// Portion of the source that is sampled to fill `dest`.
    pub source: Rect,
    /// Maps source-local coordinates onto viewport coordinates.
    pub transform: Affine,
}

impl ViewportFit {
    /// Projects a point in source coordinates into the viewport.
    pub fn map_point(&self, point: Point) -> Point {
        self.transform * point
    }

    /// Returns true when only part of the source survives the clip.
    pub fn is_clipped(&self, source: Size) -> bool {
        const EPSILON: f64 = 1e-9;
        self.source.width() + EPSILON < source.width
            || self.source.height() + EPSILON < source.height
    }
}

/// A size can be painted only when both dimensions are finite and positive.
pub fn is_renderable(size: Size) -> bool {
    size.is_finite() && size.width > 0.0 && size.height > 0.0
}

/// Computes the per-axis scale a policy asks for, clamped by `direction`.
///
/// `source` must be renderable; callers go through [`fit_viewport`] unless
/// they only need the factors.
pub fn scale_factors(
    viewport: Size,
    source: Size,
    policy: FitPolicy,
    direction: FitDirection,
) -> Vec2 {
    let (x, y) = policy.raw_factors(
        viewport.width / source.width,
        viewport.height / source.height,
    );
    Vec2::new(direction.clamp(x), direction.clamp(y))
}

/// Centers a rectangle of size `inner` within `outer`. The result may extend
/// past `outer` when `inner` is larger.
pub fn center_rect(outer: Rect, inner: Size) -> Rect {
    let origin = Point::new(
        outer.x0 + (outer.width() - inner.width) * 0.5,
        outer.y0 + (outer.height() - inner.height) * 0.5,
    );
    Rect::from_origin_size(origin, inner)
}

/// Maps `source` into `viewport` according to `policy` and `direction`.
///
/// Returns `None` when the frame cannot be rendered: a source or viewport with
/// a non-positive dimension, or a placement that clips away to nothing.
pub fn fit_viewport(
    viewport: Size,
    source: Size,
    policy: FitPolicy,
    direction: FitDirection,
) -> Option<ViewportFit> {
    if !is_renderable(source) || !is_renderable(viewport) {
        return None;
    }

    let scale = scale_factors(viewport, source, policy, direction);
    let scaled_size = Size::new(source.width * scale.x, source.height * scale.y);
    let viewport_rect = viewport.to_rect();
    let dest = center_rect(viewport_rect, scaled_size).intersect(viewport_rect);
    if dest.width() <= 0.0 || dest.height() <= 0.0 {
        return None;
    }

    let sampled = Size::new(dest.width() / scale.x, dest.height() / scale.y);
    let source_rect = center_rect(source.to_rect(), sampled);

    let transform = Affine::translate(dest.origin().to_vec2())
        * Affine::scale_non_uniform(
            dest.width() / source_rect.width(),
            dest.height() / source_rect.height(),
        )
        * Affine::translate(-source_rect.origin().to_vec2());

    Some(ViewportFit {
        scale,
        scaled_size,
        dest,
        source: source_rect,
        transform,
    })
}
