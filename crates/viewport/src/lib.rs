//! Stretch-fit math for painting a fixed-size surface into a resizable viewport.
//!
//! Every animated effect renders into a surface of a known size (the shader's
//! resolution) while the control hosting it can be any size. [`fit_viewport`]
//! turns the two sizes plus a [`FitPolicy`]/[`FitDirection`] pair into:
//!
//! ```text
//!   source (w×h) ──scale──▶ scaled size ──center──▶ dest rect ∩ viewport
//!        ▲                                               │
//!        └──────── source rect = dest / scale ◀──────────┘
//! ```
//!
//! plus the affine transform that places the source bitmap accordingly. The
//! functions are pure and allocation free, so they are safe to call while a
//! renderer holds its state lock.

mod fit;
mod policy;

pub use fit::{center_rect, fit_viewport, is_renderable, scale_factors, ViewportFit};
pub use kurbo::{Affine, Point, Rect, Size, Vec2};
pub use policy::{FitDirection, FitPolicy, ParseFitError};
