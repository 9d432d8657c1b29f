//! Effect renderer for `effectsdemo`.
//!
//! An owning control never touches render state directly. It publishes
//! [`AnimationMessage`]s to its [`EffectHandler`]; the host calls
//! [`EffectHandler::apply_and_render`] once per display refresh and the
//! handler paints the shader surface, fitted into the current viewport.
//!
//! ```text
//!   control ──publish(Start/Update/Stop/Dispose)──▶ Mailbox (latest wins)
//!                                                        │
//!   scheduler tick ──▶ apply_and_render ──drain──▶ AnimationState
//!        ▲                      │
//!        │                      ├─▶ fit_viewport() ─▶ FrameArgs ─▶ paint
//!        └── request_frame ◀────┘   (only after a successful paint)
//! ```
//!
//! Shader compilation lives outside this crate; programs arrive through
//! [`EffectHandler::install_program`] as [`LoadedEffect`] values and are
//! released exactly once.

mod effect;
mod handler;
mod message;
mod runtime;
mod state;
mod uniforms;

pub use effect::{EffectLoader, EffectProgram, EffectSource, LoadedEffect};
pub use handler::{EffectHandler, FrameArgs, FrameOutcome, FrameRequest};
pub use message::{AnimationMessage, Geometry, HandlerCommand, HandlerPayload, MalformedPayload};
pub use runtime::{
    time_source_for_clock, BoxedTimeSource, ClockMode, FixedStepTimeSource, FixedTimeSource,
    SystemTimeSource, TimeSample, TimeSource, DEFAULT_STEP,
};
pub use state::{AnimationState, Phase};
pub use uniforms::{ShadertoyUniforms, IDLE_MOUSE};
