use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use viewport::{fit_viewport, Size, ViewportFit};

use crate::effect::{EffectProgram, LoadedEffect};
use crate::message::{AnimationMessage, HandlerPayload};
use crate::runtime::{BoxedTimeSource, TimeSample};
use crate::state::{AnimationState, Mailbox, Phase};
use crate::uniforms::ShadertoyUniforms;

/// Asks the host to invoke the handler once more on the next display refresh.
///
/// Implementations must not block and must tolerate repeated calls between
/// refreshes; the host collapses them into a single invocation.
pub trait FrameRequest: Send + Sync {
    fn request_frame(&self);
}

impl FrameRequest for scheduler::FrameRequester {
    fn request_frame(&self) {
        scheduler::FrameRequester::request_frame(self);
    }
}

/// Everything the paint callback needs for one frame.
pub struct FrameArgs<'a> {
    /// Viewport the handler was asked to fill.
    pub viewport: Size,
    /// Fixed surface size the effect renders at (the shader's resolution).
    pub source_size: Size,
    pub fit: ViewportFit,
    pub time: TimeSample,
    pub uniforms: &'a ShadertoyUniforms,
    pub program: Option<&'a dyn EffectProgram>,
    /// Compile error from the loader, if the program failed to build.
    pub error_text: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Paint ran and another frame was requested.
    Painted,
    /// Not running; nothing painted and no frame requested.
    Idle,
    /// Running, but the geometry cannot be rendered this tick.
    Skipped,
    /// The handler is gone; nothing happens any more.
    Disposed,
}

impl FrameOutcome {
    pub fn painted(self) -> bool {
        self == FrameOutcome::Painted
    }
}

struct HandlerInner {
    state: AnimationState,
    mailbox: Mailbox,
    program: Option<Box<dyn EffectProgram>>,
    clock: BoxedTimeSource,
    uniforms: ShadertoyUniforms,
}

impl HandlerInner {
    fn dispose(&mut self, name: &str) {
        self.state.dispose();
        self.mailbox.clear();
        if let Some(mut program) = self.program.take() {
            debug!(handler = name, program = program.name(), "releasing effect program");
            program.release();
        }
        self.uniforms.reset();
    }
}

/// Per-control visual handler: owns the animation state and paints it.
///
/// Two call sites share it. The owning control publishes messages whenever
/// playback or geometry changes, and the host calls
/// [`EffectHandler::apply_and_render`] on display refresh. Both go through
/// one mutex; the paint callback runs while it is held.
pub struct EffectHandler {
    name: String,
    inner: Mutex<HandlerInner>,
    frames: Box<dyn FrameRequest>,
}

impl EffectHandler {
    pub fn new(
        name: impl Into<String>,
        clock: BoxedTimeSource,
        frames: impl FrameRequest + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(HandlerInner {
                state: AnimationState::default(),
                mailbox: Mailbox::default(),
                program: None,
                clock,
                uniforms: ShadertoyUniforms::default(),
            }),
            frames: Box::new(frames),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, HandlerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Posts a message for the renderer.
    ///
    /// Start/Update geometry overwrites anything not yet applied. Dispose is
    /// handled immediately and makes every later call a no-op.
    pub fn publish(&self, message: AnimationMessage) {
        let wants_frame = {
            let mut inner = self.lock();
            if inner.state.is_disposed() {
                trace!(handler = %self.name, ?message, "ignoring message after dispose");
                return;
            }
            match message {
                AnimationMessage::Dispose => {
                    inner.dispose(&self.name);
                    debug!(handler = %self.name, "effect handler disposed");
                    false
                }
                AnimationMessage::Start(_) | AnimationMessage::Update(_) => {
                    inner.mailbox.post(message);
                    true
                }
                AnimationMessage::Stop => {
                    inner.mailbox.post(message);
                    false
                }
            }
        };

        if wants_frame {
            self.frames.request_frame();
        }
    }

    /// Publishes a loosely typed payload. Payloads missing a field their
    /// command needs are dropped and the previous state stays in place.
    pub fn publish_payload(&self, payload: HandlerPayload) -> bool {
        match AnimationMessage::try_from(payload) {
            Ok(message) => {
                self.publish(message);
                true
            }
            Err(err) => {
                trace!(handler = %self.name, %err, "dropping malformed payload");
                false
            }
        }
    }

    /// Hands over a program built by the external loader, releasing the one
    /// it replaces. After Dispose the new program is released straight away.
    pub fn install_program(&self, loaded: LoadedEffect) {
        let LoadedEffect {
            program,
            error_text,
        } = loaded;
        let mut inner = self.lock();

        if inner.state.is_disposed() {
            if let Some(mut program) = program {
                program.release();
            }
            return;
        }

        if let Some(text) = error_text.as_deref() {
            warn!(handler = %self.name, error = text, "effect program failed to compile");
        }
        if let Some(mut previous) = inner.program.take() {
            previous.release();
        }
        inner.program = program;
        inner.state.error_text = error_text;
    }

    /// Applies whatever was published since the last tick and, if the effect
    /// is running with renderable geometry, paints it into `viewport`.
    ///
    /// Exactly one further frame is requested after a successful paint;
    /// otherwise the handler stays quiet until the next Start or Update.
    pub fn apply_and_render<F>(&self, viewport: Size, paint: F) -> FrameOutcome
    where
        F: FnOnce(&FrameArgs<'_>),
    {
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.state.is_disposed() {
                return FrameOutcome::Disposed;
            }

            let pending = inner.mailbox.take();
            inner.state.apply(pending);
            if !inner.state.is_running() {
                return FrameOutcome::Idle;
            }

            let Some(geometry) = inner.state.geometry else {
                trace!(handler = %self.name, "running without geometry; skipping frame");
                return FrameOutcome::Skipped;
            };
            let Some(fit) = fit_viewport(
                viewport,
                geometry.source,
                geometry.policy,
                geometry.direction,
            ) else {
                trace!(
                    handler = %self.name,
                    source_width = geometry.source.width,
                    source_height = geometry.source.height,
                    viewport_width = viewport.width,
                    viewport_height = viewport.height,
                    "geometry not renderable; skipping frame"
                );
                return FrameOutcome::Skipped;
            };

            let time = inner.clock.sample();
            inner.uniforms.set_resolution(geometry.source);
            inner.uniforms.update_time(time);
            inner.state.time = time;
            inner.state.frames_painted = inner.state.frames_painted.saturating_add(1);

            let args = FrameArgs {
                viewport,
                source_size: geometry.source,
                fit,
                time,
                uniforms: &inner.uniforms,
                program: inner.program.as_deref(),
                error_text: inner.state.error_text.as_deref(),
            };
            paint(&args);
        }

        self.frames.request_frame();
        FrameOutcome::Painted
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase
    }

    /// Copy of the current state, for diagnostics.
    pub fn snapshot(&self) -> AnimationState {
        self.lock().state.clone()
    }

    /// True when published messages have not been applied by a tick yet.
    pub fn has_pending(&self) -> bool {
        !self.lock().mailbox.is_empty()
    }
}

impl Drop for EffectHandler {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !inner.state.is_disposed() {
            inner.dispose(&self.name);
        }
    }
}
