use std::sync::Arc;

use multiconfig::ResolvedEffect;
use renderer::{AnimationMessage, EffectHandler, Geometry};
use tracing::debug;
use viewport::{is_renderable, FitDirection, FitPolicy, Size};

/// Owner side of an animated effect: the control that sits in the layout,
/// knows its bounds and stretch settings, and drives its handler purely by
/// publishing messages.
pub struct EffectControl {
    name: String,
    shader_size: Size,
    fill_canvas: bool,
    stretch: FitPolicy,
    direction: FitDirection,
    bounds: Size,
    handler: Option<Arc<EffectHandler>>,
}

impl EffectControl {
    pub fn new(effect: &ResolvedEffect) -> Self {
        Self {
            name: effect.name.clone(),
            shader_size: effect.shader_size,
            fill_canvas: effect.fill_canvas,
            stretch: effect.stretch,
            direction: effect.stretch_direction,
            bounds: effect.bounds.to_size(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn is_attached(&self) -> bool {
        self.handler.is_some()
    }

    /// Size the effect renders at: the control's own bounds in fill-canvas
    /// mode (when they are usable), otherwise the configured shader size.
    pub fn effective_source_size(&self) -> Size {
        if self.fill_canvas && is_renderable(self.bounds) {
            self.bounds
        } else {
            self.shader_size
        }
    }

    fn geometry(&self) -> Geometry {
        Geometry::new(self.effective_source_size(), self.stretch, self.direction)
    }

    fn publish(&self, message: AnimationMessage) {
        if let Some(handler) = &self.handler {
            handler.publish(message);
        }
    }

    /// Entering the visual tree: push the current geometry, then start.
    pub fn attach(&mut self, handler: Arc<EffectHandler>) {
        debug!(control = %self.name, "attaching effect control");
        self.handler = Some(handler);
        let geometry = self.geometry();
        self.publish(AnimationMessage::Update(geometry));
        self.publish(AnimationMessage::Start(geometry));
    }

    /// Layout pass with new bounds.
    pub fn resize(&mut self, bounds: Size) {
        self.bounds = bounds;
        self.publish(AnimationMessage::Update(self.geometry()));
    }

    pub fn set_stretch(&mut self, stretch: FitPolicy, direction: FitDirection) {
        self.stretch = stretch;
        self.direction = direction;
        self.publish(AnimationMessage::Update(self.geometry()));
    }

    pub fn start(&self) {
        self.publish(AnimationMessage::Start(self.geometry()));
    }

    pub fn stop(&self) {
        self.publish(AnimationMessage::Stop);
    }

    /// Leaving the visual tree: stop, dispose, and let go of the handler.
    pub fn detach(&mut self) -> Option<Arc<EffectHandler>> {
        let handler = self.handler.take()?;
        debug!(control = %self.name, "detaching effect control");
        handler.publish(AnimationMessage::Stop);
        handler.publish(AnimationMessage::Dispose);
        Some(handler)
    }
}
