use viewport::{FitDirection, FitPolicy, Size};

/// Source size and stretch parameters carried by `Start` and `Update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub source: Size,
    pub policy: FitPolicy,
    pub direction: FitDirection,
}

impl Geometry {
    pub fn new(source: Size, policy: FitPolicy, direction: FitDirection) -> Self {
        Self {
            source,
            policy,
            direction,
        }
    }
}

/// Commands an owning control sends to its effect handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationMessage {
    /// Begin (or resume) animating with the given geometry.
    Start(Geometry),
    /// Replace the geometry without touching playback.
    Update(Geometry),
    /// Stop scheduling frames; an in-flight paint finishes normally.
    Stop,
    /// Release everything. Nothing published afterwards has any effect.
    Dispose,
}

impl AnimationMessage {
    pub fn command(&self) -> HandlerCommand {
        match self {
            AnimationMessage::Start(_) => HandlerCommand::Start,
            AnimationMessage::Update(_) => HandlerCommand::Update,
            AnimationMessage::Stop => HandlerCommand::Stop,
            AnimationMessage::Dispose => HandlerCommand::Dispose,
        }
    }

    pub fn geometry(&self) -> Option<Geometry> {
        match self {
            AnimationMessage::Start(geometry) | AnimationMessage::Update(geometry) => {
                Some(*geometry)
            }
            AnimationMessage::Stop | AnimationMessage::Dispose => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerCommand {
    Start,
    Update,
    Stop,
    Dispose,
}

/// Loosely typed message as a control assembles it: a command tag plus
/// whichever fields the sender had at hand.
///
/// Converting into [`AnimationMessage`] checks that the fields the command
/// needs are present. Handlers drop payloads that fail the conversion and
/// keep their previous state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandlerPayload {
    pub command: HandlerCommand,
    pub source_size: Option<Size>,
    pub stretch: Option<FitPolicy>,
    pub stretch_direction: Option<FitDirection>,
}

impl HandlerPayload {
    pub fn new(command: HandlerCommand) -> Self {
        Self {
            command,
            source_size: None,
            stretch: None,
            stretch_direction: None,
        }
    }

    pub fn with_source_size(mut self, size: Size) -> Self {
        self.source_size = Some(size);
        self
    }

    pub fn with_stretch(mut self, stretch: FitPolicy, direction: FitDirection) -> Self {
        self.stretch = Some(stretch);
        self.stretch_direction = Some(direction);
        self
    }

    fn geometry(&self) -> Result<Geometry, MalformedPayload> {
        let missing = |field| MalformedPayload {
            command: self.command,
            field,
        };
        Ok(Geometry {
            source: self.source_size.ok_or_else(|| missing("source_size"))?,
            policy: self.stretch.ok_or_else(|| missing("stretch"))?,
            direction: self
                .stretch_direction
                .ok_or_else(|| missing("stretch_direction"))?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{command:?} payload is missing `{field}`")]
pub struct MalformedPayload {
    pub command: HandlerCommand,
    pub field: &'static str,
}

impl TryFrom<HandlerPayload> for AnimationMessage {
    type Error = MalformedPayload;

    fn try_from(payload: HandlerPayload) -> Result<Self, Self::Error> {
        match payload.command {
            HandlerCommand::Start => payload.geometry().map(AnimationMessage::Start),
            HandlerCommand::Update => payload.geometry().map(AnimationMessage::Update),
            HandlerCommand::Stop => Ok(AnimationMessage::Stop),
            HandlerCommand::Dispose => Ok(AnimationMessage::Dispose),
        }
    }
}

impl From<AnimationMessage> for HandlerPayload {
    fn from(message: AnimationMessage) -> Self {
        let payload = HandlerPayload::new(message.command());
        match message.geometry() {
            Some(geometry) => payload
                .with_source_size(geometry.source)
                .with_stretch(geometry.policy, geometry.direction),
            None => payload,
        }
    }
}
