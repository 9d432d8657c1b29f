use crate::message::{AnimationMessage, Geometry};
use crate::runtime::TimeSample;

/// Lifecycle of a single effect handler.
///
/// ```text
///   Idle ──Start──▶ Running ◀──Start── Stopped
///                      └──────Stop──────▶┘
///   (any) ──Dispose──▶ Disposed   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Stopped,
    Disposed,
}

/// State the renderer paints from. Only ever touched under the handler lock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationState {
    pub phase: Phase,
    pub geometry: Option<Geometry>,
    /// Time of the most recently painted frame.
    pub time: TimeSample,
    pub frames_painted: u64,
    /// Compile error reported by the loader for the installed program.
    pub error_text: Option<String>,
}

impl AnimationState {
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    pub(crate) fn apply(&mut self, pending: Pending) {
        if self.is_disposed() {
            return;
        }
        if let Some(geometry) = pending.geometry {
            self.geometry = Some(geometry);
        }
        match pending.run {
            Some(RunCommand::Start) => {
                if matches!(self.phase, Phase::Idle | Phase::Stopped) {
                    self.phase = Phase::Running;
                }
            }
            Some(RunCommand::Stop { after_start }) => {
                if self.phase == Phase::Running || after_start {
                    self.phase = Phase::Stopped;
                }
            }
            None => {}
        }
    }

    pub(crate) fn dispose(&mut self) {
        self.phase = Phase::Disposed;
        self.geometry = None;
        self.error_text = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunCommand {
    Start,
    /// `after_start` records that a Start was folded away by this Stop, so
    /// the effect still ends up Stopped even if it was Idle.
    Stop { after_start: bool },
}

/// Everything published since the renderer last looked.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Pending {
    pub geometry: Option<Geometry>,
    pub run: Option<RunCommand>,
}

/// Single-slot mailbox between the owner and the renderer.
///
/// Geometry is latest-wins. Run commands are folded in publish order so a
/// Stop is never lost behind an Update and a Start after a Stop still
/// restarts playback. Dispose never goes through here.
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    pending: Pending,
}

impl Mailbox {
    pub fn post(&mut self, message: AnimationMessage) {
        match message {
            AnimationMessage::Start(geometry) => {
                self.pending.geometry = Some(geometry);
                self.pending.run = Some(RunCommand::Start);
            }
            AnimationMessage::Update(geometry) => {
                self.pending.geometry = Some(geometry);
            }
            AnimationMessage::Stop => {
                let after_start = matches!(
                    self.pending.run,
                    Some(RunCommand::Start) | Some(RunCommand::Stop { after_start: true })
                );
                self.pending.run = Some(RunCommand::Stop { after_start });
            }
            AnimationMessage::Dispose => {}
        }
    }

    pub fn take(&mut self) -> Pending {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending = Pending::default();
    }

    pub fn is_empty(&self) -> bool {
        self.pending == Pending::default()
    }
}
