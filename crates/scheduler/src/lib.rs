//! Display-refresh scheduler for effect handlers.
//!
//! Handlers ask for "one more frame" through a [`FrameRequester`]. The host
//! drives [`FrameScheduler::tick`] at its refresh rate and gets back the
//! targets due for an `apply_and_render` call, each at most once per tick.

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace};

/// Slack allowed when comparing the pacing accumulator with the interval, so
/// a refresh that lands a hair early still counts.
const PACING_SLACK: Duration = Duration::from_micros(250);

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("target '{0}' is already registered")]
    DuplicateTarget(TargetId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        TargetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerSettings {
    /// Frame cap; `None` renders on every refresh.
    pub fps: Option<f32>,
}

impl SchedulerSettings {
    pub fn with_fps(fps: Option<f32>) -> Self {
        Self {
            fps: normalize_fps(fps),
        }
    }
}

/// Rates whose frame interval cannot be represented count as uncapped.
fn normalize_fps(value: Option<f32>) -> Option<f32> {
    value.filter(|fps| frame_interval(*fps).is_some())
}

fn frame_interval(fps: f32) -> Option<Duration> {
    if fps > 0.0 {
        Duration::try_from_secs_f32(1.0 / fps).ok()
    } else {
        None
    }
}

/// Cloneable handle a handler uses to ask for another frame.
#[derive(Debug, Clone)]
pub struct FrameRequester {
    target: TargetId,
    sender: Sender<TargetId>,
}

impl FrameRequester {
    pub fn target(&self) -> &TargetId {
        &self.target
    }

    /// Never blocks. Requests sent after the scheduler is gone are dropped.
    pub fn request_frame(&self) {
        if self.sender.send(self.target.clone()).is_err() {
            trace!(target_id = %self.target, "scheduler gone; frame request dropped");
        }
    }
}

pub struct FrameScheduler {
    sender: Sender<TargetId>,
    receiver: Receiver<TargetId>,
    targets: Vec<TargetId>,
    pending: HashSet<TargetId>,
    pacer: FramePacer,
}

impl FrameScheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            targets: Vec::new(),
            pending: HashSet::new(),
            pacer: FramePacer::new(normalize_fps(settings.fps)),
        }
    }

    pub fn register(&mut self, target: TargetId) -> Result<FrameRequester, SchedulerError> {
        if self.targets.contains(&target) {
            return Err(SchedulerError::DuplicateTarget(target));
        }
        debug!(target_id = %target, "registered frame target");
        self.targets.push(target.clone());
        Ok(FrameRequester {
            target,
            sender: self.sender.clone(),
        })
    }

    /// Forgets a target; requests it already sent are discarded.
    pub fn unregister(&mut self, target: &TargetId) -> bool {
        self.drain_requests();
        self.pending.remove(target);
        let before = self.targets.len();
        self.targets.retain(|existing| existing != target);
        let removed = self.targets.len() != before;
        if removed {
            debug!(target_id = %target, "unregistered frame target");
        }
        removed
    }

    pub fn is_registered(&self, target: &TargetId) -> bool {
        self.targets.contains(target)
    }

    /// Targets due for a frame at `now`, in registration order.
    ///
    /// Any number of requests since the previous tick yields a single entry.
    /// When the frame cap says it is too early, requests stay pending.
    pub fn tick(&mut self, now: Instant) -> Vec<TargetId> {
        self.drain_requests();
        if self.pending.is_empty() {
            return Vec::new();
        }
        if !self.pacer.should_render(now) {
            trace!(pending = self.pending.len(), "frame deferred by pacer");
            return Vec::new();
        }

        let due: Vec<TargetId> = self
            .targets
            .iter()
            .filter(|target| self.pending.contains(*target))
            .cloned()
            .collect();
        self.pending.clear();
        due
    }

    /// Distinct targets currently waiting for a frame.
    pub fn pending_count(&mut self) -> usize {
        self.drain_requests();
        self.pending.len()
    }

    fn drain_requests(&mut self) {
        for target in self.receiver.try_iter() {
            if self.targets.contains(&target) {
                self.pending.insert(target);
            } else {
                trace!(target_id = %target, "dropping request for unregistered target");
            }
        }
    }
}

struct FramePacer {
    target_interval: Option<Duration>,
    accumulator: Duration,
    last_tick: Option<Instant>,
}

impl FramePacer {
    fn new(target_fps: Option<f32>) -> Self {
        let target_interval = target_fps.and_then(frame_interval);
        Self {
            target_interval,
            accumulator: Duration::ZERO,
            last_tick: None,
        }
    }

    fn should_render(&mut self, now: Instant) -> bool {
        let last = self.last_tick.replace(now);
        match (self.target_interval, last) {
            (Some(interval), Some(last)) => {
                let delta = now.saturating_duration_since(last);
                // Idle stretches must not bank a burst of frames.
                let cap = interval.saturating_mul(2);
                self.accumulator = self.accumulator.saturating_add(delta).min(cap);
                if self.accumulator.saturating_add(PACING_SLACK) < interval {
                    false
                } else {
                    self.accumulator = self.accumulator.saturating_sub(interval);
                    true
                }
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncapped() -> FrameScheduler {
        FrameScheduler::new(SchedulerSettings::default())
    }

    #[test]
    fn repeated_requests_collapse_into_one() {
        let mut scheduler = uncapped();
        let target = TargetId::new("effect:a");
        let requester = scheduler.register(target.clone()).unwrap();
        requester.request_frame();
        requester.request_frame();
        requester.clone().request_frame();
        assert_eq!(scheduler.pending_count(), 1);

        let now = Instant::now();
        assert_eq!(scheduler.tick(now), vec![target]);
        assert!(scheduler.tick(now + Duration::from_millis(16)).is_empty());
    }

    #[test]
    fn due_targets_follow_registration_order() {
        let mut scheduler = uncapped();
        let first = scheduler.register(TargetId::new("first")).unwrap();
        let second = scheduler.register(TargetId::new("second")).unwrap();
        second.request_frame();
        first.request_frame();
        assert_eq!(
            scheduler.tick(Instant::now()),
            vec![TargetId::new("first"), TargetId::new("second")]
        );
    }

    #[test]
    fn unregistered_targets_are_dropped() {
        let mut scheduler = uncapped();
        let target = TargetId::new("gone");
        let requester = scheduler.register(target.clone()).unwrap();
        requester.request_frame();
        assert!(scheduler.unregister(&target));
        requester.request_frame();
        assert!(scheduler.tick(Instant::now()).is_empty());
        assert!(!scheduler.unregister(&target));
        assert!(!scheduler.is_registered(&target));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut scheduler = uncapped();
        scheduler.register(TargetId::new("twice")).unwrap();
        let err = scheduler.register(TargetId::new("twice")).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateTarget(id) if id.as_str() == "twice"));
    }

    #[test]
    fn pacer_defers_but_keeps_requests() {
        let mut scheduler = FrameScheduler::new(SchedulerSettings::with_fps(Some(30.0)));
        let target = TargetId::new("capped");
        let requester = scheduler.register(target.clone()).unwrap();
        let start = Instant::now();

        requester.request_frame();
        assert_eq!(scheduler.tick(start), vec![target.clone()]);

        requester.request_frame();
        assert!(scheduler.tick(start + Duration::from_millis(16)).is_empty());
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(
            scheduler.tick(start + Duration::from_millis(34)),
            vec![target]
        );
    }

    #[test]
    fn zero_fps_is_uncapped() {
        assert_eq!(SchedulerSettings::with_fps(Some(0.0)).fps, None);
        let mut scheduler = FrameScheduler::new(SchedulerSettings { fps: Some(0.0) });
        let requester = scheduler.register(TargetId::new("free")).unwrap();
        let start = Instant::now();
        for step in 0..5 {
            requester.request_frame();
            let now = start + Duration::from_millis(step);
            assert_eq!(scheduler.tick(now).len(), 1);
        }
    }

    #[test]
    fn unrepresentable_rates_are_uncapped() {
        assert_eq!(SchedulerSettings::with_fps(Some(1e-30)).fps, None);
        assert_eq!(SchedulerSettings::with_fps(Some(f32::NAN)).fps, None);

        let mut scheduler = FrameScheduler::new(SchedulerSettings { fps: Some(1e-30) });
        let requester = scheduler.register(TargetId::new("slow")).unwrap();
        let start = Instant::now();
        requester.request_frame();
        assert_eq!(scheduler.tick(start).len(), 1);
        requester.request_frame();
        assert_eq!(scheduler.tick(start + Duration::from_millis(1)).len(), 1);

        // Representable, but close to `Duration::MAX`.
        let mut scheduler = FrameScheduler::new(SchedulerSettings::with_fps(Some(1e-19)));
        let requester = scheduler.register(TargetId::new("glacial")).unwrap();
        requester.request_frame();
        assert_eq!(scheduler.tick(start).len(), 1);
        requester.request_frame();
        assert!(scheduler.tick(start + Duration::from_secs(3600)).is_empty());
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn requests_after_scheduler_drop_are_ignored() {
        let mut scheduler = uncapped();
        let requester = scheduler.register(TargetId::new("orphan")).unwrap();
        drop(scheduler);
        requester.request_frame();
        assert_eq!(requester.target().as_str(), "orphan");
    }

    #[test]
    fn requesters_work_across_threads() {
        let mut scheduler = uncapped();
        let requester = scheduler.register(TargetId::new("threaded")).unwrap();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let requester = requester.clone();
                scope.spawn(move || requester.request_frame());
            }
        });
        assert_eq!(scheduler.tick(Instant::now()).len(), 1);
    }
}
