//! Animation driver
//!
//! A [`Timeline`] turns elapsed time into a normalized progress value in
//! [0, 1] and feeds it to a bound update function, which typically writes
//! node local transforms. The [`AnimationScheduler`] owns registered
//! timelines and ticks them strictly sequentially, in registration order,
//! from the scene's update loop; no two timeline updates ever interleave.
//!
//! The scheduler is an explicit instance owned by whoever drives the
//! scene. There is no process-wide animation clock.

use crate::foundation::collections::{DefaultKey, HandleMap, TypedHandle};
use crate::scene::SceneGraph;

/// How a timeline behaves once it reaches the end of its duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    /// Run to the end once, hold progress at 1.0, then unregister
    Once,

    /// Wrap progress back to 0.0 and keep going
    Loop,

    /// Rise 0→1 over the first half of the duration, fall 1→0 over the
    /// second half, indefinitely
    ReverseLoop,
}

/// Bound update function receiving normalized progress
pub type ApplyFn = Box<dyn FnMut(&mut SceneGraph, f32)>;

/// A single animation timeline
pub struct Timeline {
    duration: f32,
    repeat: RepeatMode,
    elapsed: f32,
    apply: ApplyFn,
}

impl Timeline {
    /// Create a timeline of `duration` seconds
    ///
    /// # Panics
    /// Panics if `duration` is not strictly positive.
    pub fn new(
        duration: f32,
        repeat: RepeatMode,
        apply: impl FnMut(&mut SceneGraph, f32) + 'static,
    ) -> Self {
        assert!(duration > 0.0, "timeline duration must be positive");
        Self {
            duration,
            repeat,
            elapsed: 0.0,
            apply: Box::new(apply),
        }
    }

    /// Normalized progress in [0, 1] for the current elapsed time
    pub fn progress(&self) -> f32 {
        match self.repeat {
            RepeatMode::Once => (self.elapsed / self.duration).clamp(0.0, 1.0),
            RepeatMode::Loop => self.elapsed.rem_euclid(self.duration) / self.duration,
            RepeatMode::ReverseLoop => {
                let phase = self.elapsed.rem_euclid(self.duration) / self.duration;
                if phase <= 0.5 {
                    2.0 * phase
                } else {
                    2.0 * (1.0 - phase)
                }
            }
        }
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    fn finished(&self) -> bool {
        self.repeat == RepeatMode::Once && self.elapsed >= self.duration
    }
}

/// Identifier of a registered timeline
pub type TimelineId = TypedHandle<Timeline>;

/// Schedules registered timelines against a single clock
#[derive(Default)]
pub struct AnimationScheduler {
    timelines: HandleMap<Timeline>,
    order: Vec<DefaultKey>,
}

impl AnimationScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timeline; it ticks after all previously registered ones
    pub fn register(&mut self, timeline: Timeline) -> TimelineId {
        let key = self.timelines.insert(timeline);
        self.order.push(key);
        TimelineId::new(key)
    }

    /// Remove a timeline; returns whether it was registered
    pub fn unregister(&mut self, id: TimelineId) -> bool {
        if self.timelines.remove(id.key()).is_some() {
            self.order.retain(|&key| key != id.key());
            true
        } else {
            false
        }
    }

    /// Number of registered timelines
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no timelines are registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Advance every timeline by `dt` seconds and run its update function
    ///
    /// Timelines run one after another in registration order; a finished
    /// `Once` timeline is unregistered after its final update.
    pub fn tick(&mut self, dt: f32, graph: &mut SceneGraph) {
        let mut finished = Vec::new();
        for &key in &self.order {
            if let Some(timeline) = self.timelines.get_mut(key) {
                timeline.advance(dt);
                let progress = timeline.progress();
                (timeline.apply)(graph, progress);
                if timeline.finished() {
                    finished.push(key);
                }
            }
        }
        for key in finished {
            log::debug!("timeline {key:?} finished");
            self.timelines.remove(key);
            self.order.retain(|&k| k != key);
        }
    }
}
