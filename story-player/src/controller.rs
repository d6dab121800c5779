//! Playback/progress controller
//!
//! Drives a timed, auto-advancing sequence of one author's story items.
//! Natural completion, taps and the close action all go through the same
//! advance/rewind/exit primitives, each applied within a single call, so a
//! completion tick and a tap can never leave the index inconsistent.

use crate::clock::Clock;
use crate::progress::Progress;
use story_core::{Policy, StoryItem};
use tracing::{debug, info};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Exited,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Advanced past the last item
    Completed,
    /// Went back from the first item
    RewoundPastStart,
    /// Explicit close action
    Closed,
    /// Nothing to play, or the starting point was out of range
    Empty,
}

/// Outcome of one controller call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Moved { from: usize, to: usize },
    Exited(ExitReason),
}

/// Receives navigation side effects so the surrounding screen can load the
/// content of the new current item
pub trait PlaybackObserver {
    fn on_index_changed(&mut self, index: usize, item: &StoryItem);

    fn on_exit(&mut self, _reason: ExitReason) {}
}

/// Timed playback over an ordered sequence of story items
pub struct PlaybackController<C: Clock> {
    items: Vec<StoryItem>,
    index: usize,
    state: PlaybackState,
    progress: Progress,
    clock: C,
    observer: Option<Box<dyn PlaybackObserver>>,
}

impl<C: Clock> PlaybackController<C> {
    /// Opens a session at the first item
    pub fn new(items: Vec<StoryItem>, policy: &Policy, clock: C) -> Self {
        Self::open(items, 0, policy, clock)
    }

    /// Opens a session at `start`.
    ///
    /// An empty sequence or an out-of-range start fails closed: the session
    /// is exited immediately and no progress ever runs.
    pub fn open(items: Vec<StoryItem>, start: usize, policy: &Policy, clock: C) -> Self {
        let mut progress = Progress::new(policy.item_duration());
        let state = if start < items.len() {
            progress.restart(clock.now());
            info!(items = items.len(), start, "playback session started");
            PlaybackState::Playing
        } else {
            info!(items = items.len(), start, "nothing to play, session closed");
            PlaybackState::Exited
        };

        Self {
            items,
            index: start,
            state,
            progress,
            clock,
            observer: None,
        }
    }

    /// Attaches an observer and tells it about the current item
    pub fn with_observer(mut self, observer: impl PlaybackObserver + 'static) -> Self {
        let mut observer: Box<dyn PlaybackObserver> = Box::new(observer);
        match self.current_item() {
            Some(item) => observer.on_index_changed(self.index, item),
            None => observer.on_exit(ExitReason::Empty),
        }
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_exited(&self) -> bool {
        self.state == PlaybackState::Exited
    }

    /// Index of the item on screen, `None` once the session has exited
    pub fn current_index(&self) -> Option<usize> {
        if self.is_exited() {
            return None;
        }
        Some(self.index)
    }

    pub fn current_item(&self) -> Option<&StoryItem> {
        self.current_index().and_then(|i| self.items.get(i))
    }

    /// Progress of the current item in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.is_exited() {
            return 0.0;
        }
        self.progress.fraction(self.clock.now())
    }

    /// Per-item progress for a segmented indicator: items before the
    /// current one are full, items after it empty
    pub fn segments(&self) -> Vec<f64> {
        let current = self.progress();
        (0..self.items.len())
            .map(|i| match i.cmp(&self.index) {
                std::cmp::Ordering::Less => 1.0,
                std::cmp::Ordering::Equal if !self.is_exited() => current,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 0.0,
            })
            .collect()
    }

    /// Polls the clock; advances when the current item's progress completes
    pub fn tick(&mut self) -> Transition {
        if self.state != PlaybackState::Playing {
            return Transition::None;
        }
        if !self.progress.is_complete(self.clock.now()) {
            return Transition::None;
        }
        debug!(index = self.index, "item completed");
        self.next()
    }

    /// Tap at horizontal position `x`: left half goes back, right half
    /// goes forward
    pub fn tap(&mut self, x: f32, screen_width: f32) -> Transition {
        if x < screen_width / 2.0 {
            self.previous()
        } else {
            self.next()
        }
    }

    /// Moves to the next item, or exits from the last one
    pub fn next(&mut self) -> Transition {
        if self.is_exited() {
            return Transition::None;
        }
        if self.index + 1 < self.items.len() {
            self.move_to(self.index + 1)
        } else {
            self.exit(ExitReason::Completed)
        }
    }

    /// Jumps to the previous item, or exits from the first one
    pub fn previous(&mut self) -> Transition {
        if self.is_exited() {
            return Transition::None;
        }
        if self.index > 0 {
            self.move_to(self.index - 1)
        } else {
            self.exit(ExitReason::RewoundPastStart)
        }
    }

    /// Long-press start: freezes progress in place
    pub fn hold(&mut self) {
        if self.state == PlaybackState::Playing {
            self.progress.freeze(self.clock.now());
            self.state = PlaybackState::Paused;
            debug!(index = self.index, "playback paused");
        }
    }

    /// Long-press release: resumes from the frozen value
    pub fn release(&mut self) {
        if self.state == PlaybackState::Paused {
            self.progress.resume(self.clock.now());
            self.state = PlaybackState::Playing;
            debug!(index = self.index, "playback resumed");
        }
    }

    /// Explicit close, from any state
    pub fn close(&mut self) -> Transition {
        if self.is_exited() {
            return Transition::None;
        }
        self.exit(ExitReason::Closed)
    }

    fn move_to(&mut self, to: usize) -> Transition {
        let from = self.index;
        self.index = to;
        self.progress.restart(self.clock.now());
        self.state = PlaybackState::Playing;
        debug!(from, to, "playback index changed");

        if let (Some(observer), Some(item)) = (self.observer.as_mut(), self.items.get(to)) {
            observer.on_index_changed(to, item);
        }
        Transition::Moved { from, to }
    }

    fn exit(&mut self, reason: ExitReason) -> Transition {
        self.progress.freeze(self.clock.now());
        self.state = PlaybackState::Exited;
        info!(index = self.index, ?reason, "playback session exited");

        if let Some(observer) = self.observer.as_mut() {
            observer.on_exit(reason);
        }
        Transition::Exited(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use story_core::{Color, MediaSource, Privacy, StoryId};

    fn items(n: u64) -> Vec<StoryItem> {
        (1..=n)
            .map(|id| {
                StoryItem::new(
                    StoryId(id),
                    MediaSource::Gradient {
                        from: Color::BLACK,
                        to: Color::WHITE,
                    },
                    Vec::new(),
                    format!("story {id}"),
                    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                    Duration::from_secs(5),
                    Privacy::Public,
                )
            })
            .collect()
    }

    fn session(n: u64) -> (PlaybackController<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let controller = PlaybackController::new(items(n), &Policy::default(), clock.clone());
        (controller, clock)
    }

    #[derive(Default, Clone)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl PlaybackObserver for Recorder {
        fn on_index_changed(&mut self, index: usize, item: &StoryItem) {
            self.events
                .borrow_mut()
                .push(format!("show {index} ({})", item.id()));
        }

        fn on_exit(&mut self, reason: ExitReason) {
            self.events.borrow_mut().push(format!("exit {reason:?}"));
        }
    }

    #[test]
    fn test_starts_playing_first_item() {
        let (controller, _) = session(3);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.current_index(), Some(0));
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_next_three_times_exits_three_item_session() {
        let (mut controller, _) = session(3);
        assert_eq!(controller.next(), Transition::Moved { from: 0, to: 1 });
        assert_eq!(controller.next(), Transition::Moved { from: 1, to: 2 });
        assert_eq!(
            controller.next(),
            Transition::Exited(ExitReason::Completed)
        );
        assert_eq!(controller.current_index(), None);
        assert!(controller.is_exited());
        assert_eq!(controller.next(), Transition::None);
    }

    #[test]
    fn test_previous_from_first_item_exits() {
        let (mut controller, _) = session(3);
        assert_eq!(
            controller.previous(),
            Transition::Exited(ExitReason::RewoundPastStart)
        );
        assert_eq!(controller.current_index(), None);
    }

    #[test]
    fn test_tap_halves_navigate() {
        let (mut controller, clock) = session(3);
        assert_eq!(controller.tap(300.0, 400.0), Transition::Moved { from: 0, to: 1 });

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(controller.tap(100.0, 400.0), Transition::Moved { from: 1, to: 0 });
        // Previous restarts the item rather than rewinding smoothly
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_natural_completion_advances_then_exits() {
        let (mut controller, clock) = session(2);
        clock.advance(Duration::from_millis(4_999));
        assert_eq!(controller.tick(), Transition::None);

        clock.advance(Duration::from_millis(1));
        assert_eq!(controller.tick(), Transition::Moved { from: 0, to: 1 });
        assert_eq!(controller.progress(), 0.0);

        clock.advance(Duration::from_secs(5));
        assert_eq!(
            controller.tick(),
            Transition::Exited(ExitReason::Completed)
        );
    }

    #[test]
    fn test_hold_and_release_resume_from_frozen_progress() {
        let (mut controller, clock) = session(2);
        clock.advance(Duration::from_secs(2));
        controller.hold();
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.progress(), 0.4);

        // Paused progress does not move and never completes
        clock.advance(Duration::from_secs(60));
        assert_eq!(controller.tick(), Transition::None);
        assert_eq!(controller.progress(), 0.4);

        controller.release();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.progress(), 0.4);

        clock.advance(Duration::from_secs(1));
        assert_eq!(controller.progress(), 0.6);
    }

    #[test]
    fn test_release_without_hold_changes_nothing() {
        let (mut controller, clock) = session(1);
        clock.advance(Duration::from_secs(1));
        controller.release();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.progress(), 0.2);
    }

    #[test]
    fn test_close_from_paused() {
        let (mut controller, _) = session(3);
        controller.hold();
        assert_eq!(controller.close(), Transition::Exited(ExitReason::Closed));
        assert_eq!(controller.close(), Transition::None);
        controller.release();
        assert_eq!(controller.state(), PlaybackState::Exited);
    }

    #[test]
    fn test_empty_sequence_fails_closed() {
        let clock = ManualClock::new();
        let mut controller =
            PlaybackController::new(Vec::new(), &Policy::default(), clock.clone());
        assert!(controller.is_exited());
        assert_eq!(controller.current_index(), None);

        clock.advance(Duration::from_secs(10));
        assert_eq!(controller.tick(), Transition::None);
        assert_eq!(controller.next(), Transition::None);
        assert!(controller.segments().is_empty());
    }

    #[test]
    fn test_out_of_range_start_fails_closed() {
        let controller =
            PlaybackController::open(items(2), 2, &Policy::default(), ManualClock::new());
        assert!(controller.is_exited());
    }

    #[test]
    fn test_observer_sees_every_index_change() {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let clock = ManualClock::new();
        let mut controller = PlaybackController::open(items(3), 1, &Policy::default(), clock.clone())
            .with_observer(recorder);

        controller.next();
        controller.previous();
        clock.advance(Duration::from_secs(5));
        controller.tick();
        controller.close();

        assert_eq!(
            *events.borrow(),
            vec![
                "show 1 (2)",
                "show 2 (3)",
                "show 1 (2)",
                "show 2 (3)",
                "exit Closed",
            ]
        );
    }

    #[test]
    fn test_segments_fill_up_to_current_item() {
        let (mut controller, clock) = session(3);
        controller.next();
        clock.advance(Duration::from_millis(2_500));
        assert_eq!(controller.segments(), vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_index_never_leaves_bounds() {
        let (mut controller, clock) = session(4);
        let script = [1, 1, 0, 0, 0, 1, 2, 1, 1, 1, 1, 1];
        for step in script {
            match step {
                0 => controller.previous(),
                1 => controller.next(),
                _ => {
                    clock.advance(Duration::from_secs(5));
                    controller.tick()
                }
            };
            if let Some(index) = controller.current_index() {
                assert!(index < 4);
            }
        }
        assert!(controller.is_exited());
    }
}
