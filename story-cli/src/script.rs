//! JSON scripts replayed against the editor and the player

use serde::Deserialize;
use std::time::Duration;
use story_core::{OverlayId, Point, Privacy, StylePatch, Vector};
use story_editor::{StoryDraft, TapOutcome};
use story_player::{Clock, PlaybackController, PlaybackState, Transition};
use tracing::warn;

/// Timer resolution used when simulating waits during playback
const TICK: Duration = Duration::from_millis(50);

/// One editor input event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditStep {
    Tap { x: f32, y: f32 },
    Add { x: f32, y: f32 },
    Select { overlay: OverlayId },
    Deselect,
    Begin {
        #[serde(default)]
        overlay: Option<OverlayId>,
        touches: Vec<Point>,
    },
    Move {
        #[serde(default)]
        touches: Vec<Point>,
        #[serde(default)]
        dx: f32,
        #[serde(default)]
        dy: f32,
    },
    End,
    Text { value: String },
    Style { patch: StylePatch },
    DefaultStyle { patch: StylePatch },
    Size { value: f32 },
    Delete,
    TrimStart { secs: f64 },
    TrimEnd { secs: f64 },
    Privacy { value: Privacy },
}

/// Replays `steps` against `draft`.
///
/// Validation failures are reported and skipped, the same way the editor
/// shows an inline message and keeps the edit state.
pub fn run_edit_script(draft: &mut StoryDraft, steps: &[EditStep]) {
    let mut gesture: Option<OverlayId> = None;

    for (i, step) in steps.iter().enumerate() {
        match step {
            EditStep::Tap { x, y } => {
                match draft.editor_mut().handle_canvas_tap(Point::new(*x, *y)) {
                    TapOutcome::Deselected => println!("  [{i}] tap: selection cleared"),
                    TapOutcome::Selected(id) => println!("  [{i}] tap: selected overlay {id}"),
                    TapOutcome::Created(id) => println!("  [{i}] tap: created overlay {id}"),
                }
            }
            EditStep::Add { x, y } => {
                let id = draft.editor_mut().add_overlay(Point::new(*x, *y));
                println!("  [{i}] add: created overlay {id}");
            }
            EditStep::Select { overlay } => {
                if !draft.editor_mut().select(*overlay) {
                    warn!(step = i, overlay = %overlay, "no such overlay");
                }
            }
            EditStep::Deselect => draft.editor_mut().deselect(),
            EditStep::Begin { overlay, touches } => {
                let target = overlay.or(draft.editor().selected());
                match target {
                    Some(id) if draft.editor_mut().begin_transform(id, touches) => {
                        gesture = Some(id);
                    }
                    _ => warn!(step = i, "gesture started on no overlay"),
                }
            }
            EditStep::Move { touches, dx, dy } => {
                if let Some(id) = gesture {
                    let applied =
                        draft
                            .editor_mut()
                            .update_transform(id, touches, Vector::new(*dx, *dy));
                    println!("  [{i}] move {id}: {applied:?}");
                }
            }
            EditStep::End => {
                if let Some(id) = gesture.take() {
                    draft.editor_mut().end_transform(id);
                }
            }
            EditStep::Text { value } => match draft.editor_mut().set_text_of_selected(value) {
                Ok(true) => {}
                Ok(false) => warn!(step = i, "text edit with nothing selected"),
                Err(err) => println!("  [{i}] text rejected: {err}"),
            },
            EditStep::Style { patch } => {
                if !draft.editor_mut().update_style_of_selected(patch) {
                    warn!(step = i, "style edit with nothing selected");
                }
            }
            EditStep::DefaultStyle { patch } => draft.editor_mut().update_default_style(patch),
            EditStep::Size { value } => {
                if !draft.editor_mut().set_base_size_of_selected(*value) {
                    warn!(step = i, "size edit with nothing selected");
                }
            }
            EditStep::Delete => {
                if let Some(removed) = draft.editor_mut().delete_selected() {
                    println!("  [{i}] deleted overlay {}", removed.id());
                }
            }
            EditStep::TrimStart { secs } => match draft.trim_mut() {
                Some(trim) => trim.set_start(*secs),
                None => warn!(step = i, "trim on a story without video"),
            },
            EditStep::TrimEnd { secs } => match draft.trim_mut() {
                Some(trim) => trim.set_end(*secs),
                None => warn!(step = i, "trim on a story without video"),
            },
            EditStep::Privacy { value } => draft.set_privacy(*value),
        }
    }
}

/// One viewer input event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlayStep {
    /// Lets time pass, ticking the timer along the way
    Wait { ms: u64 },
    Tap { x: f32 },
    Next,
    Previous,
    Hold,
    Release,
    Close,
}

/// Replays `steps` against `controller`, advancing `clock` on waits.
/// Calls `after_step` with the step index once each step is applied.
pub fn run_play_script<C, F>(
    controller: &mut PlaybackController<C>,
    clock: &story_player::ManualClock,
    steps: &[PlayStep],
    screen_width: f32,
    mut after_step: F,
) where
    C: Clock,
    F: FnMut(usize, &PlaybackController<C>),
{
    for (i, step) in steps.iter().enumerate() {
        if controller.is_exited() {
            break;
        }

        let transition = match step {
            PlayStep::Wait { ms } => wait(controller, clock, Duration::from_millis(*ms)),
            PlayStep::Tap { x } => controller.tap(*x, screen_width),
            PlayStep::Next => controller.next(),
            PlayStep::Previous => controller.previous(),
            PlayStep::Hold => {
                controller.hold();
                Transition::None
            }
            PlayStep::Release => {
                controller.release();
                Transition::None
            }
            PlayStep::Close => controller.close(),
        };

        if transition != Transition::None {
            println!("  [{i}] {step:?} -> {transition:?}");
        }
        after_step(i, controller);
    }
}

/// Plays until every item has completed on its own. Stops early if the
/// session is paused, since nothing would advance it.
pub fn play_to_end<C: Clock>(
    controller: &mut PlaybackController<C>,
    clock: &story_player::ManualClock,
) {
    while controller.state() == PlaybackState::Playing {
        let transition = wait(controller, clock, TICK);
        if transition != Transition::None {
            println!("  {transition:?}");
        }
    }
}

fn wait<C: Clock>(
    controller: &mut PlaybackController<C>,
    clock: &story_player::ManualClock,
    total: Duration,
) -> Transition {
    let mut last = Transition::None;
    let mut waited = Duration::ZERO;
    while waited < total && !controller.is_exited() {
        let step = TICK.min(total - waited);
        clock.advance(step);
        waited += step;
        let transition = controller.tick();
        if transition != Transition::None {
            last = transition;
        }
    }
    last
}
