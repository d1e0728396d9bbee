//! Drag-to-reorder controller for the section list.
//!
//! Reordering happens live: crossing another section while dragging splices
//! the dragged section into that position immediately, so the preview follows
//! the gesture. The controller only tracks gesture state; the list itself
//! lives in the [`EditorSession`].

use crate::editor::EditorSession;

/// Feedback moments a host can map to device vibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPulse {
    Lift,
    Reorder,
    Drop,
}

type HapticHook = Box<dyn FnMut(HapticPulse)>;

#[derive(Default)]
pub struct DragController {
    dragging: Option<u64>,
    haptics: Option<HapticHook>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a haptic feedback callback.
    pub fn with_haptics(mut self, hook: HapticHook) -> Self {
        self.haptics = Some(hook);
        self
    }

    pub fn dragging(&self) -> Option<u64> {
        self.dragging
    }

    fn pulse(&mut self, pulse: HapticPulse) {
        if let Some(hook) = &mut self.haptics {
            hook(pulse);
        }
    }

    pub fn drag_start(&mut self, instance_id: u64) {
        self.dragging = Some(instance_id);
        self.pulse(HapticPulse::Lift);
    }

    /// The pointer crossed `target_id`. Reorders live when it differs from the
    /// dragged section. Returns true when the list changed.
    pub fn drag_over(&mut self, session: &mut EditorSession, target_id: u64) -> bool {
        let Some(dragged) = self.dragging else {
            return false;
        };
        if dragged == target_id {
            return false;
        }
        let before = session.revision();
        session.reorder(dragged, target_id);
        let moved = session.revision() != before;
        if moved {
            self.pulse(HapticPulse::Reorder);
        }
        moved
    }

    /// Gesture finished (drop or cancel). The list already reflects the last
    /// crossing; only the gesture state resets.
    pub fn drag_end(&mut self) {
        if self.dragging.take().is_some() {
            self.pulse(HapticPulse::Drop);
        }
    }
}
