#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        pointer: (f32, f32),
        scroll: (f32, f32),
    },
}

/// Turns pointer drags into scroll offsets. No inertia after release.
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    gain: f32,
}

impl DragController {
    pub const DEFAULT_GAIN: f32 = 2.0;

    pub fn new(gain: f32) -> Self {
        Self {
            state: DragState::Idle,
            gain,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn press(&mut self, pointer: (f32, f32), scroll: (f32, f32)) {
        self.state = DragState::Dragging { pointer, scroll };
    }

    /// New scroll offsets for a pointer move, or `None` when not dragging.
    pub fn track(&self, pointer: (f32, f32)) -> Option<(f32, f32)> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging {
                pointer: origin,
                scroll,
            } => Some((
                scroll.0 - (pointer.0 - origin.0) * self.gain,
                scroll.1 - (pointer.1 - origin.1) * self.gain,
            )),
        }
    }

    pub fn release(&mut self) {
        self.state = DragState::Idle;
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_are_ignored_while_idle() {
        let drag = DragController::default();
        assert_eq!(drag.track((10.0, 10.0)), None);
    }

    #[test]
    fn drag_applies_gain_against_pointer_direction() {
        let mut drag = DragController::default();
        drag.press((100.0, 100.0), (50.0, 400.0));
        assert!(drag.is_dragging());

        assert_eq!(drag.track((90.0, 70.0)), Some((70.0, 460.0)));
        // Offsets are relative to the press, not to the previous move.
        assert_eq!(drag.track((100.0, 100.0)), Some((50.0, 400.0)));

        drag.release();
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(drag.track((0.0, 0.0)), None);
    }
}
