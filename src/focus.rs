//! Pointer focus: hover on pointer devices, tap-toggle on touch devices.

/// How the user points at things.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Modality {
    /// Mouse or pen: focus follows enter/leave.
    #[default]
    Hover,
    /// Touch screen: each tap toggles focus.
    Touch,
}

/// Raw pointer input on a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerInput {
    Enter,
    Leave,
    Tap,
}

/// Abstract focus transition handed to widgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusChange {
    Begin,
    End,
}

/// Per-target focus state machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct FocusTracker {
    modality: Modality,
    focused: bool,
}

impl FocusTracker {
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            focused: false,
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Translate `input` into a focus transition, if it causes one.
    pub fn feed(&mut self, input: PointerInput) -> Option<FocusChange> {
        let next = match (self.modality, input) {
            (Modality::Hover, PointerInput::Enter) => true,
            (Modality::Hover, PointerInput::Leave) => false,
            (Modality::Touch, PointerInput::Tap) => !self.focused,
            // Emulated mouse events on touch screens and clicks on hover
            // devices do not move focus.
            _ => return None,
        };
        if next == self.focused {
            return None;
        }
        self.focused = next;
        Some(if next {
            FocusChange::Begin
        } else {
            FocusChange::End
        })
    }

    /// Drop focus without emitting a transition.
    pub fn reset(&mut self) {
        self.focused = false;
    }
}
