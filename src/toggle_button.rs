use crate::input::{Button, CortexState};

pub const BUTTON_LIMIT: usize = 12;

/// Edge triggered view of a momentary button.
///
/// `Pressed` fires for exactly one cycle per physical press, so callers can
/// flip a persistent mode on a single press. Acting on `Held` instead would
/// re-toggle the mode every cycle the driver keeps the button down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    NotPressed,
    /// Rising edge, reported for the first cycle the button is down
    Pressed,
    Held,
    /// Falling edge, reported for the first cycle the button is up
    Released,
    /// The button was never registered
    NotTracked,
}

#[derive(Debug)]
struct TrackedButton {
    slot: u8,
    group: u8,
    button: Button,
    previous: bool,
    current: bool,
}

impl TrackedButton {
    fn state(&self) -> ButtonState {
        match (self.previous, self.current) {
            (false, false) => ButtonState::NotPressed,
            (false, true) => ButtonState::Pressed,
            (true, true) => ButtonState::Held,
            (true, false) => ButtonState::Released,
        }
    }
}

/// Tracks (joystick, button group, button) tuples across control cycles.
///
/// `update_all` must run exactly once per cycle, before any `get` calls for
/// that cycle, or the edges it reports are skewed by a cycle.
#[derive(Debug, Default)]
pub struct ToggleButtonRegistry {
    buttons: Vec<TrackedButton>,
}

impl ToggleButtonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a button. A no-op when the registry is full.
    pub fn register(&mut self, slot: u8, group: u8, button: Button) {
        if self.buttons.len() < BUTTON_LIMIT {
            self.buttons.push(TrackedButton {
                slot,
                group,
                button,
                previous: false,
                current: false,
            });
        }
    }

    /// Shifts every tracked button one cycle and re-polls it from the
    /// snapshot.
    pub fn update_all(&mut self, input: &CortexState) {
        for tracked in self.buttons.iter_mut() {
            tracked.previous = tracked.current;
            tracked.current = input.button(tracked.slot, tracked.group, tracked.button);
        }
    }

    /// Forgets all press history, keeping registrations. Every tracked
    /// button reads `NotPressed` until the next `update_all`.
    pub fn reset(&mut self) {
        for tracked in self.buttons.iter_mut() {
            tracked.previous = false;
            tracked.current = false;
        }
    }

    pub fn get(&self, slot: u8, group: u8, button: Button) -> ButtonState {
        self.buttons
            .iter()
            .find(|tracked| {
                tracked.slot == slot && tracked.group == group && tracked.button == button
            })
            .map(TrackedButton::state)
            .unwrap_or(ButtonState::NotTracked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonGroup;

    fn snapshot(down: bool) -> CortexState {
        let mut state = CortexState::default();
        state.joysticks[0].button_groups[3] = ButtonGroup {
            down,
            ..Default::default()
        };
        state
    }

    #[test]
    fn press_cycle_walks_through_all_states() {
        let mut registry = ToggleButtonRegistry::new();
        registry.register(1, 8, Button::Down);

        let expected = [
            (false, ButtonState::NotPressed),
            (true, ButtonState::Pressed),
            (true, ButtonState::Held),
            (false, ButtonState::Released),
        ];
        for (raw, state) in expected {
            registry.update_all(&snapshot(raw));
            assert_eq!(registry.get(1, 8, Button::Down), state);
        }
    }

    #[test]
    fn unregistered_button_is_not_tracked() {
        let registry = ToggleButtonRegistry::new();
        assert_eq!(registry.get(1, 8, Button::Up), ButtonState::NotTracked);
    }

    #[test]
    fn registration_stops_at_the_limit() {
        let mut registry = ToggleButtonRegistry::new();
        for group in 0..BUTTON_LIMIT as u8 {
            registry.register(1, group, Button::Up);
        }
        registry.register(2, 5, Button::Down);
        assert_eq!(registry.get(2, 5, Button::Down), ButtonState::NotTracked);
    }

    #[test]
    fn reset_forgets_press_history() {
        let mut registry = ToggleButtonRegistry::new();
        registry.register(1, 8, Button::Down);
        registry.update_all(&snapshot(true));
        registry.update_all(&snapshot(true));
        assert_eq!(registry.get(1, 8, Button::Down), ButtonState::Held);
        registry.reset();
        assert_eq!(registry.get(1, 8, Button::Down), ButtonState::NotPressed);
    }

    #[test]
    fn pressed_does_not_repeat_while_held() {
        let mut registry = ToggleButtonRegistry::new();
        registry.register(1, 8, Button::Down);
        registry.update_all(&snapshot(true));
        assert_eq!(registry.get(1, 8, Button::Down), ButtonState::Pressed);
        for _ in 0..5 {
            registry.update_all(&snapshot(true));
            assert_eq!(registry.get(1, 8, Button::Down), ButtonState::Held);
        }
    }
}
