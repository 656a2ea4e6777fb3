use std::collections::VecDeque;

pub const MOTOR_CHANNEL_LIMIT: u8 = 12;
pub const FILTER_WINDOW_LIMIT: usize = 10;
/// Motor controllers accept speeds in [-127, 127]
pub const MAX_SPEED: i16 = 127;

#[derive(Debug)]
struct ChannelFilter {
    window: usize,
    history: VecDeque<i16>,
}

impl ChannelFilter {
    fn new(window: usize) -> Self {
        let window = window.clamp(1, FILTER_WINDOW_LIMIT);
        Self {
            window,
            history: VecDeque::from(vec![0; window]),
        }
    }

    fn apply(&mut self, raw_speed: i16) -> i8 {
        let raw_speed = raw_speed.clamp(-MAX_SPEED, MAX_SPEED);
        self.history.pop_back();
        self.history.push_front(raw_speed);
        let sum: i32 = self.history.iter().map(|speed| *speed as i32).sum();
        // truncating division keeps the mean inside the actuator range
        (sum / self.window as i32) as i8
    }

    fn clear(&mut self) {
        for sample in self.history.iter_mut() {
            *sample = 0;
        }
    }
}

/// Moving average filters for motor speeds, one per hardware channel.
///
/// Passing every commanded speed through a short rolling window turns abrupt
/// joystick changes into gradual acceleration, which keeps current spikes and
/// gear wear down. The output changes by at most
/// `(new - evicted) / window` per cycle, so a step input reaches its target
/// after `window` control cycles.
///
/// Lookups never fail. Unknown channels filter to 0 so a bad index can
/// never stall the control loop mid match.
#[derive(Debug)]
pub struct FilterBank {
    channels: Vec<Option<ChannelFilter>>,
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBank {
    pub fn new() -> Self {
        let mut channels = Vec::with_capacity(MOTOR_CHANNEL_LIMIT as usize);
        channels.resize_with(MOTOR_CHANNEL_LIMIT as usize, || None);
        Self { channels }
    }

    fn slot(channel: u8) -> Option<usize> {
        if (1..=MOTOR_CHANNEL_LIMIT).contains(&channel) {
            Some(channel as usize - 1)
        } else {
            None
        }
    }

    /// Registers a channel with the given averaging window (clamped to
    /// `1..=FILTER_WINDOW_LIMIT`). Out of range channels and repeated
    /// registrations are ignored.
    pub fn initialize(&mut self, channel: u8, window: usize) {
        if let Some(index) = Self::slot(channel) {
            if self.channels[index].is_none() {
                self.channels[index] = Some(ChannelFilter::new(window));
            }
        }
    }

    /// Pushes a raw speed into the channel's window and returns the new
    /// average. The raw speed saturates to [-127, 127] first. Unregistered
    /// channels always return 0.
    pub fn apply(&mut self, channel: u8, raw_speed: i16) -> i8 {
        match Self::slot(channel).and_then(|index| self.channels[index].as_mut()) {
            Some(filter) => filter.apply(raw_speed),
            None => 0,
        }
    }

    /// Zeroes every registered channel's history, keeping window
    /// configuration. Called when switching control modes so stale commands
    /// don't bleed into the new mode.
    pub fn reset_all(&mut self) {
        for filter in self.channels.iter_mut().flatten() {
            filter.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_channel_filters_to_zero() {
        let mut bank = FilterBank::new();
        assert_eq!(bank.apply(3, 127), 0);
    }

    #[test]
    fn out_of_range_channels_are_ignored() {
        let mut bank = FilterBank::new();
        bank.initialize(0, 4);
        bank.initialize(MOTOR_CHANNEL_LIMIT + 1, 4);
        assert_eq!(bank.apply(0, 100), 0);
        assert_eq!(bank.apply(MOTOR_CHANNEL_LIMIT + 1, 100), 0);
    }

    #[test]
    fn constant_input_converges_after_window_cycles() {
        let mut bank = FilterBank::new();
        bank.initialize(1, 5);
        let mut output = 0;
        for _ in 0..5 {
            output = bank.apply(1, 80);
        }
        assert_eq!(output, 80);
    }

    #[test]
    fn step_response_ramps_linearly() {
        let mut bank = FilterBank::new();
        bank.initialize(2, 4);
        let outputs: Vec<i8> = [100, 100, 100, 100, -100]
            .iter()
            .map(|speed| bank.apply(2, *speed))
            .collect();
        // reversing the stick only moves the mean by one window slot
        assert_eq!(outputs, vec![25, 50, 75, 100, 50]);
    }

    #[test]
    fn raw_speed_saturates_to_actuator_range() {
        let mut bank = FilterBank::new();
        bank.initialize(1, 1);
        assert_eq!(bank.apply(1, 300), 127);
        assert_eq!(bank.apply(1, -300), -127);
    }

    #[test]
    fn output_never_exceeds_actuator_range() {
        let mut bank = FilterBank::new();
        bank.initialize(1, 3);
        for _ in 0..10 {
            let output = bank.apply(1, i16::MAX);
            assert!(output <= MAX_SPEED as i8);
        }
    }

    #[test]
    fn window_is_clamped() {
        let mut bank = FilterBank::new();
        bank.initialize(1, 0);
        // window of 0 clamps to 1 so the filter passes speeds through
        assert_eq!(bank.apply(1, 50), 50);
        bank.initialize(2, FILTER_WINDOW_LIMIT * 10);
        assert_eq!(bank.apply(2, 100), (100 / FILTER_WINDOW_LIMIT) as i8);
    }

    #[test]
    fn reinitialization_is_ignored() {
        let mut bank = FilterBank::new();
        bank.initialize(1, 4);
        bank.apply(1, 100);
        bank.initialize(1, 1);
        // still the original window of 4 with one sample in it
        assert_eq!(bank.apply(1, 100), 50);
    }

    #[test]
    fn reset_clears_history_but_keeps_windows() {
        let mut bank = FilterBank::new();
        bank.initialize(1, 2);
        bank.apply(1, 100);
        bank.apply(1, 100);
        bank.reset_all();
        assert_eq!(bank.apply(1, 100), 50);
    }
}
