use serde::{Deserialize, Serialize};

pub const JOYSTICK_SLOTS: u8 = 2;
pub const AXES_PER_JOYSTICK: u8 = 6;
/// Button groups occupy ids 5 through 8 on the handset
pub const FIRST_BUTTON_GROUP: u8 = 5;
pub const BUTTON_GROUPS_PER_JOYSTICK: u8 = 4;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonGroup {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl ButtonGroup {
    pub fn pressed(&self, button: Button) -> bool {
        match button {
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            up: bits & 0b0001 != 0,
            down: bits & 0b0010 != 0,
            left: bits & 0b0100 != 0,
            right: bits & 0b1000 != 0,
        }
    }

    pub fn to_bits(self) -> u8 {
        (self.up as u8)
            | (self.down as u8) << 1
            | (self.left as u8) << 2
            | (self.right as u8) << 3
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoystickState {
    pub axes: [i8; AXES_PER_JOYSTICK as usize],
    pub button_groups: [ButtonGroup; BUTTON_GROUPS_PER_JOYSTICK as usize],
}

/// One consistent snapshot of everything the cortex reported for a control
/// cycle. The loop reads axes, buttons and sensors from the same snapshot so
/// a mid-cycle telemetry frame can never skew edge detection.
#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq)]
pub struct CortexState {
    pub joysticks: [JoystickState; JOYSTICK_SLOTS as usize],
    /// Accumulated gyro heading, not reduced to [0, 360)
    pub heading_degrees: i32,
    /// Ultrasonic range, millimeters
    pub range_mm: u16,
}

impl CortexState {
    fn joystick(&self, slot: u8) -> Option<&JoystickState> {
        if (1..=JOYSTICK_SLOTS).contains(&slot) {
            Some(&self.joysticks[slot as usize - 1])
        } else {
            None
        }
    }

    /// Analog axis in [-127, 127]; 0 for unknown slots or axes.
    pub fn axis(&self, slot: u8, axis: u8) -> i8 {
        self.joystick(slot)
            .filter(|_| (1..=AXES_PER_JOYSTICK).contains(&axis))
            .map(|joystick| joystick.axes[axis as usize - 1])
            .unwrap_or(0)
    }

    /// Digital button state; false for unknown slots or groups.
    pub fn button(&self, slot: u8, group: u8, button: Button) -> bool {
        let range = FIRST_BUTTON_GROUP..FIRST_BUTTON_GROUP + BUTTON_GROUPS_PER_JOYSTICK;
        self.joystick(slot)
            .filter(|_| range.contains(&group))
            .map(|joystick| {
                joystick.button_groups[(group - FIRST_BUTTON_GROUP) as usize].pressed(button)
            })
            .unwrap_or(false)
    }

    pub fn range_cm(&self) -> f32 {
        self.range_mm as f32 / 10.0
    }
}
