use nalgebra as na;

use crate::speed_filter::MAX_SPEED;

/// Raw wheel speeds before smoothing, one per wheel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelCommand {
    front_left: i16,
    back_left: i16,
    front_right: i16,
    back_right: i16,
}

impl WheelCommand {
    pub fn new(front_left: i16, back_left: i16, front_right: i16, back_right: i16) -> Self {
        Self {
            front_left,
            back_left,
            front_right,
            back_right,
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }

    /// Decomposes strafe/forward/rotation into the four wheel speeds.
    ///
    /// The signs are a hardware wiring choice; what matters is that they stay
    /// internally consistent so `vx = vy = 0` commands pure in-place
    /// rotation.
    pub fn from_move(vx: i16, vy: i16, rotation: i16) -> Self {
        Self::new(
            vy + vx + rotation,
            vy - vx + rotation,
            -vy + vx + rotation,
            -vy - vx + rotation,
        )
    }

    /// Scales all four speeds down uniformly when any exceeds the actuator
    /// range. Uniform scaling keeps the commanded direction and the
    /// turn/translate ratio exact; clamping each wheel independently would
    /// skew the heading.
    pub fn normalized(self) -> Self {
        let max_raw_speed = self
            .front_left
            .abs()
            .max(self.back_left.abs())
            .max(self.front_right.abs())
            .max(self.back_right.abs());
        if max_raw_speed <= MAX_SPEED {
            return self;
        }
        let scale = MAX_SPEED as f32 / max_raw_speed as f32;
        let rescale = |speed: i16| (speed as f32 * scale) as i16;
        Self::new(
            rescale(self.front_left),
            rescale(self.back_left),
            rescale(self.front_right),
            rescale(self.back_right),
        )
    }

    pub fn front_left(&self) -> i16 {
        self.front_left
    }
    pub fn back_left(&self) -> i16 {
        self.back_left
    }
    pub fn front_right(&self) -> i16 {
        self.front_right
    }
    pub fn back_right(&self) -> i16 {
        self.back_right
    }
}

/// Re-aims the translation vector at the field frame so joystick "forward"
/// stays field-forward regardless of chassis heading. The heading is reduced
/// mod 360 before the trig so an accumulating gyro stays stable through
/// wraps. Magnitude is preserved; normalization handles any overshoot of the
/// actuator range downstream.
pub fn field_oriented(vx: i16, vy: i16, heading_degrees: i32) -> (i16, i16) {
    let heading = (-(heading_degrees % 360) as f32).to_radians();
    let magnitude = na::Vector2::new(vx as f32, vy as f32).magnitude();
    (
        (magnitude * heading.sin()) as i16,
        (magnitude * heading.cos()) as i16,
    )
}
