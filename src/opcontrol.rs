use std::time::Duration;

use anyhow::Result;
use tokio::time::interval;
use tracing::*;

use crate::configuration::{AppConfig, BodyConfig, ControlConfig, MotorConfig};
use crate::driver::CortexDriver;
use crate::holonomic_controller::{field_oriented, WheelCommand};
use crate::input::{Button, CortexState};
use crate::speed_filter::{FilterBank, MAX_SPEED};
use crate::toggle_button::{ButtonState, ToggleButtonRegistry};
use crate::util::LatestReceiver;

pub const CYCLE_PERIOD: Duration = Duration::from_millis(20);

/// Operator control loop.
///
/// One `tick` per cycle: poll toggles, map the sticks onto wheel speeds,
/// run the mechanisms, and push everything through the per-channel speed
/// filters before it reaches the cortex. Each tick works off a single
/// snapshot so button edges and axes can't shift mid-cycle.
pub struct OpControl {
    driver: Box<dyn CortexDriver>,
    filters: FilterBank,
    toggles: ToggleButtonRegistry,
    body: BodyConfig,
    control: ControlConfig,
    shooter_speed: i16,
    shooter_on: bool,
    auto_shoot_on: bool,
    front_intake_on: bool,
}

impl OpControl {
    pub fn new(driver: Box<dyn CortexDriver>, config: AppConfig) -> Self {
        let AppConfig { body, control } = config;

        let mut filters = FilterBank::new();
        for motor in body.motors() {
            filters.initialize(motor.channel, motor.filter_window);
        }

        let mut toggles = ToggleButtonRegistry::new();
        let slot = control.joystick_slot;
        // front intake on/off
        toggles.register(slot, control.control_button_group, Button::Left);
        // shooter on/off
        toggles.register(slot, control.control_button_group, Button::Down);
        // auto aim on/off
        toggles.register(slot, control.control_button_group, Button::Right);
        toggles.register(slot, control.shooter_adjust_button_group, Button::Up);
        toggles.register(slot, control.shooter_adjust_button_group, Button::Down);

        Self {
            driver,
            filters,
            toggles,
            body,
            shooter_speed: control.shooter.default_speed,
            control,
            shooter_on: true,
            auto_shoot_on: false,
            front_intake_on: true,
        }
    }

    /// Puts the session back to its power-on defaults: filter histories
    /// zeroed, press history forgotten, mechanism modes re-seeded from
    /// config. A re-enabled session restarts, it does not resume.
    fn reset_session(&mut self) {
        self.filters.reset_all();
        self.toggles.reset();
        self.shooter_speed = self.control.shooter.default_speed;
        self.shooter_on = true;
        self.auto_shoot_on = false;
        self.front_intake_on = true;
    }

    /// Runs cycles at the fixed period until the motor link fails. Always
    /// works off the newest telemetry snapshot; if none arrived this cycle
    /// the previous one is reused.
    pub async fn run(&mut self, telemetry: &LatestReceiver<CortexState>) -> Result<()> {
        self.reset_session();
        info!("Operator control running");
        let mut cycle = interval(CYCLE_PERIOD);
        let mut snapshot = CortexState::default();
        loop {
            cycle.tick().await;
            if let Some(latest) = telemetry.try_take() {
                snapshot = latest;
            }
            self.tick(&snapshot).await?;
        }
    }

    pub async fn tick(&mut self, input: &CortexState) -> Result<()> {
        let slot = self.control.joystick_slot;
        let mut strafe = input.axis(slot, self.control.strafe_axis) as i16;
        let mut forward = input.axis(slot, self.control.drive_axis) as i16;
        let mut rotation = (input.axis(slot, self.control.rotation_axis) as f32
            * self.control.rotation_scale) as i16;

        self.toggles.update_all(input);

        let movement_deadband = self.control.movement_deadband;
        if strafe.abs() < movement_deadband
            && forward.abs() < movement_deadband
            && rotation.abs() < movement_deadband
        {
            // sticks are idle; drop the sub-deadband noise entirely and fall
            // back to button-based walking drive
            strafe = 0;
            forward = 0;
            rotation = 0;
            let walking_speed = self.control.walking_speed;
            let drive_group = self.control.drive_button_group;
            if input.button(slot, drive_group, Button::Up) {
                forward = walking_speed;
            } else if input.button(slot, drive_group, Button::Down) {
                forward = -walking_speed;
            }
            if input.button(slot, drive_group, Button::Left) {
                strafe = -walking_speed;
            } else if input.button(slot, drive_group, Button::Right) {
                strafe = walking_speed;
            }
        } else {
            // zero out negligible components so near-cardinal stick
            // positions drive straight
            if forward.abs() < self.control.diagonal_deadband {
                forward = 0;
            }
            if strafe.abs() < self.control.diagonal_deadband {
                strafe = 0;
            }
        }

        self.drive(
            strafe,
            forward,
            rotation,
            self.control.field_centric,
            input.heading_degrees,
        )
        .await?;

        // the internal intake feeds whenever the lifter runs
        let lifter_group = self.control.lifter_button_group;
        let lifter_speed = if input.button(slot, lifter_group, Button::Up) {
            self.control.lifter_speed
        } else if input.button(slot, lifter_group, Button::Down) {
            -self.control.lifter_speed
        } else {
            0
        };
        self.dispatch(self.body.lifter, lifter_speed).await?;
        self.dispatch(self.body.internal_intake, lifter_speed)
            .await?;

        let control_group = self.control.control_button_group;
        let adjust_group = self.control.shooter_adjust_button_group;
        if self.shooter_on {
            if self.auto_shoot_on {
                self.shooter_speed = self.auto_aim_speed(input.range_cm());
            } else {
                if self.pressed(adjust_group, Button::Up) {
                    self.shooter_speed = (self.shooter_speed
                        + self.control.shooter.speed_increment)
                        .min(MAX_SPEED);
                }
                if self.pressed(adjust_group, Button::Down) {
                    self.shooter_speed = (self.shooter_speed
                        - self.control.shooter.speed_increment)
                        .max(0);
                }
            }
            if self.pressed(control_group, Button::Right) {
                self.auto_shoot_on = !self.auto_shoot_on;
                info!("Auto aim {}", if self.auto_shoot_on { "on" } else { "off" });
            }
        }
        if self.pressed(control_group, Button::Down) {
            self.shooter_on = !self.shooter_on;
            self.shooter_speed = if self.shooter_on {
                self.control.shooter.default_speed
            } else {
                0
            };
            info!("Shooter {}", if self.shooter_on { "on" } else { "off" });
        }
        self.dispatch(self.body.shooter_a, self.shooter_speed)
            .await?;
        self.dispatch(self.body.shooter_b, self.shooter_speed)
            .await?;

        if self.pressed(control_group, Button::Left) {
            self.front_intake_on = !self.front_intake_on;
        }
        let front_intake_speed = if self.front_intake_on {
            self.control.intake_speed
        } else {
            0
        };
        self.dispatch(self.body.front_intake, front_intake_speed)
            .await?;

        Ok(())
    }

    /// Maps a motion vector onto the four wheels and dispatches them.
    async fn drive(
        &mut self,
        vx: i16,
        vy: i16,
        rotation: i16,
        field_centric: bool,
        heading_degrees: i32,
    ) -> Result<()> {
        let (vx, vy) = if field_centric {
            field_oriented(vx, vy, heading_degrees)
        } else {
            (vx, vy)
        };
        let command = WheelCommand::from_move(vx, vy, rotation).normalized();
        self.dispatch(self.body.front_left, command.front_left())
            .await?;
        self.dispatch(self.body.back_left, command.back_left())
            .await?;
        self.dispatch(self.body.front_right, command.front_right())
            .await?;
        self.dispatch(self.body.back_right, command.back_right())
            .await?;
        Ok(())
    }

    /// Filters a raw speed through the motor's channel and sends it out.
    async fn dispatch(&mut self, motor: MotorConfig, raw_speed: i16) -> Result<()> {
        let raw_speed = if motor.inverted { -raw_speed } else { raw_speed };
        let filtered = self.filters.apply(motor.channel, raw_speed);
        self.driver.set_motor(motor.channel, filtered).await
    }

    fn pressed(&self, group: u8, button: Button) -> bool {
        self.toggles
            .get(self.control.joystick_slot, group, button)
            == ButtonState::Pressed
    }

    fn auto_aim_speed(&self, range_cm: f32) -> i16 {
        let auto_aim = self.control.shooter.auto_aim;
        let inches = range_cm / 2.54;
        (auto_aim.slope * inches + auto_aim.offset).clamp(0.0, MAX_SPEED as f32) as i16
    }
}
