use config::Config;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::*;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub body: BodyConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

impl AppConfig {
    pub fn load_config(config: &Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = if let Some(config) = config {
            info!("Using configuration from {:?}", config);
            Config::builder()
                .add_source(config::Environment::with_prefix("APP"))
                .add_source(config::File::with_name(
                    config
                        .to_str()
                        .ok_or_else(|| anyhow::anyhow!("Failed to convert path"))?,
                ))
                .build()?
        } else {
            info!("Using dev configuration");
            Config::builder()
                .add_source(config::Environment::with_prefix("APP"))
                .add_source(config::File::with_name("config/settings"))
                .add_source(config::File::with_name("config/dev_settings").required(false))
                .build()?
        };

        Ok(settings.try_deserialize()?)
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct MotorConfig {
    /// Hardware output channel, 1 based
    pub channel: u8,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default = "default_filter_window")]
    pub filter_window: usize,
}

fn default_filter_window() -> usize {
    5
}

#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub port: String,
    pub front_left: MotorConfig,
    pub back_left: MotorConfig,
    pub front_right: MotorConfig,
    pub back_right: MotorConfig,
    pub lifter: MotorConfig,
    pub internal_intake: MotorConfig,
    pub front_intake: MotorConfig,
    pub shooter_a: MotorConfig,
    pub shooter_b: MotorConfig,
}

impl BodyConfig {
    pub fn motors(&self) -> [MotorConfig; 9] {
        [
            self.front_left,
            self.back_left,
            self.front_right,
            self.back_right,
            self.lifter,
            self.internal_intake,
            self.front_intake,
            self.shooter_a,
            self.shooter_b,
        ]
    }
}

/// Driver-station tuning. Everything that changed between hardware revisions
/// lives here rather than in code, most notably the rotation axis scale.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ControlConfig {
    pub joystick_slot: u8,
    pub strafe_axis: u8,
    pub drive_axis: u8,
    pub rotation_axis: u8,
    /// Multiplier on the rotation axis before decomposition
    pub rotation_scale: f32,
    pub field_centric: bool,
    pub movement_deadband: i16,
    pub diagonal_deadband: i16,
    pub walking_speed: i16,
    pub lifter_speed: i16,
    pub intake_speed: i16,
    pub drive_button_group: u8,
    pub control_button_group: u8,
    pub lifter_button_group: u8,
    pub shooter_adjust_button_group: u8,
    pub shooter: ShooterConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            joystick_slot: 1,
            strafe_axis: 4,
            drive_axis: 3,
            rotation_axis: 1,
            rotation_scale: 0.5,
            field_centric: false,
            movement_deadband: 30,
            diagonal_deadband: 30,
            walking_speed: 40,
            lifter_speed: 60,
            intake_speed: 127,
            drive_button_group: 7,
            control_button_group: 8,
            lifter_button_group: 5,
            shooter_adjust_button_group: 6,
            shooter: ShooterConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ShooterConfig {
    pub default_speed: i16,
    pub speed_increment: i16,
    pub auto_aim: AutoAimConfig,
}

impl Default for ShooterConfig {
    fn default() -> Self {
        Self {
            default_speed: 80,
            speed_increment: 10,
            auto_aim: AutoAimConfig::default(),
        }
    }
}

/// Linear fit from ultrasonic distance (inches) to shooter speed.
/// Calibrated on the practice field; expect to re-tune per venue.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct AutoAimConfig {
    pub slope: f32,
    pub offset: f32,
}

impl Default for AutoAimConfig {
    fn default() -> Self {
        Self {
            slope: 1.11,
            offset: -1.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DEFAULT_CONFIG: &str = include_str!("../config/settings.yaml");

    #[test]
    fn test_config() {
        let builder = Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap();
        let config = builder.try_deserialize::<AppConfig>().unwrap();
        assert_eq!(config.control.joystick_slot, 1);
    }

    #[test]
    fn default_path_loads_without_dev_overrides() {
        // only settings.yaml ships; the dev overlay is optional
        let config = AppConfig::load_config(&None).unwrap();
        assert_eq!(config.body.front_left.channel, 2);
    }

    #[test]
    fn control_defaults_apply_when_section_is_missing() {
        let builder = Config::builder()
            .add_source(config::File::from_str(
                "body:\n  port: /dev/cortex\n  front_left: { channel: 2 }\n  back_left: { channel: 3 }\n  front_right: { channel: 4 }\n  back_right: { channel: 5 }\n  lifter: { channel: 6 }\n  internal_intake: { channel: 7 }\n  front_intake: { channel: 8 }\n  shooter_a: { channel: 9 }\n  shooter_b: { channel: 10 }\n",
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap();
        let config = builder.try_deserialize::<AppConfig>().unwrap();
        assert_eq!(config.control.walking_speed, 40);
        assert_eq!(config.body.front_left.filter_window, 5);
        assert!(!config.body.front_left.inverted);
    }
}
