#![doc = include_str!("../README.md")]
pub mod configuration;
pub mod driver;
pub mod holonomic_controller;
pub mod input;
pub mod opcontrol;
pub mod speed_filter;
pub mod toggle_button;
pub mod util;
