pub mod serial_cortex;

use anyhow::{Error, Result};
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::*;

use crate::input::{ButtonGroup, CortexState, JoystickState};

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum CortexError {
    #[error("communication with the cortex failed")]
    CommError,
    #[error("failed opening serial port")]
    FailedOpeningSerialPort,
    #[error("malformed telemetry frame")]
    MalformedFrame,
}

/// Fire-and-forget sink for motor commands. The cortex applies a speed until
/// the next frame for that channel arrives, so the control loop re-sends
/// every cycle.
#[async_trait]
pub trait CortexDriver: Send {
    async fn set_motor(&mut self, channel: u8, speed: i8) -> Result<()>;
}

/// Driver that only logs. Used by `--dry-run` to exercise the control loop
/// on a bench without a robot attached.
#[derive(Default)]
pub struct LoggingCortexDriver;

#[async_trait]
impl CortexDriver for LoggingCortexDriver {
    async fn set_motor(&mut self, channel: u8, speed: i8) -> Result<()> {
        debug!("motor {} -> {}", channel, speed);
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct MotorFrame {
    pub channel: u8,
    pub speed: i8,
}

impl MotorFrame {
    fn encode(&self) -> Vec<u8> {
        // sign in its own byte, magnitude unsigned, same shape the cortex
        // firmware has always expected
        let buffer = vec![
            self.channel,
            (self.speed > 0) as u8,
            self.speed.unsigned_abs(),
        ];

        let mut encoded = postcard_cobs::encode_vec(&buffer);
        encoded.push(0);
        encoded
    }
}

const TELEMETRY_PAYLOAD_LENGTH: usize = 24;

/// Packs a snapshot into the 24 byte telemetry payload. The cortex side of
/// the link produces these; this direction exists for the bench rig and
/// tests.
pub fn encode_telemetry(state: &CortexState) -> Vec<u8> {
    let mut payload = Vec::with_capacity(TELEMETRY_PAYLOAD_LENGTH);
    for joystick in &state.joysticks {
        for axis in joystick.axes {
            payload.push(axis as u8);
        }
        for group in joystick.button_groups {
            payload.push(group.to_bits());
        }
    }
    payload.extend_from_slice(&(state.heading_degrees as i16).to_le_bytes());
    payload.extend_from_slice(&state.range_mm.to_le_bytes());

    let mut encoded = postcard_cobs::encode_vec(&payload);
    encoded.push(0);
    encoded
}

fn decode_telemetry(payload: &[u8]) -> Result<CortexState, CortexError> {
    if payload.len() != TELEMETRY_PAYLOAD_LENGTH {
        return Err(CortexError::MalformedFrame);
    }
    let mut joysticks = [JoystickState::default(); 2];
    for (index, joystick) in joysticks.iter_mut().enumerate() {
        let base = index * 10;
        for (axis, byte) in joystick.axes.iter_mut().zip(&payload[base..base + 6]) {
            *axis = *byte as i8;
        }
        for (group, byte) in joystick
            .button_groups
            .iter_mut()
            .zip(&payload[base + 6..base + 10])
        {
            *group = ButtonGroup::from_bits(*byte);
        }
    }
    let heading = i16::from_le_bytes([payload[20], payload[21]]);
    let range = u16::from_le_bytes([payload[22], payload[23]]);
    Ok(CortexState {
        joysticks,
        heading_degrees: heading as i32,
        range_mm: range,
    })
}

pub struct CortexProtocol;

impl Decoder for CortexProtocol {
    type Item = CortexState;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(delimiter) = src.iter().position(|byte| *byte == 0) {
            let frame = src.split_to(delimiter + 1);
            let payload = match postcard_cobs::decode_vec(&frame[..delimiter]) {
                Ok(payload) => payload,
                Err(()) => {
                    warn!("Dropping undecodable telemetry frame");
                    continue;
                }
            };
            match decode_telemetry(&payload) {
                Ok(state) => return Ok(Some(state)),
                Err(err) => warn!("Dropping telemetry frame: {}", err),
            }
        }
        Ok(None)
    }
}

impl Encoder<MotorFrame> for CortexProtocol {
    type Error = Error;

    fn encode(&mut self, data: MotorFrame, buf: &mut BytesMut) -> Result<(), Error> {
        let encoded_data = data.encode();
        buf.reserve(encoded_data.len());
        buf.put_slice(&encoded_data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Button;

    #[test]
    fn motor_frame_encoding_adds_trailing_zero() {
        let frame = MotorFrame::default();
        let encoded = frame.encode();
        assert_eq!(*encoded.last().unwrap(), 0_u8);
    }

    #[test]
    fn motor_frame_splits_sign_and_magnitude() {
        let frame = MotorFrame {
            channel: 2,
            speed: -127,
        };
        let encoded = frame.encode();
        // overhead byte, channel, sign replaced by cobs, magnitude
        assert_eq!(encoded[1], 2_u8);
        assert_eq!(encoded[3], 127_u8);
    }

    #[test]
    fn telemetry_round_trip() {
        let mut state = CortexState {
            heading_degrees: -300,
            range_mm: 1520,
            ..Default::default()
        };
        state.joysticks[0].axes[2] = -90;
        state.joysticks[0].button_groups[3] = ButtonGroup::from_bits(0b0110);
        state.joysticks[1].axes[0] = 45;

        let mut buffer = BytesMut::from(&encode_telemetry(&state)[..]);
        let decoded = CortexProtocol.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(decoded, state);
        assert!(decoded.button(1, 8, Button::Down));
        assert!(buffer.is_empty());
    }

    #[test]
    fn truncated_frame_is_skipped() {
        let state = CortexState::default();
        let mut bytes = encode_telemetry(&state);
        // a short garbage frame ahead of a good one
        let mut buffer = BytesMut::from(&[5_u8, 1, 0][..]);
        buffer.extend_from_slice(&bytes);
        let decoded = CortexProtocol.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(decoded, state);
        bytes.truncate(4);
        let mut buffer = BytesMut::from(&bytes[..]);
        assert!(CortexProtocol.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn partial_frame_waits_for_more_data() {
        let mut buffer = BytesMut::from(&[7_u8, 7, 7][..]);
        assert!(CortexProtocol.decode(&mut buffer).unwrap().is_none());
        assert_eq!(buffer.len(), 3);
    }
}
