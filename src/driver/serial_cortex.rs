use anyhow::Result;
use async_trait::async_trait;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Framed};
use tracing::*;

use super::{CortexDriver, CortexError, CortexProtocol, MotorFrame};
use crate::input::CortexState;
use crate::util::{latest_value_channel, LatestReceiver};

const BAUD_RATE: u32 = 115200;

/// Serial link to the cortex. Motor frames go out through the sink half;
/// a reader task decodes inbound telemetry and keeps only the newest
/// snapshot for the control loop.
pub struct SerialCortexDriver {
    motor_sink: SplitSink<Framed<SerialStream, CortexProtocol>, MotorFrame>,
}

impl SerialCortexDriver {
    pub fn open(port: &str) -> Result<(Self, LatestReceiver<CortexState>)> {
        let serial_port = tokio_serial::new(port, BAUD_RATE)
            .open_native_async()
            .map_err(|_| CortexError::FailedOpeningSerialPort)?;
        let (motor_sink, mut telemetry_stream) = CortexProtocol.framed(serial_port).split();
        let (sender, receiver) = latest_value_channel();
        tokio::spawn(async move {
            while let Some(message) = telemetry_stream.next().await {
                match message {
                    Ok(state) => {
                        if sender.send(state).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("Telemetry stream error: {}", err),
                }
            }
            info!("Telemetry stream closed");
        });
        Ok((Self { motor_sink }, receiver))
    }
}

#[async_trait]
impl CortexDriver for SerialCortexDriver {
    async fn set_motor(&mut self, channel: u8, speed: i8) -> Result<()> {
        self.motor_sink
            .send(MotorFrame { channel, speed })
            .await
            .map_err(|_| CortexError::CommError)?;
        Ok(())
    }
}
