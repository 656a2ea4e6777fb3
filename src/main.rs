use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::time::sleep;
use tracing::*;
use tracing_subscriber::filter::LevelFilter;

use maverick::configuration::AppConfig;
use maverick::driver::serial_cortex::SerialCortexDriver;
use maverick::driver::{CortexDriver, LoggingCortexDriver};
use maverick::input::CortexState;
use maverick::opcontrol::OpControl;
use maverick::speed_filter::MAX_SPEED;
use maverick::util::{latest_value_channel, LatestReceiver};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Serial port for the cortex link, overrides the configured port
    #[arg(long)]
    port: Option<String>,
    /// Config path
    #[arg(long)]
    config: Option<PathBuf>,
    /// Spin each drive wheel in sequence and exit
    #[arg(long)]
    wheel_test: bool,
    /// Log motor commands instead of opening the serial port
    #[arg(long)]
    dry_run: bool,
    /// Print decoded telemetry snapshots as json
    #[arg(long)]
    dump_input: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter("maverick=info")
        .with_max_level(LevelFilter::INFO)
        .init();

    let config = AppConfig::load_config(&args.config)?;
    let port = args.port.unwrap_or_else(|| config.body.port.clone());

    // keeps the dry run telemetry channel alive for the lifetime of the loop
    let _idle_telemetry_sender;
    let (mut driver, telemetry): (Box<dyn CortexDriver>, LatestReceiver<CortexState>) =
        if args.dry_run {
            info!("Dry run, motor commands will only be logged");
            let (sender, receiver) = latest_value_channel();
            _idle_telemetry_sender = sender;
            (Box::new(LoggingCortexDriver), receiver)
        } else {
            let (driver, telemetry) = SerialCortexDriver::open(&port)?;
            (Box::new(driver), telemetry)
        };

    if args.dump_input {
        loop {
            let snapshot = telemetry.recv().await?;
            println!("{}", serde_json::to_string(&snapshot)?);
        }
    }

    if args.wheel_test {
        return wheel_test(&mut *driver, &config).await;
    }

    let mut opcontrol = OpControl::new(driver, config);
    loop {
        if let Err(err) = opcontrol.run(&telemetry).await {
            error!("Operator control failed: {:?}", err);
        }
        sleep(Duration::from_secs(1)).await;
    }
}

async fn wheel_test(driver: &mut dyn CortexDriver, config: &AppConfig) -> Result<()> {
    let wheels = [
        config.body.front_left,
        config.body.back_left,
        config.body.front_right,
        config.body.back_right,
    ];
    for motor in wheels {
        info!("Testing wheel on channel {}", motor.channel);
        driver.set_motor(motor.channel, MAX_SPEED as i8).await?;
        sleep(Duration::from_secs_f32(2.)).await;
        driver.set_motor(motor.channel, 0).await?;
    }
    Ok(())
}
