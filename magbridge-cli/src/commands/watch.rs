//! Continuous magnetometer watch command.

use serde_json::json;

use magbridge::bridge::{Action, CallbackId, Invocation, ResponseStatus};
use magbridge::reading::FieldReading;

use crate::commands::common::{
    await_result, decode, device_error, format_timestamp, start_bridge, SimArgs,
};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Stream magnetometer readings until interrupted.
pub async fn run(sim: &SimArgs, frequency: u64) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("watch");

    let (bridge, mut responses) = start_bridge(sim);
    let watch_id = CallbackId::new("cli-watch");
    bridge
        .invoke(Invocation::with_args(
            Action::WatchReadings,
            vec![json!(frequency)],
            watch_id.clone(),
        ))
        .await?;

    println!("Watching magnetometer every {} ms. Press Ctrl+C to stop.", frequency);
    println!();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.map_err(CliError::Signal)?;
                println!();
                println!("Shutdown requested.");
                break;
            }
            response = responses.recv() => {
                let Some(response) = response else {
                    return Err(CliError::ResponseStream);
                };
                match response.status {
                    ResponseStatus::NoResult => continue,
                    ResponseStatus::Error => return Err(device_error(&response.payload)),
                    ResponseStatus::Ok => {
                        let reading: FieldReading = decode(response.payload)?;
                        println!(
                            "{}  x {:8.2}  y {:8.2}  z {:8.2}  magnitude {:8.2} uT",
                            format_timestamp(reading.timestamp),
                            reading.x,
                            reading.y,
                            reading.z,
                            reading.magnitude,
                        );
                    }
                }
            }
        }
    }

    let stop_id = CallbackId::new("cli-stop");
    bridge
        .invoke(Invocation::of(Action::StopWatch, stop_id.clone()))
        .await?;
    await_result(&mut responses, &stop_id).await?;
    bridge.shutdown().await;

    println!("Watch stopped.");
    Ok(())
}
