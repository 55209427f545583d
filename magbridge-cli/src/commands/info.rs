//! Device information command.

use magbridge::bridge::{Action, CallbackId, Invocation};
use magbridge::reading::MagnetometerInfo;

use crate::commands::common::{await_result, decode, start_bridge, SimArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Print a snapshot of the simulated magnetometer.
pub async fn run(sim: &SimArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("info");

    let (bridge, mut responses) = start_bridge(sim);
    let callback_id = CallbackId::new("cli-info");
    bridge
        .invoke(Invocation::of(
            Action::GetMagnetometerInfo,
            callback_id.clone(),
        ))
        .await?;

    let info: MagnetometerInfo = decode(await_result(&mut responses, &callback_id).await?)?;

    println!("Magnetometer info:");
    println!("  Platform:    {}", info.platform);
    println!("  Available:   {}", if info.is_available { "yes" } else { "no" });
    println!("  Accuracy:    {}", info.accuracy);
    println!(
        "  Calibration: {}",
        if info.calibration_needed {
            "needed"
        } else {
            "not needed"
        }
    );
    match info.reading {
        Some(reading) => println!("  Reading:     {:.2} uT", reading.magnitude),
        None => println!("  Reading:     (none)"),
    }

    bridge.shutdown().await;
    Ok(())
}
