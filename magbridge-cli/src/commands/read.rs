//! One-shot magnetometer reading command.

use magbridge::bridge::{Action, CallbackId, Invocation};
use magbridge::reading::FieldReading;

use crate::commands::common::{await_result, decode, format_timestamp, start_bridge, SimArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Take a single magnetometer reading and print it.
pub async fn run(sim: &SimArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("read");

    let (bridge, mut responses) = start_bridge(sim);
    let callback_id = CallbackId::new("cli-read");
    bridge
        .invoke(Invocation::of(Action::GetReading, callback_id.clone()))
        .await?;

    let reading: FieldReading = decode(await_result(&mut responses, &callback_id).await?)?;

    println!(
        "Magnetometer reading at {}:",
        format_timestamp(reading.timestamp)
    );
    println!("  X: {:8.2} uT", reading.x);
    println!("  Y: {:8.2} uT", reading.y);
    println!("  Z: {:8.2} uT", reading.z);
    println!("  Magnitude: {:.2} uT", reading.magnitude);

    bridge.shutdown().await;
    Ok(())
}
