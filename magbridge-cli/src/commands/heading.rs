//! One-shot compass heading command.

use magbridge::bridge::{Action, CallbackId, Invocation};
use magbridge::reading::Heading;

use crate::commands::common::{await_result, decode, format_timestamp, start_bridge, SimArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Take a single heading fix and print it.
pub async fn run(sim: &SimArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("heading");

    let (bridge, mut responses) = start_bridge(sim);
    let callback_id = CallbackId::new("cli-heading");
    bridge
        .invoke(Invocation::of(Action::GetHeading, callback_id.clone()))
        .await?;

    let heading: Heading = decode(await_result(&mut responses, &callback_id).await?)?;

    println!("Heading at {}:", format_timestamp(heading.timestamp));
    println!("  Magnetic: {:6.1} deg", heading.magnetic_heading);
    println!("  True:     {:6.1} deg", heading.true_heading);
    if heading.heading_accuracy >= 0.0 {
        println!("  Accuracy: +/- {:.1} deg", heading.heading_accuracy);
    } else {
        println!("  Accuracy: unknown");
    }

    bridge.shutdown().await;
    Ok(())
}
