//! Total field strength command.

use magbridge::bridge::{Action, CallbackId, Invocation};

use crate::commands::common::{await_result, decode, start_bridge, SimArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Measure the total magnetic field strength and print it.
pub async fn run(sim: &SimArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("strength");

    let (bridge, mut responses) = start_bridge(sim);
    let callback_id = CallbackId::new("cli-strength");
    bridge
        .invoke(Invocation::of(Action::GetFieldStrength, callback_id.clone()))
        .await?;

    let strength: f64 = decode(await_result(&mut responses, &callback_id).await?)?;

    println!("Field strength: {:.2} uT", strength);

    bridge.shutdown().await;
    Ok(())
}
