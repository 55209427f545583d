//! Continuous heading watch command.

use serde_json::json;

use magbridge::bridge::{Action, CallbackId, Invocation, ResponseStatus};
use magbridge::reading::Heading;

use crate::commands::common::{
    await_result, decode, device_error, format_timestamp, start_bridge, SimArgs,
};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Stream heading updates until interrupted.
pub async fn run(sim: &SimArgs, frequency: u64, filter: f64) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("watch-heading");

    let (bridge, mut responses) = start_bridge(sim);
    let watch_id = CallbackId::new("cli-watch-heading");
    bridge
        .invoke(Invocation::with_args(
            Action::WatchHeading,
            vec![json!(frequency), json!(filter)],
            watch_id.clone(),
        ))
        .await?;

    if filter > 0.0 {
        println!(
            "Watching heading every {} ms, reporting changes over {:.1} deg. Press Ctrl+C to stop.",
            frequency, filter
        );
    } else {
        println!("Watching heading every {} ms. Press Ctrl+C to stop.", frequency);
    }
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
                        let heading: Heading = decode(response.payload)?;
                        let accuracy = if heading.heading_accuracy >= 0.0 {
                            format!("+/- {:.1} deg", heading.heading_accuracy)
                        } else {
                            "accuracy unknown".to_string()
                        };
                        println!(
                            "{}  magnetic {:6.1}  true {:6.1}  {}",
                            format_timestamp(heading.timestamp),
                            heading.magnetic_heading,
                            heading.true_heading,
                            accuracy,
                        );
                    }
                }
            }
        }
    }

    let stop_id = CallbackId::new("cli-stop-heading");
    bridge
        .invoke(Invocation::of(Action::StopWatchHeading, stop_id.clone()))
        .await?;
    await_result(&mut responses, &stop_id).await?;
    bridge.shutdown().await;

    println!("Watch stopped.");
    Ok(())
}
