//! Host-bridge invocation contract.
//!
//! The application shell talks to the plugin through an opaque command
//! channel: every call names an operation, carries a JSON argument array,
//! and a callback identifier that responses must be correlated with. The
//! shell side of the channel is not ours to design; this module pins down
//! the adapter-facing shape of both directions:
//!
//! - [`Invocation`] - One inbound command (action name, args, callback id)
//! - [`Action`] - The operations this plugin implements
//! - [`PluginResponse`] - One outbound result keyed by callback id
//!
//! Responses for all operations flow through a single ordered channel,
//! mirroring the host's one callback queue.

mod invocation;
mod response;

pub use invocation::{Action, CallbackId, Invocation};
pub use response::{PluginResponse, ResponseStatus};
