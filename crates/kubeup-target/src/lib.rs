//! Concrete implementations of the three Target kinds a composed tree can
//! render through (spec §4.4/§4.5): apply directly against the cloud,
//! emit a standalone shell script, or report what would change without
//! touching anything.

mod dryrun;
mod error;
mod live;
mod script;

pub use dryrun::DryRunTarget;
pub use error::TargetError;
pub use live::{wait_for_instance_running, WAIT_FOR_RUNNING_ATTEMPTS, WAIT_FOR_RUNNING_INTERVAL};
pub use script::ScriptTarget;
