//! Applies Units directly against the cloud (spec §4.5 LiveApiTarget).
//! `kubeup-graph::run_tree`'s `RenderMode::Live` arm drives each Unit
//! straight through [`kubeup_units::RunCtx`]; this module only adds the
//! one thing a plain `Unit::run` loop can't express on its own — waiting
//! for the master instance to actually come up before bootstrap can ssh in.

use std::time::Duration;

use kubeup_units::RunCtx;

use crate::error::TargetError;

/// Matches the original's fixed 30-attempt/10-second poll for instance
/// state (spec §4.5).
pub const WAIT_FOR_RUNNING_ATTEMPTS: u32 = 30;
pub const WAIT_FOR_RUNNING_INTERVAL: Duration = Duration::from_secs(10);

/// Polls `describe_instance` until it reports `"running"`, or gives up
/// after [`WAIT_FOR_RUNNING_ATTEMPTS`].
pub fn wait_for_instance_running(ctx: &RunCtx, instance_id: &str) -> Result<(), TargetError> {
    for attempt in 1..=WAIT_FOR_RUNNING_ATTEMPTS {
        let info = ctx.block_on(ctx.cloud.describe_instance(instance_id))?;
        match info {
            Some(info) if info.state == "running" => {
                tracing::info!(instance_id, attempt, "instance is running");
                return Ok(());
            }
            Some(info) => {
                tracing::debug!(instance_id, attempt, state = %info.state, "instance not yet running");
            }
            None => {
                tracing::debug!(instance_id, attempt, "instance not yet visible to the cloud API");
            }
        }
        if attempt < WAIT_FOR_RUNNING_ATTEMPTS {
            ctx.block_on(tokio::time::sleep(WAIT_FOR_RUNNING_INTERVAL));
        }
    }
    Err(TargetError::InstanceNotRunning {
        instance_id: instance_id.to_string(),
        attempts: WAIT_FOR_RUNNING_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_the_documented_bound() {
        assert_eq!(WAIT_FOR_RUNNING_ATTEMPTS, 30);
        assert_eq!(WAIT_FOR_RUNNING_INTERVAL, Duration::from_secs(10));
    }
}
