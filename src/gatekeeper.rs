//! Destination Gatekeeper
//!
//! Makes sure the destination can take an install right now:
//! - simulator: exactly one simulator booted system-wide, the requested one
//! - device: paired, reachable, and unlocked (waiting for an unlock if needed)

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::context::LaunchContext;
use crate::destination::{
    ExecutionDestination, LockState, PairingState, PhysicalDeviceDestination,
    SimulatedDestination, TunnelState,
};
use crate::error::{LaunchError, StepResult};
use crate::xcrun::{Devicectl, Simctl};

pub struct Gatekeeper<'a> {
    ctx: &'a LaunchContext,
}

impl<'a> Gatekeeper<'a> {
    pub fn new(ctx: &'a LaunchContext) -> Self {
        Self { ctx }
    }

    /// Ready `destination` and return a freshly queried snapshot of it.
    ///
    /// `on_unlock_wait` is called after each poll that found a device
    /// locked, with the total time waited so far.
    pub fn ensure_ready(
        &self,
        destination: &ExecutionDestination,
        on_unlock_wait: &mut dyn FnMut(Duration),
    ) -> StepResult<ExecutionDestination> {
        match destination {
            ExecutionDestination::Simulator(sim) => self
                .ensure_single_simulator(sim)
                .map(ExecutionDestination::Simulator),
            ExecutionDestination::Device(device) => self
                .ensure_device(device, on_unlock_wait)
                .map(ExecutionDestination::Device),
        }
    }

    /// Shut down every other booted simulator, then boot the target.
    ///
    /// Repeating the call with the same target issues no shutdown or boot.
    pub fn ensure_single_simulator(
        &self,
        target: &SimulatedDestination,
    ) -> StepResult<SimulatedDestination> {
        let simctl = Simctl::new(self.ctx);
        let devices = simctl.list_devices()?;

        let mut current = devices
            .iter()
            .find(|d| d.id == target.id)
            .cloned()
            .ok_or_else(|| {
                LaunchError::state(
                    format!("simulator {}", target.id),
                    "not found in `simctl list devices`",
                )
            })?;
        if current.name.is_empty() {
            current.name = target.name.clone();
        }

        for other in devices
            .iter()
            .filter(|d| d.id != target.id && d.boot_state.is_booted())
        {
            info!("shutting down other booted simulator {} ({})", other.name, other.id);
            simctl.shutdown(&other.id)?;
        }

        if !current.boot_state.is_booted() {
            simctl.boot(&current.id)?;
            simctl.wait_for_boot(&current.id)?;
        } else {
            debug!("simulator {} already booted", current.id);
        }
        simctl.open_simulator_app(&current.id);

        current.boot_state = crate::destination::BootState::Booted;
        Ok(current)
    }

    /// Check pairing and tunnel state, then wait for the device to unlock.
    pub fn ensure_device(
        &self,
        device: &PhysicalDeviceDestination,
        on_unlock_wait: &mut dyn FnMut(Duration),
    ) -> StepResult<PhysicalDeviceDestination> {
        let devicectl = Devicectl::new(self.ctx);
        let label = format!("device {}", device.id);

        let connectivity = devicectl.connectivity(&device.id).map_err(|e| match e {
            LaunchError::ToolInvocation { source, .. } => LaunchError::state(
                label.clone(),
                format!("not connected or not visible to devicectl ({})", source),
            ),
            other => other,
        })?;

        let mut current = device.clone();
        connectivity.apply_to(&mut current);

        match current.pairing {
            PairingState::Paired => {}
            PairingState::Unpaired => {
                return Err(LaunchError::state(label, "is not paired with this Mac"));
            }
            PairingState::Unknown => warn!("{}: pairing state not reported", label),
        }
        if current.tunnel == TunnelState::Unavailable {
            return Err(LaunchError::state(
                label,
                "tunnel is unavailable; the device cannot be reached",
            ));
        }

        current.lock_state = self.wait_for_unlock(&devicectl, &current.id, on_unlock_wait)?;
        Ok(current)
    }

    /// Poll the lock state until unlocked or `timeouts.unlock_seconds` pass.
    ///
    /// A failing lock query counts as unlocked. Elapsed time is reported as
    /// poll count times interval.
    fn wait_for_unlock(
        &self,
        devicectl: &Devicectl<'_>,
        device_id: &str,
        on_unlock_wait: &mut dyn FnMut(Duration),
    ) -> StepResult<LockState> {
        let interval = self.ctx.config.intervals.unlock_poll();
        let timeout = self.ctx.config.timeouts.unlock();
        let mut polls: u32 = 0;

        loop {
            let state = match devicectl.lock_state(device_id) {
                Ok(state) => state,
                Err(e @ LaunchError::Cancelled { .. }) => return Err(e),
                Err(e) => {
                    debug!("lock state query failed, assuming unlocked: {}", e);
                    LockState::Unknown
                }
            };
            if state != LockState::Locked {
                return Ok(state);
            }

            let elapsed = interval * polls;
            if elapsed >= timeout {
                return Err(LaunchError::Timeout {
                    operation: format!("waiting for device {} to unlock", device_id),
                    elapsed,
                    output: String::new(),
                });
            }

            self.ctx.sleep(interval, "waiting for device unlock")?;
            polls += 1;
            on_unlock_wait(interval * polls);
        }
    }
}
