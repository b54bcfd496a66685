//! Execution destinations
//!
//! A destination is either a simulator or a physical device. The two share
//! only an identifier and a display name, so every component branches on
//! [`DestinationKind`] instead of going through a common trait.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Simulator,
    Device,
}

impl DestinationKind {
    /// Prefix the launch tool strips from environment variables before
    /// handing them to the launched process.
    pub fn child_env_prefix(&self) -> &'static str {
        match self {
            DestinationKind::Simulator => "SIMCTL_CHILD_",
            DestinationKind::Device => "DEVICECTL_CHILD_",
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationKind::Simulator => write!(f, "simulator"),
            DestinationKind::Device => write!(f, "device"),
        }
    }
}

/// Simulator boot state as reported by `simctl list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootState {
    Booted,
    Booting,
    Shutdown,
    ShuttingDown,
    Unknown,
}

impl BootState {
    /// Parse the `state` field of a simctl device entry.
    pub fn parse(state: &str) -> Self {
        match state {
            "Booted" => BootState::Booted,
            "Booting" => BootState::Booting,
            "Shutdown" => BootState::Shutdown,
            "Shutting Down" => BootState::ShuttingDown,
            _ => BootState::Unknown,
        }
    }

    pub fn is_booted(&self) -> bool {
        matches!(self, BootState::Booted)
    }
}

/// Device passcode lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Locked,
    Unlocked,
    Unknown,
}

impl LockState {
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "locked" => LockState::Locked,
            "unlocked" => LockState::Unlocked,
            _ => LockState::Unknown,
        }
    }
}

/// How a device is connected to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportKind {
    Wired,
    LocalNetwork,
    Unknown,
}

impl TransportKind {
    pub fn parse(transport: &str) -> Self {
        match transport {
            "wired" => TransportKind::Wired,
            "localNetwork" => TransportKind::LocalNetwork,
            _ => TransportKind::Unknown,
        }
    }
}

/// Host/device pairing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingState {
    Paired,
    Unpaired,
    Unknown,
}

impl PairingState {
    pub fn parse(state: &str) -> Self {
        match state {
            "paired" => PairingState::Paired,
            "unpaired" => PairingState::Unpaired,
            _ => PairingState::Unknown,
        }
    }
}

/// CoreDevice tunnel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelState {
    Connected,
    Disconnected,
    Unavailable,
    Unknown,
}

impl TunnelState {
    pub fn parse(state: &str) -> Self {
        match state {
            "connected" => TunnelState::Connected,
            "disconnected" => TunnelState::Disconnected,
            "unavailable" => TunnelState::Unavailable,
            _ => TunnelState::Unknown,
        }
    }
}

/// A simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedDestination {
    /// Simulator UDID
    pub id: String,
    pub name: String,
    pub boot_state: BootState,
}

/// A physical device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDeviceDestination {
    /// Device UDID (or CoreDevice identifier)
    pub id: String,
    pub name: String,
    pub lock_state: LockState,
    pub transport: TransportKind,
    pub pairing: PairingState,
    pub tunnel: TunnelState,
}

/// Where the app is installed and launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExecutionDestination {
    Simulator(SimulatedDestination),
    Device(PhysicalDeviceDestination),
}

impl ExecutionDestination {
    /// Simulator with unknown boot state.
    pub fn simulator(id: impl Into<String>, name: impl Into<String>) -> Self {
        ExecutionDestination::Simulator(SimulatedDestination {
            id: id.into(),
            name: name.into(),
            boot_state: BootState::Unknown,
        })
    }

    /// Device with unknown connectivity; the gatekeeper re-queries it.
    pub fn device(id: impl Into<String>, name: impl Into<String>) -> Self {
        ExecutionDestination::Device(PhysicalDeviceDestination {
            id: id.into(),
            name: name.into(),
            lock_state: LockState::Unknown,
            transport: TransportKind::Unknown,
            pairing: PairingState::Unknown,
            tunnel: TunnelState::Unknown,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            ExecutionDestination::Simulator(sim) => &sim.id,
            ExecutionDestination::Device(device) => &device.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExecutionDestination::Simulator(sim) => &sim.name,
            ExecutionDestination::Device(device) => &device.name,
        }
    }

    pub fn kind(&self) -> DestinationKind {
        match self {
            ExecutionDestination::Simulator(_) => DestinationKind::Simulator,
            ExecutionDestination::Device(_) => DestinationKind::Device,
        }
    }

    /// "iPhone 16 (simulator ABCD-…)" style label for messages.
    pub fn describe(&self) -> String {
        if self.name().is_empty() {
            format!("{} {}", self.kind(), self.id())
        } else {
            format!("{} ({} {})", self.name(), self.kind(), self.id())
        }
    }
}
