// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bluetooth permission gate.
//!
//! Two capabilities are needed before touching the radio: one to open
//! connections and one to enumerate devices. Checking is a pure query;
//! requesting is a separate side effect whose outcome is never awaited.

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

/// A runtime capability required for Bluetooth access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Open connections to remote devices.
    Connect,
    /// Enumerate paired devices.
    Scan,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "BLUETOOTH_CONNECT",
            Self::Scan => "BLUETOOTH_SCAN",
        }
    }
}

/// Snapshot of the granted capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionState {
    pub bluetooth_connect: bool,
    pub bluetooth_scan: bool,
}

impl PermissionState {
    pub fn all_granted() -> Self {
        Self {
            bluetooth_connect: true,
            bluetooth_scan: true,
        }
    }

    /// Capabilities that are not granted, connect first.
    pub fn missing(&self) -> Vec<Capability> {
        let mut missing = Vec::new();
        if !self.bluetooth_connect {
            missing.push(Capability::Connect);
        }
        if !self.bluetooth_scan {
            missing.push(Capability::Scan);
        }
        missing
    }
}

/// Source of the process's Bluetooth capabilities.
pub trait PermissionProvider: Send + Sync {
    /// Whether the platform grants capabilities at runtime at all.
    /// When false, the gate never consults `check`.
    fn requires_runtime_grant(&self) -> bool {
        true
    }

    /// Read the current state. Must not be cached by the caller.
    fn check(&self) -> PermissionState;

    /// Ask for the missing capabilities. Returns immediately.
    fn request(&self, missing: &[Capability]);
}

/// Gate consulted before discovery and connection.
#[derive(Debug)]
pub struct PermissionGate<P> {
    provider: P,
}

impl<P: PermissionProvider> PermissionGate<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Return true if every capability is granted.
    ///
    /// Otherwise a request for the missing subset is issued and false is
    /// returned for this call; the caller has to retry once the user answered.
    pub fn ensure_granted(&self) -> bool {
        if !self.provider.requires_runtime_grant() {
            return true;
        }

        let missing = self.provider.check().missing();
        if missing.is_empty() {
            return true;
        }

        info!("Requesting Bluetooth permissions: {:?}", missing);
        self.provider.request(&missing);
        false
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

/// Provider for platforms where Bluetooth access is implicitly granted,
/// such as BlueZ on Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplicitPermissions;

impl PermissionProvider for ImplicitPermissions {
    fn requires_runtime_grant(&self) -> bool {
        false
    }

    fn check(&self) -> PermissionState {
        PermissionState::all_granted()
    }

    fn request(&self, _missing: &[Capability]) {}
}

/// Provider whose state is set by the host, e.g. from an outer permission
/// prompt. Requests are recorded for the host to act on.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    state: RwLock<PermissionState>,
    requests: Mutex<Vec<Vec<Capability>>>,
}

impl StaticPermissions {
    pub fn new(state: PermissionState) -> Self {
        Self {
            state: RwLock::new(state),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_state(&self, state: PermissionState) {
        *self.state.write() = state;
    }

    pub fn grant_all(&self) {
        self.set_state(PermissionState::all_granted());
    }

    /// Requests issued so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<Capability>> {
        self.requests.lock().clone()
    }
}

impl PermissionProvider for StaticPermissions {
    fn check(&self) -> PermissionState {
        *self.state.read()
    }

    fn request(&self, missing: &[Capability]) {
        debug!(
            "Permission request recorded: {:?}",
            missing.iter().map(Capability::as_str).collect::<Vec<_>>()
        );
        self.requests.lock().push(missing.to_vec());
    }
}

impl<P: PermissionProvider + ?Sized> PermissionProvider for std::sync::Arc<P> {
    fn requires_runtime_grant(&self) -> bool {
        (**self).requires_runtime_grant()
    }

    fn check(&self) -> PermissionState {
        (**self).check()
    }

    fn request(&self, missing: &[Capability]) {
        (**self).request(missing)
    }
}
