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

//! Printer connection state.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

/// Snapshot returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    pub address: Option<String>,
}

/// Status kept next to the connection.
///
/// Readable while a connect or send holds the connection lock. Only the
/// manager changes it, and only while holding that lock.
#[derive(Debug)]
pub struct PrinterState {
    status: RwLock<ConnectionStatus>,
    address: RwLock<Option<String>>,
}

impl Default for PrinterState {
    fn default() -> Self {
        Self {
            status: RwLock::new(ConnectionStatus::Disconnected),
            address: RwLock::new(None),
        }
    }
}

impl PrinterState {
    fn set(&self, status: ConnectionStatus, address: Option<String>) {
        debug!("Printer status: {} ({:?})", status.as_str(), address);
        *self.status.write() = status;
        *self.address.write() = address;
    }

    pub(crate) fn set_connecting(&self, address: String) {
        self.set(ConnectionStatus::Connecting, Some(address));
    }

    pub(crate) fn set_connected(&self, address: String) {
        self.set(ConnectionStatus::Connected, Some(address));
    }

    pub(crate) fn set_disconnected(&self) {
        self.set(ConnectionStatus::Disconnected, None);
    }

    /// A connection attempt failed; nothing is connected.
    pub(crate) fn set_error(&self) {
        self.set(ConnectionStatus::Error, None);
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    pub fn get_address(&self) -> Option<String> {
        self.address.read().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.get_status(),
            address: self.get_address(),
        }
    }
}
