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

//! Printer connection manager.
//!
//! Owns at most one connection. Every operation that touches the connection
//! takes the same async lock for its whole duration, so a send can never
//! observe a stream that a concurrent connect or disconnect is tearing down.
//!
//! The `print_*` methods keep a boolean surface: failures are
//! logged and flattened. The `try_*`/`send_*` methods return the typed
//! [`PrinterError`] instead.

use bluer::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::{BondedDevice, PrinterBackend};
use super::error::{PrinterError, PrinterResult};
use crate::config::{BluetoothConfig, UNKNOWN_DEVICE_NAME};
use crate::permissions::{PermissionGate, PermissionProvider};
use crate::state::{ConnectionStatus, PrinterState, StatusSnapshot};

/// A bonded printer as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub address: String,
}

/// The single live connection.
struct Connection<S> {
    address: Address,
    stream: S,
}

/// Status bookkeeping for one connection attempt.
///
/// Dropping it before [`finish`](Self::finish), e.g. when the caller
/// cancels the connect future, resets the status to disconnected.
struct ConnectAttempt<'a> {
    state: &'a PrinterState,
    address: Address,
    finished: bool,
}

impl<'a> ConnectAttempt<'a> {
    fn start(state: &'a PrinterState, address: Address) -> Self {
        state.set_connecting(address.to_string());
        Self {
            state,
            address,
            finished: false,
        }
    }

    fn finish(mut self, connected: bool) {
        if connected {
            self.state.set_connected(self.address.to_string());
        } else {
            self.state.set_error();
        }
        self.finished = true;
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Connection attempt to {} cancelled", self.address);
            self.state.set_disconnected();
        }
    }
}

/// Manager for one SPP printer connection.
pub struct PrinterManager<B: PrinterBackend, P> {
    backend: B,
    gate: PermissionGate<P>,
    connection: Mutex<Option<Connection<B::Stream>>>,
    state: PrinterState,
    connect_timeout: Duration,
    unknown_name: String,
}

impl<B: PrinterBackend, P: PermissionProvider> PrinterManager<B, P> {
    /// Create a new manager in the disconnected state.
    pub fn new(backend: B, permissions: P, config: &BluetoothConfig) -> Self {
        let unknown_name = if config.unknown_device_name.trim().is_empty() {
            UNKNOWN_DEVICE_NAME.to_string()
        } else {
            config.unknown_device_name.clone()
        };

        Self {
            backend,
            gate: PermissionGate::new(permissions),
            connection: Mutex::new(None),
            state: PrinterState::default(),
            connect_timeout: config.connect_timeout(),
            unknown_name,
        }
    }

    /// Override the connection attempt timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn permission_gate(&self) -> &PermissionGate<P> {
        &self.gate
    }

    /// Status snapshot, readable while an operation is in flight.
    pub fn status(&self) -> StatusSnapshot {
        self.state.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.state.get_status() == ConnectionStatus::Connected
    }

    pub fn connected_address(&self) -> Option<String> {
        if self.is_connected() {
            self.state.get_address()
        } else {
            None
        }
    }

    /// List bonded devices.
    ///
    /// Returns an empty list when permissions are missing, no adapter is
    /// available or the backend fails; callers cannot tell these apart.
    pub async fn discover(&self) -> Vec<DeviceDescriptor> {
        match self.try_discover().await {
            Ok(devices) => {
                info!("Found {} bonded device(s)", devices.len());
                devices
            }
            Err(e) if e.is_transport() => {
                warn!("Printer discovery failed: {}", e);
                Vec::new()
            }
            Err(e) => {
                info!("Printer discovery skipped: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn try_discover(&self) -> PrinterResult<Vec<DeviceDescriptor>> {
        if !self.gate.ensure_granted() {
            return Err(PrinterError::PermissionDenied);
        }

        let devices = self.backend.bonded_devices().await?;
        Ok(devices
            .into_iter()
            .map(|device| self.describe(device))
            .collect())
    }

    fn describe(&self, device: BondedDevice) -> DeviceDescriptor {
        let name = device
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.unknown_name.clone());

        DeviceDescriptor {
            name,
            address: device.address.to_string(),
        }
    }

    /// Connect to the printer at `address`, returning whether it succeeded.
    pub async fn connect(&self, address: &str) -> bool {
        match self.try_connect(address).await {
            Ok(()) => true,
            Err(e) if e.is_transport() => {
                warn!("Failed to connect to printer {}: {}", address, e);
                false
            }
            Err(e) => {
                info!("Not connecting to printer {}: {}", address, e);
                false
            }
        }
    }

    /// Connect to the printer at `address`.
    ///
    /// Any existing connection is closed before the attempt starts, so a
    /// failed attempt leaves the manager disconnected.
    pub async fn try_connect(&self, address: &str) -> PrinterResult<()> {
        let mut connection = self.connection.lock().await;

        if let Some(old) = connection.take() {
            info!("Dropping connection to {} before reconnecting", old.address);
            self.state.set_disconnected();
            Self::close(old).await;
        }

        if !self.gate.ensure_granted() {
            return Err(PrinterError::PermissionDenied);
        }

        let target: Address = address
            .trim()
            .parse()
            .map_err(|_| PrinterError::InvalidAddress(address.to_string()))?;

        info!("Connecting to printer {}...", target);
        let attempt = ConnectAttempt::start(&self.state, target);

        let opened = match tokio::time::timeout(self.connect_timeout, self.backend.open(target)).await
        {
            Ok(result) => result,
            Err(_) => Err(PrinterError::Timeout(self.connect_timeout)),
        };

        match opened {
            Ok(stream) => {
                *connection = Some(Connection {
                    address: target,
                    stream,
                });
                attempt.finish(true);
                info!("Printer connected: {}", target);
                Ok(())
            }
            Err(e) => {
                attempt.finish(false);
                Err(e)
            }
        }
    }

    /// Close the connection, if any. Calling it again is a no-op.
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;

        let old = connection.take();
        self.state.set_disconnected();

        match old {
            Some(conn) => {
                info!("Disconnecting from printer {}", conn.address);
                Self::close(conn).await;
            }
            None => debug!("Disconnect requested with no active connection"),
        }
    }

    /// Print a line of text.
    ///
    /// Without a connection this silently does nothing, and write failures
    /// are only logged. Unlike [`print_bytes`](Self::print_bytes), nothing is
    /// reported back to the caller.
    pub async fn print_text(&self, text: &str) {
        match self.send_text(text).await {
            Ok(()) => {}
            Err(PrinterError::NotConnected) => debug!("No printer connected, text dropped"),
            Err(e) => warn!("Failed to print text: {}", e),
        }
    }

    /// Print raw bytes, returning false if nothing is connected or the
    /// write fails.
    pub async fn print_bytes(&self, bytes: &[u8]) -> bool {
        match self.send_bytes(bytes).await {
            Ok(()) => true,
            Err(e) if e.is_transport() => {
                warn!("Failed to print {} byte(s): {}", bytes.len(), e);
                false
            }
            Err(e) => {
                debug!("Not printing {} byte(s): {}", bytes.len(), e);
                false
            }
        }
    }

    /// Write `text` followed by a single newline.
    pub async fn send_text(&self, text: &str) -> PrinterResult<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.send_bytes(line.as_bytes()).await
    }

    /// Write `bytes` verbatim and flush.
    ///
    /// The connection is left in place on failure; callers wanting to
    /// recover must connect again.
    pub async fn send_bytes(&self, bytes: &[u8]) -> PrinterResult<()> {
        let mut connection = self.connection.lock().await;
        let conn = connection.as_mut().ok_or(PrinterError::NotConnected)?;

        conn.stream.write_all(bytes).await?;
        conn.stream.flush().await?;
        debug!("Sent {} byte(s) to {}", bytes.len(), conn.address);
        Ok(())
    }

    async fn close(mut conn: Connection<B::Stream>) {
        if let Err(e) = conn.stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", conn.address, e);
        }
    }
}
