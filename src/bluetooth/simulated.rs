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

//! In-memory backend with simulated printers.
//!
//! Every successful `open` creates a duplex pipe. The printer side is kept
//! until a test takes it with [`SimulatedBackend::take_remote`] and reads
//! what the manager wrote.

use bluer::Address;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::io::DuplexStream;

use super::backend::{BondedDevice, PrinterBackend};
use super::error::{PrinterError, PrinterResult};

/// Pipe capacity of a simulated link.
const LINK_BUFFER: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct SimulatedDevice {
    address: Address,
    name: Option<String>,
    reachable: bool,
    responsive: bool,
}

/// Backend serving a fixed set of bonded devices from memory.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    devices: Mutex<Vec<SimulatedDevice>>,
    remotes: Mutex<HashMap<Address, DuplexStream>>,
    open_count: Mutex<usize>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bonded, reachable device.
    pub fn add_device(&self, address: Address, name: Option<&str>) {
        self.devices.lock().push(SimulatedDevice {
            address,
            name: name.map(str::to_string),
            reachable: true,
            responsive: true,
        });
    }

    /// Make a device refuse (or accept again) connection attempts.
    pub fn set_reachable(&self, address: Address, reachable: bool) {
        if let Some(device) = self
            .devices
            .lock()
            .iter_mut()
            .find(|d| d.address == address)
        {
            device.reachable = reachable;
        }
    }

    /// Make connection attempts to a device hang forever (or stop hanging).
    pub fn set_responsive(&self, address: Address, responsive: bool) {
        if let Some(device) = self
            .devices
            .lock()
            .iter_mut()
            .find(|d| d.address == address)
        {
            device.responsive = responsive;
        }
    }

    /// Take the printer side of the most recent link to `address`.
    pub fn take_remote(&self, address: Address) -> Option<DuplexStream> {
        self.remotes.lock().remove(&address)
    }

    /// Number of links opened so far.
    pub fn open_count(&self) -> usize {
        *self.open_count.lock()
    }
}

impl PrinterBackend for SimulatedBackend {
    type Stream = DuplexStream;

    async fn bonded_devices(&self) -> PrinterResult<Vec<BondedDevice>> {
        Ok(self
            .devices
            .lock()
            .iter()
            .map(|d| BondedDevice {
                address: d.address,
                name: d.name.clone(),
            })
            .collect())
    }

    async fn open(&self, address: Address) -> PrinterResult<DuplexStream> {
        let (reachable, responsive) = self
            .devices
            .lock()
            .iter()
            .find(|d| d.address == address)
            .map(|d| (d.reachable, d.responsive))
            .ok_or_else(|| PrinterError::DeviceNotFound(address.to_string()))?;

        if !responsive {
            std::future::pending::<()>().await;
        }

        if !reachable {
            return Err(PrinterError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (local, remote) = tokio::io::duplex(LINK_BUFFER);
        self.remotes.lock().insert(address, remote);
        *self.open_count.lock() += 1;
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn addr(last: u8) -> Address {
        Address::new([0x00, 0x11, 0x22, 0x33, 0x44, last])
    }

    #[tokio::test]
    async fn test_bonded_devices_in_insertion_order() {
        let backend = SimulatedBackend::new();
        backend.add_device(addr(2), Some("Second"));
        backend.add_device(addr(1), None);

        let devices = backend.bonded_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address, addr(2));
        assert_eq!(devices[0].name.as_deref(), Some("Second"));
        assert_eq!(devices[1].name, None);
    }

    #[tokio::test]
    async fn test_open_links_to_remote() {
        let backend = SimulatedBackend::new();
        backend.add_device(addr(1), Some("Printer"));

        let mut local = backend.open(addr(1)).await.unwrap();
        let mut remote = backend.take_remote(addr(1)).unwrap();
        local.write_all(b"abc").await.unwrap();
        drop(local);

        let mut received = Vec::new();
        remote.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"abc");
        assert_eq!(backend.open_count(), 1);
    }

    #[tokio::test]
    async fn test_open_unknown_or_unreachable() {
        let backend = SimulatedBackend::new();
        backend.add_device(addr(1), None);
        backend.set_reachable(addr(1), false);

        assert!(matches!(
            backend.open(addr(9)).await,
            Err(PrinterError::DeviceNotFound(_))
        ));
        assert!(matches!(backend.open(addr(1)).await, Err(PrinterError::Io(_))));
        assert_eq!(backend.open_count(), 0);
    }
}
