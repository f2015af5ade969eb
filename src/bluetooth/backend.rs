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

//! Radio abstraction used by the printer manager.

use bluer::Address;
use std::future::Future;
use tokio::io::AsyncWrite;
use uuid::Uuid;

use super::error::PrinterResult;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// A device the operating system has already paired with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondedDevice {
    pub address: Address,
    /// Name reported by the device, if any.
    pub name: Option<String>,
}

/// Trait for Bluetooth backends.
///
/// Implementations only enumerate bonded devices; they never run a live
/// inquiry scan.
pub trait PrinterBackend: Send + Sync {
    /// Writable stream of an open serial port connection.
    type Stream: AsyncWrite + Unpin + Send;

    /// Get the bonded devices, in whatever order the platform reports them.
    fn bonded_devices(&self) -> impl Future<Output = PrinterResult<Vec<BondedDevice>>> + Send;

    /// Open a serial port profile channel to the device.
    ///
    /// Resolves once the remote side accepted the connection.
    fn open(&self, address: Address) -> impl Future<Output = PrinterResult<Self::Stream>> + Send;
}
