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

//! Bluetooth printer module.
//!
//! Discovers bonded devices and manages the RFCOMM connection to one printer.

mod backend;
mod bluez;
mod error;
mod manager;
mod simulated;

pub use backend::{BondedDevice, PrinterBackend, SPP_UUID};
pub use bluez::BluezBackend;
pub use error::{PrinterError, PrinterResult};
pub use manager::{DeviceDescriptor, PrinterManager};
pub use simulated::SimulatedBackend;
