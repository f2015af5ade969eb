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

//! Typed failures of printer operations.
//!
//! The boundary API only exposes booleans and empty lists; these variants
//! exist so failures can be logged with their cause before being flattened.

use std::time::Duration;
use thiserror::Error;

/// Result alias for printer operations.
pub type PrinterResult<T> = std::result::Result<T, PrinterError>;

/// Error type for discovery, connection and transmission.
#[derive(Error, Debug)]
pub enum PrinterError {
    #[error("bluetooth permissions not granted")]
    PermissionDenied,

    #[error("invalid bluetooth address: {0}")]
    InvalidAddress(String),

    #[error("no printer connected")]
    NotConnected,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),
}

impl PrinterError {
    /// Whether the failure came from the radio or the stream rather than
    /// from the caller or the permission state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound(_) | Self::Timeout(_) | Self::Io(_) | Self::Bluetooth(_)
        )
    }
}
