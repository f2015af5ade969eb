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

//! BlueZ backend for RFCOMM printers.

use bluer::rfcomm::{Profile, ProfileHandle, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::{BondedDevice, PrinterBackend, SPP_UUID};
use super::error::{PrinterError, PrinterResult};
use crate::config::BluetoothConfig;

/// Backend talking to the local BlueZ daemon.
pub struct BluezBackend {
    adapter: Adapter,
    rfcomm_channel: Option<u8>,
    /// Client profile used to resolve the SPP channel. Kept registered for
    /// the lifetime of the backend so accepted streams stay valid.
    profile: Mutex<ProfileHandle>,
    _session: Session,
}

impl BluezBackend {
    /// Create a new BlueZ backend.
    pub async fn new(config: &BluetoothConfig) -> PrinterResult<Self> {
        info!("Initializing Bluetooth backend...");

        // Create BlueZ session
        let session = Session::new().await?;
        info!("BlueZ session created");

        let adapter = match &config.adapter {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        info!("Using Bluetooth adapter: {}", adapter.name());

        if config.power_on && !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        let profile = Profile {
            uuid: SPP_UUID,
            name: Some("spp-printer client".to_string()),
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            ..Default::default()
        };
        let profile = session.register_profile(profile).await?;
        info!("SPP client profile registered (UUID: {})", SPP_UUID);

        Ok(Self {
            adapter,
            rfcomm_channel: config.rfcomm_channel,
            profile: Mutex::new(profile),
            _session: session,
        })
    }

    /// Connect straight to a known RFCOMM channel.
    async fn open_channel(&self, address: Address, channel: u8) -> PrinterResult<Stream> {
        debug!("Connecting to {} on RFCOMM channel {}", address, channel);
        Ok(Stream::connect(SocketAddr::new(address, channel)).await?)
    }

    /// Ask BlueZ to connect the SPP profile and wait for the socket it hands back.
    async fn open_profile(&self, address: Address) -> PrinterResult<Stream> {
        let device = self.adapter.device(address)?;
        let mut profile = self.profile.lock().await;

        let connect = device.connect_profile(&SPP_UUID);
        tokio::pin!(connect);
        let mut connect_done = false;

        loop {
            tokio::select! {
                res = &mut connect, if !connect_done => {
                    connect_done = true;
                    res?;
                    debug!("Profile connect to {} acknowledged", address);
                }
                req = profile.next() => {
                    let req = req.ok_or_else(|| PrinterError::DeviceNotFound(address.to_string()))?;
                    if req.device() != address {
                        warn!("Ignoring SPP connection from unexpected device {}", req.device());
                        drop(req);
                        continue;
                    }
                    return Ok(req.accept()?);
                }
            }
        }
    }
}

impl PrinterBackend for BluezBackend {
    type Stream = Stream;

    async fn bonded_devices(&self) -> PrinterResult<Vec<BondedDevice>> {
        let mut devices = Vec::new();

        for address in self.adapter.device_addresses().await? {
            let device = self.adapter.device(address)?;
            if device.is_paired().await? {
                let name = device.name().await.unwrap_or_default();
                devices.push(BondedDevice { address, name });
            }
        }

        Ok(devices)
    }

    async fn open(&self, address: Address) -> PrinterResult<Stream> {
        if !self.adapter.device_addresses().await?.contains(&address) {
            return Err(PrinterError::DeviceNotFound(address.to_string()));
        }

        match self.rfcomm_channel {
            Some(channel) => self.open_channel(address, channel).await,
            None => self.open_profile(address).await,
        }
    }
}
