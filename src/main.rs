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

//! SPP printer host.
//!
//! Reads one method call per line on stdin and answers on stdout.

use anyhow::Result;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spp_printer::bluetooth::{BluezBackend, PrinterManager};
use spp_printer::channel::PrinterChannel;
use spp_printer::config::Config;
use spp_printer::permissions::ImplicitPermissions;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries responses
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spp_printer=info")),
        )
        .init();

    info!("Starting SPP printer host v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    let backend = BluezBackend::new(&config.bluetooth).await?;
    let manager = PrinterManager::new(backend, ImplicitPermissions, &config.bluetooth);
    let channel = PrinterChannel::new(manager);

    info!("Ready. Waiting for method calls.");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    let result = channel
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
        .await;
    if let Err(e) = &result {
        error!("Method channel failed: {}", e);
    }

    info!("SPP printer host stopped");
    result
}
