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

//! Method channel exposing the printer manager to a host.
//!
//! Calls are named methods with a map of loosely-typed arguments. Only a
//! missing or undecodable argument produces a named error; transport
//! problems always come back as `false` or an empty list.

use anyhow::Result;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::bluetooth::{PrinterBackend, PrinterManager};
use crate::permissions::PermissionProvider;

/// Error code for a `printText` call without text.
pub const NO_TEXT: &str = "NO_TEXT";
/// Error code for a `printBytes` call without bytes.
pub const NO_BYTES: &str = "NO_BYTES";
/// Error code for a `printBytes` payload that is neither a byte array nor base64.
pub const INVALID_BYTES: &str = "INVALID_BYTES";
/// Error code for a line that is not a method call.
pub const BAD_CALL: &str = "BAD_CALL";

/// Method names understood by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ScanPrinters,
    ConnectPrinter,
    PrintText,
    PrintBytes,
    DisconnectPrinter,
    PrinterStatus,
}

impl Method {
    /// Parse from method name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scanPrinters" => Some(Self::ScanPrinters),
            "connectPrinter" => Some(Self::ConnectPrinter),
            "printText" => Some(Self::PrintText),
            "printBytes" => Some(Self::PrintBytes),
            "disconnectPrinter" => Some(Self::DisconnectPrinter),
            "printerStatus" => Some(Self::PrinterStatus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScanPrinters => "scanPrinters",
            Self::ConnectPrinter => "connectPrinter",
            Self::PrintText => "printText",
            Self::PrintBytes => "printBytes",
            Self::DisconnectPrinter => "disconnectPrinter",
            Self::PrinterStatus => "printerStatus",
        }
    }
}

/// An incoming method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json.trim())?)
    }

    /// String argument; absent and `null` are the same.
    fn string_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// Named error returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodError {
    pub code: String,
    pub message: String,
}

/// Outcome of a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodResponse {
    Result(Value),
    Error(MethodError),
    NotImplemented(String),
}

impl MethodResponse {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error(MethodError {
            code: code.to_string(),
            message: message.into(),
        })
    }

    /// Serialize to a JSON line.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Byte payload as it may arrive from a JSON caller.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytesArg {
    Raw(Vec<u8>),
    Base64(String),
}

impl BytesArg {
    fn decode(self) -> Option<Vec<u8>> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Base64(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .ok(),
        }
    }
}

/// Dispatcher from method calls to a [`PrinterManager`].
pub struct PrinterChannel<B: PrinterBackend, P> {
    manager: PrinterManager<B, P>,
}

impl<B: PrinterBackend, P: PermissionProvider> PrinterChannel<B, P> {
    pub fn new(manager: PrinterManager<B, P>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &PrinterManager<B, P> {
        &self.manager
    }

    /// Handle one method call.
    pub async fn handle(&self, call: &MethodCall) -> MethodResponse {
        let Some(method) = Method::parse(&call.method) else {
            warn!("Unknown method: {}", call.method);
            return MethodResponse::NotImplemented(call.method.clone());
        };
        debug!("Handling {}", method.as_str());

        match method {
            Method::ScanPrinters => {
                let devices = self.manager.discover().await;
                MethodResponse::Result(serde_json::to_value(devices).unwrap_or_default())
            }
            Method::ConnectPrinter => match call.string_arg("address") {
                Some(address) => MethodResponse::Result(self.manager.connect(address).await.into()),
                None => MethodResponse::Result(false.into()),
            },
            Method::PrintText => match call.string_arg("text") {
                Some(text) => {
                    self.manager.print_text(text).await;
                    MethodResponse::Result(Value::Null)
                }
                None => MethodResponse::error(NO_TEXT, "Text is null"),
            },
            Method::PrintBytes => {
                let arg = match call.args.get("bytes") {
                    None | Some(Value::Null) => {
                        return MethodResponse::error(NO_BYTES, "Bytes are null")
                    }
                    Some(value) => value.clone(),
                };
                let Some(bytes) = serde_json::from_value::<BytesArg>(arg)
                    .ok()
                    .and_then(BytesArg::decode)
                else {
                    return MethodResponse::error(
                        INVALID_BYTES,
                        "Bytes must be a byte array or base64 string",
                    );
                };
                MethodResponse::Result(self.manager.print_bytes(&bytes).await.into())
            }
            Method::DisconnectPrinter => {
                self.manager.disconnect().await;
                MethodResponse::Result(Value::Null)
            }
            Method::PrinterStatus => {
                MethodResponse::Result(serde_json::to_value(self.manager.status()).unwrap_or_default())
            }
        }
    }

    /// Answer method calls read line by line from `reader` until the input
    /// closes or `shutdown` resolves.
    ///
    /// A call still in flight when `shutdown` resolves is abandoned. The
    /// printer is disconnected on every exit path, including write errors.
    pub async fn serve<R, W, S>(&self, reader: R, mut writer: W, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let result = self.serve_lines(reader, &mut writer, shutdown).await;
        self.manager.disconnect().await;
        result
    }

    async fn serve_lines<R, W, S>(&self, reader: R, writer: &mut W, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => line,
                    None => {
                        info!("Input closed");
                        return Ok(());
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(());
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let response = tokio::select! {
                response = self.handle_line(&line) => response,
                _ = &mut shutdown => {
                    info!("Shutdown requested, abandoning call in flight");
                    return Ok(());
                }
            };
            writer.write_all(response.to_json()?.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    /// Handle one JSON line, answering malformed input with [`BAD_CALL`].
    pub async fn handle_line(&self, line: &str) -> MethodResponse {
        match MethodCall::from_json(line) {
            Ok(call) => self.handle(&call).await,
            Err(e) => {
                warn!("Malformed method call: {}", e);
                MethodResponse::error(BAD_CALL, e.to_string())
            }
        }
    }
}
