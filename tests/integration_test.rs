//! Integration tests for the full method channel flow.

use std::sync::Arc;

use bluer::Address;
use serde_json::{json, Value};
use spp_printer::bluetooth::{DeviceDescriptor, PrinterManager, SimulatedBackend};
use spp_printer::channel::{MethodCall, MethodResponse, PrinterChannel, INVALID_BYTES, NO_BYTES, NO_TEXT};
use spp_printer::config::BluetoothConfig;
use spp_printer::permissions::{Capability, PermissionState, StaticPermissions};
use tokio::io::AsyncReadExt;

const FIRST: &str = "00:11:22:33:44:55";
const SECOND: &str = "66:77:88:99:AA:BB";

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn channel(
    state: PermissionState,
) -> (
    PrinterChannel<SimulatedBackend, Arc<StaticPermissions>>,
    Arc<StaticPermissions>,
) {
    let backend = SimulatedBackend::new();
    backend.add_device(addr(FIRST), Some("Kitchen"));
    backend.add_device(addr(SECOND), None);

    let permissions = Arc::new(StaticPermissions::new(state));
    let manager = PrinterManager::new(backend, permissions.clone(), &BluetoothConfig::default());
    (PrinterChannel::new(manager), permissions)
}

fn result(response: MethodResponse) -> Value {
    match response {
        MethodResponse::Result(value) => value,
        other => panic!("expected result, got {:?}", other),
    }
}

fn error_code(response: MethodResponse) -> String {
    match response {
        MethodResponse::Error(err) => err.code,
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_scan_printers() {
    let (channel, _) = channel(PermissionState::all_granted());

    let value = result(channel.handle(&MethodCall::new("scanPrinters")).await);
    let devices: Vec<DeviceDescriptor> = serde_json::from_value(value).unwrap();

    assert_eq!(devices.len(), 2);
    for device in &devices {
        assert!(!device.name.is_empty());
        let parts: Vec<&str> = device.address.split(':').collect();
        assert_eq!(parts.len(), 6);
        assert!(parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit())));
    }
    assert!(devices.iter().any(|d| d.name == "Kitchen" && d.address == FIRST));
    assert!(devices.iter().any(|d| d.name == "Unknown" && d.address == SECOND));
}

#[tokio::test]
async fn test_permission_denied_degrades() {
    let (channel, permissions) = channel(PermissionState {
        bluetooth_connect: false,
        bluetooth_scan: true,
    });

    let devices = result(channel.handle(&MethodCall::new("scanPrinters")).await);
    assert_eq!(devices, json!([]));

    let call = MethodCall::new("connectPrinter").with_arg("address", FIRST);
    assert_eq!(result(channel.handle(&call).await), json!(false));
    assert!(!channel.manager().is_connected());
    assert_eq!(
        permissions.requests(),
        vec![vec![Capability::Connect], vec![Capability::Connect]]
    );

    // The user granted the prompt; the caller retries.
    permissions.grant_all();
    assert_eq!(result(channel.handle(&call).await), json!(true));
}

#[tokio::test]
async fn test_connect_and_print() {
    let (channel, _) = channel(PermissionState::all_granted());

    let call = MethodCall::new("connectPrinter").with_arg("address", FIRST);
    assert_eq!(result(channel.handle(&call).await), json!(true));
    let mut remote = channel.manager().backend().take_remote(addr(FIRST)).unwrap();

    let call = MethodCall::new("printText").with_arg("text", "hello");
    assert_eq!(result(channel.handle(&call).await), Value::Null);

    let call = MethodCall::new("printBytes").with_arg("bytes", json!([0x1b, 0x40]));
    assert_eq!(result(channel.handle(&call).await), json!(true));

    let call = MethodCall::new("printBytes").with_arg("bytes", "AAE=");
    assert_eq!(result(channel.handle(&call).await), json!(true));

    assert_eq!(
        result(channel.handle(&MethodCall::new("disconnectPrinter")).await),
        Value::Null
    );

    let mut received = Vec::new();
    remote.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"hello\n\x1b\x40\x00\x01");
}

#[tokio::test]
async fn test_no_connection_asymmetry() {
    let (channel, _) = channel(PermissionState::all_granted());

    let call = MethodCall::new("printText").with_arg("text", "ignored");
    assert_eq!(result(channel.handle(&call).await), Value::Null);

    let call = MethodCall::new("printBytes").with_arg("bytes", json!([1, 2, 3]));
    assert_eq!(result(channel.handle(&call).await), json!(false));
}

#[tokio::test]
async fn test_reconnect_replaces_connection() {
    let (channel, _) = channel(PermissionState::all_granted());
    let manager = channel.manager();

    assert!(manager.connect(FIRST).await);
    let mut first = manager.backend().take_remote(addr(FIRST)).unwrap();
    assert!(manager.print_bytes(b"one").await);

    assert!(manager.connect(SECOND).await);
    let mut second = manager.backend().take_remote(addr(SECOND)).unwrap();
    assert_eq!(manager.connected_address().as_deref(), Some(SECOND));

    assert!(manager.print_bytes(b"two").await);
    manager.disconnect().await;

    let mut received = Vec::new();
    first.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"one");

    let mut received = Vec::new();
    second.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"two");
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (channel, _) = channel(PermissionState::all_granted());
    let manager = channel.manager();

    manager.disconnect().await;
    assert!(!manager.is_connected());

    assert!(manager.connect(FIRST).await);
    manager.disconnect().await;
    assert!(!manager.is_connected());
    manager.disconnect().await;
    assert!(!manager.is_connected());

    let status = result(channel.handle(&MethodCall::new("printerStatus")).await);
    assert_eq!(status, json!({"status": "disconnected", "address": null}));
}

#[tokio::test]
async fn test_missing_arguments() {
    let (channel, _) = channel(PermissionState::all_granted());

    assert_eq!(error_code(channel.handle(&MethodCall::new("printText")).await), NO_TEXT);
    assert_eq!(
        error_code(channel.handle(&MethodCall::new("printBytes")).await),
        NO_BYTES
    );
    let call = MethodCall::new("printBytes").with_arg("bytes", Value::Null);
    assert_eq!(error_code(channel.handle(&call).await), NO_BYTES);
    let call = MethodCall::new("printBytes").with_arg("bytes", "not base64!");
    assert_eq!(error_code(channel.handle(&call).await), INVALID_BYTES);

    // A missing address is a plain failure, not a named error.
    assert_eq!(
        result(channel.handle(&MethodCall::new("connectPrinter")).await),
        json!(false)
    );
}

#[tokio::test]
async fn test_unknown_and_malformed_calls() {
    let (channel, _) = channel(PermissionState::all_granted());

    assert_eq!(
        channel.handle(&MethodCall::new("feedPaper")).await,
        MethodResponse::NotImplemented("feedPaper".to_string())
    );
    assert_eq!(
        error_code(channel.handle_line("{\"method\":").await),
        "BAD_CALL"
    );

    let response = channel
        .handle_line(r#"{"method":"connectPrinter","args":{"address":"00:11:22:33:44:55"}}"#)
        .await;
    assert_eq!(result(response), json!(true));
}
