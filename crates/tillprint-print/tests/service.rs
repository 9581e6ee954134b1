// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests for PrinterService: queue ordering, requeue, connect
// validation, failure isolation and lock sequencing.

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tillprint_core::audit::AuditSink;
use tillprint_core::config::ServiceConfig;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{
    ConnectParams, ConnectionMode, ErrorCode, JobEvent, JobId, JobOutcome, JobPayload,
};
use tillprint_print::{DeviceEvent, PrinterService};
use tokio::sync::broadcast;

fn params(value: Value) -> ConnectParams {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn config() -> ServiceConfig {
    ServiceConfig {
        probe_timeout_ms: 500,
        ..ServiceConfig::default()
    }
}

async fn dummy_service(latency_ms: u64) -> PrinterService {
    let service = PrinterService::start(&config(), None);
    let report = service
        .connect("dummy", &params(json!({"latency_ms": latency_ms})))
        .await;
    assert!(report.is_ok(), "{report:?}");
    service
}

async fn next_event(rx: &mut broadcast::Receiver<JobEvent>) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for job event")
        .expect("event channel closed")
}

fn text(s: &str) -> JobPayload {
    JobPayload::Text {
        text: s.into(),
        lang: "tr".into(),
    }
}

#[derive(Default)]
struct RecordingAudit {
    records: Mutex<Vec<(String, Value, Value)>>,
}

impl AuditSink for RecordingAudit {
    fn record(&self, kind: &str, payload: &Value, metadata: &Value) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((kind.to_owned(), payload.clone(), metadata.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fresh_service_is_disconnected() {
    let service = PrinterService::start(&config(), None);
    let status = service.status();
    assert_eq!(status.mode, ConnectionMode::None);
    assert!(!status.connected);
    assert_eq!(status.queue_size, 0);
    service.shutdown().await;
}

#[tokio::test]
async fn dummy_connect_reports_connected() {
    let service = PrinterService::start(&config(), None);
    let report = service.connect("dummy", &ConnectParams::new()).await;
    assert!(report.is_ok());
    assert_eq!(report.mode, "dummy");

    let status = service.status();
    assert_eq!(status.mode, ConnectionMode::Dummy);
    assert!(status.connected);
    service.shutdown().await;
}

#[tokio::test]
async fn bad_usb_hex_keeps_previous_connection() {
    let service = dummy_service(0).await;
    let report = service
        .connect(
            "usb",
            &params(json!({"vendor_id": "0xZZZZ", "product_id": "0x0202"})),
        )
        .await;
    assert!(!report.is_ok());
    assert_eq!(report.error, Some(ErrorCode::BadCredentials));
    assert_eq!(report.mode, "usb");

    let status = service.status();
    assert_eq!(status.mode, ConnectionMode::Dummy);
    assert!(status.connected);
    service.shutdown().await;
}

#[tokio::test]
async fn bad_usb_hex_without_prior_connection_stays_disconnected() {
    let service = PrinterService::start(&config(), None);
    let report = service
        .connect(
            "usb",
            &params(json!({"vendor_id": "0xZZZZ", "product_id": "0x0202"})),
        )
        .await;
    assert_eq!(report.error, Some(ErrorCode::BadCredentials));
    assert!(!service.status().connected);
    service.shutdown().await;
}

#[tokio::test]
async fn invalid_mode_is_reported() {
    let service = PrinterService::start(&config(), None);
    let report = service.connect("bluetooth", &ConnectParams::new()).await;
    assert_eq!(report.error, Some(ErrorCode::InvalidMode));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], "INVALID_MODE");
    service.shutdown().await;
}

#[cfg(feature = "usb")]
#[tokio::test]
async fn unreachable_usb_device_records_mode() {
    let service = dummy_service(0).await;
    let report = service
        .connect("usb", &params(json!({"vendor_id": 0x04b8, "product_id": 0x0202})))
        .await;
    assert_eq!(report.error, Some(ErrorCode::DeviceOpenFailed));

    let status = service.status();
    assert_eq!(status.mode, ConnectionMode::Usb);
    assert!(!status.connected);
    service.shutdown().await;
}

#[cfg(not(feature = "usb"))]
#[tokio::test]
async fn usb_without_support_is_unavailable() {
    let service = dummy_service(0).await;
    let report = service
        .connect("usb", &params(json!({"vendor_id": 0x04b8, "product_id": 0x0202})))
        .await;
    assert_eq!(report.error, Some(ErrorCode::BackendUnavailable));
    assert!(service.status().connected);
    service.shutdown().await;
}

#[tokio::test]
async fn lan_connect_reports_host_and_port() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        for conn in listener.incoming().flatten() {
            std::mem::forget(conn);
        }
    });

    let service = PrinterService::start(&config(), None);
    let report = service
        .connect("lan", &params(json!({"host": "127.0.0.1", "port": port.to_string()})))
        .await;
    assert!(report.is_ok(), "{report:?}");
    assert_eq!(report.info["host"], "127.0.0.1");
    assert_eq!(report.info["port"], port);
    assert_eq!(service.status().mode, ConnectionMode::Lan);
    service.shutdown().await;
}

#[tokio::test]
async fn switching_device_reports_disconnected_until_open() {
    // A listener that never accepts, with its backlog full, so the next
    // connect hangs in the handshake.
    let socket = tokio::net::TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();
    let mut backlog = Vec::new();
    for _ in 0..8 {
        if let Ok(conn) = std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            backlog.push(conn);
        }
    }

    let service = dummy_service(0).await;
    let switching = {
        let service = service.clone();
        let lan = params(json!({"host": "127.0.0.1", "port": addr.port(), "timeout_ms": 2000}));
        tokio::spawn(async move { service.connect("lan", &lan).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(service.journal().events().contains(&DeviceEvent::Closed {
        mode: ConnectionMode::Dummy
    }));
    let status = service.status();
    assert_eq!(status.mode, ConnectionMode::Lan);
    assert!(!status.connected);
    assert!(matches!(
        service.enqueue_text("lost?", "tr").await,
        Err(TillprintError::NotConnected)
    ));

    let report = switching.await.unwrap();
    assert_eq!(report.error, Some(ErrorCode::DeviceOpenFailed));
    assert!(service.registry().is_empty());
    drop(backlog);
    drop(listener);
    service.shutdown().await;
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enqueue_while_disconnected_is_rejected() {
    let service = PrinterService::start(&config(), None);
    let err = service.enqueue_text("Merhaba", "tr").await.unwrap_err();
    assert!(matches!(err, TillprintError::NotConnected));
    let err = service.enqueue_image("/tmp/logo.png").await.unwrap_err();
    assert!(matches!(err, TillprintError::NotConnected));

    assert_eq!(service.status().queue_size, 0);
    assert!(service.registry().is_empty());
    service.shutdown().await;
}

#[tokio::test]
async fn jobs_print_in_submission_order() {
    let service = dummy_service(0).await;
    let mut events = service.subscribe();

    let mut ids = Vec::new();
    for i in 0..20 {
        ids.push(service.enqueue_text(format!("receipt {i}"), "tr").await.unwrap());
    }

    let mut printed = Vec::new();
    for _ in 0..20 {
        printed.push(next_event(&mut events).await.job_id);
    }
    assert_eq!(printed, ids);
    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_keep_their_own_order() {
    let service = dummy_service(0).await;
    let mut events = service.subscribe();

    let mut producers = Vec::new();
    for p in 0..4 {
        let service = service.clone();
        producers.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..10 {
                ids.push(service.enqueue_text(format!("{p}-{i}"), "en").await.unwrap());
            }
            ids
        }));
    }
    let mut per_producer = Vec::new();
    for handle in producers {
        per_producer.push(handle.await.unwrap());
    }

    let mut printed = Vec::new();
    for _ in 0..40 {
        printed.push(next_event(&mut events).await.job_id);
    }
    for ids in per_producer {
        let positions: Vec<usize> = ids
            .iter()
            .map(|id| printed.iter().position(|p| p == id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
    service.shutdown().await;
}

#[tokio::test]
async fn every_id_is_unique() {
    let service = dummy_service(0).await;
    let mut seen = std::collections::HashSet::new();
    let first = service.enqueue_text("a", "tr").await.unwrap();
    seen.insert(first);
    for _ in 0..10 {
        assert!(seen.insert(service.enqueue_text("a", "tr").await.unwrap()));
        assert!(seen.insert(service.requeue_job(&first).await.unwrap()));
    }
    service.shutdown().await;
}

// ---------------------------------------------------------------------------
// Requeue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requeue_unknown_id_has_no_effect() {
    let service = dummy_service(200).await;
    let before = service.status().queue_size;
    assert!(!service.requeue(&JobId::new()).await);
    assert_eq!(service.status().queue_size, before);
    assert!(service.registry().is_empty());
    service.shutdown().await;
}

#[tokio::test]
async fn requeue_copies_payload_under_new_id() {
    let service = dummy_service(0).await;
    let mut events = service.subscribe();

    let original = service.enqueue_text("Şişli şube", "tr").await.unwrap();
    assert_eq!(next_event(&mut events).await.job_id, original);

    let copy = service.requeue_job(&original).await.unwrap();
    assert_ne!(copy, original);
    assert_eq!(next_event(&mut events).await.job_id, copy);

    let registry = service.registry();
    assert_eq!(
        registry.get(&copy).unwrap().payload,
        registry.get(&original).unwrap().payload
    );
    service.shutdown().await;
}

#[tokio::test]
async fn requeue_goes_behind_pending_jobs() {
    let service = dummy_service(50).await;
    let mut events = service.subscribe();

    let a = service.enqueue_text("A", "tr").await.unwrap();
    let b = service.enqueue_text("B", "tr").await.unwrap();
    let again = service.requeue_job(&a).await.unwrap();

    let mut printed = Vec::new();
    for _ in 0..3 {
        let event = next_event(&mut events).await;
        assert!(matches!(event.outcome, JobOutcome::Completed { .. }));
        printed.push(event.job_id);
    }
    assert_eq!(printed, vec![a, b, again]);
    service.shutdown().await;
}

#[tokio::test]
async fn requeue_while_disconnected_fails_at_print_time() {
    let service = dummy_service(0).await;
    let mut events = service.subscribe();
    let original = service.enqueue_text("x", "tr").await.unwrap();
    next_event(&mut events).await;

    // A LAN attempt against a closed port tears the dummy down.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let report = service
        .connect("lan", &params(json!({"host": "127.0.0.1", "port": port})))
        .await;
    assert_eq!(report.error, Some(ErrorCode::DeviceOpenFailed));
    assert!(!service.status().connected);

    let copy = service.requeue_job(&original).await.unwrap();
    let event = next_event(&mut events).await;
    assert_eq!(event.job_id, copy);
    match event.outcome {
        JobOutcome::Failed { code, .. } => assert_eq!(code, ErrorCode::NotConnected),
        other => panic!("expected failure, got {other:?}"),
    }
    service.shutdown().await;
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_job_does_not_block_the_next() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let reader = std::thread::spawn(move || {
        let (_probe, _) = listener.accept().unwrap();
        let (mut conn, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        conn.read_to_end(&mut buf).unwrap();
        buf
    });

    let service = PrinterService::start(&config(), None);
    let report = service
        .connect("lan", &params(json!({"host": "127.0.0.1", "port": port})))
        .await;
    assert!(report.is_ok(), "{report:?}");
    let mut events = service.subscribe();

    let a = service.enqueue_image("/nonexistent/logo.png").await.unwrap();
    let b = service.enqueue_text("TOPLAM 12,50", "tr").await.unwrap();

    let first = next_event(&mut events).await;
    assert_eq!(first.job_id, a);
    assert!(matches!(
        first.outcome,
        JobOutcome::Failed {
            code: ErrorCode::Image,
            ..
        }
    ));
    let second = next_event(&mut events).await;
    assert_eq!(second.job_id, b);
    assert!(matches!(second.outcome, JobOutcome::Completed { .. }));

    service.shutdown().await;
    let received = reader.join().unwrap();
    assert!(received.starts_with(b"TOPLAM 12,50\n"));
}

// ---------------------------------------------------------------------------
// Lock sequencing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_never_interleaves_with_a_print() {
    let service = dummy_service(30).await;
    let mut events = service.subscribe();

    for i in 0..4 {
        service.enqueue_text(format!("job {i}"), "tr").await.unwrap();
    }
    // Reconnect while prints are in flight.
    let slow = params(json!({"latency_ms": 30}));
    let (r1, r2) = tokio::join!(service.connect("dummy", &slow), service.connect("dummy", &slow));
    assert!(r1.is_ok() && r2.is_ok());
    for _ in 0..4 {
        assert!(matches!(next_event(&mut events).await.outcome, JobOutcome::Completed { .. }));
    }

    let mut in_print = None;
    for event in service.journal().events() {
        match event {
            DeviceEvent::PrintStarted { job_id } => {
                assert!(in_print.is_none(), "nested print");
                in_print = Some(job_id);
            }
            DeviceEvent::PrintFinished { job_id, .. } => {
                assert_eq!(in_print.take(), Some(job_id));
            }
            DeviceEvent::Opened { .. } | DeviceEvent::Closed { .. } => {
                assert!(in_print.is_none(), "device switched mid-print");
            }
            DeviceEvent::Simulated { .. } => assert!(in_print.is_some()),
        }
    }
    service.shutdown().await;
}

// ---------------------------------------------------------------------------
// Audit and shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accepted_jobs_are_audited() {
    let audit = Arc::new(RecordingAudit::default());
    let service = PrinterService::start(&config(), Some(audit.clone()));
    service.connect("dummy", &ConnectParams::new()).await;

    let id = service.enqueue(text("Fiş"), serde_json::Map::new()).await.unwrap();
    let copy = service.requeue_job(&id).await.unwrap();

    let records = audit.records.lock().unwrap().clone();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, "text");
    assert_eq!(records[0].1["text"], "Fiş");
    assert_eq!(records[0].2["queue_job_id"], id.to_string());
    assert_eq!(records[1].2["queue_job_id"], copy.to_string());
    assert_eq!(records[1].2["requeue_of"], id.to_string());
    service.shutdown().await;
}

#[tokio::test]
async fn rejected_jobs_are_not_audited() {
    let audit = Arc::new(RecordingAudit::default());
    let service = PrinterService::start(&config(), Some(audit.clone()));
    assert!(service.enqueue_text("x", "tr").await.is_err());
    assert!(audit.records.lock().unwrap().is_empty());
    service.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_everything() {
    let service = dummy_service(0).await;
    let mut events = service.subscribe();
    let id = service.enqueue_text("last one", "tr").await.unwrap();
    next_event(&mut events).await;

    service.shutdown().await;
    service.shutdown().await;

    assert!(!service.status().connected);
    assert!(matches!(
        service.enqueue_text("too late", "tr").await,
        Err(TillprintError::NotConnected)
    ));
    assert!(!service.requeue(&id).await);
    assert!(service.journal().events().contains(&DeviceEvent::Closed {
        mode: ConnectionMode::Dummy
    }));
}

#[tokio::test]
async fn shutdown_lets_in_flight_job_finish() {
    let service = dummy_service(100).await;
    let mut events = service.subscribe();
    let id = service.enqueue_text("slow", "tr").await.unwrap();
    // Let the worker pick it up.
    tokio::time::sleep(Duration::from_millis(20)).await;

    service.shutdown().await;
    let event = next_event(&mut events).await;
    assert_eq!(event.job_id, id);
    assert!(matches!(event.outcome, JobOutcome::Completed { .. }));
}
