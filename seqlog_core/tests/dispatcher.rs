mod common;

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{refused_endpoint, RecordingSink};
use mockito::{Matcher, Server};
use seqlog_core::{Dispatcher, FallbackSink, Options, OverflowPolicy};
use tracing::Level;

const RECORD: &[u8] = b"{\"@t\":\"2024-01-15T10:30:00.000000000Z\",\"@l\":\"info\",\"@mt\":\"hello\"}\n";

#[test]
fn accepted_record_emits_no_diagnostic() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .match_header("content-type", "application/vnd.serilog.clef")
        .match_header("x-seq-apikey", "s3cret")
        .match_body(Matcher::Exact(String::from_utf8(RECORD.to_vec()).unwrap()))
        .with_status(201)
        .create();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&format!("{}/", server.url()), Some("s3cret")).unwrap();
    dispatcher.set_fallback(sink.clone());

    assert_eq!(dispatcher.write(RECORD).unwrap(), RECORD.len());
    dispatcher.wait();

    mock.assert();
    assert!(sink.reports().is_empty());
    assert_eq!(dispatcher.in_flight(), 0);
}

#[test]
fn empty_token_sends_no_api_key_header() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .match_header("x-seq-apikey", Matcher::Missing)
        .with_status(201)
        .create();

    let dispatcher = Dispatcher::new(&server.url(), Some("")).unwrap();
    dispatcher.write(RECORD).unwrap();
    dispatcher.wait();

    mock.assert();
}

/**
 * The caller may overwrite its buffer right after `write` returns; the
 * queued request must still carry the original bytes.
 */
#[test]
fn payload_is_copied_before_write_returns() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .match_body("{\"@mt\":\"original\"}\n")
        .with_status(201)
        .create();

    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();

    let mut buffer = b"{\"@mt\":\"original\"}\n".to_vec();
    dispatcher.write(&buffer).unwrap();
    buffer.fill(b'x');

    dispatcher.wait();
    mock.assert();
}

#[test]
fn concurrent_writes_are_all_delivered_before_wait_returns() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .with_status(201)
        .expect(100)
        .create();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();
    dispatcher.set_fallback(sink.clone());

    let producers: Vec<_> = (0..10)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    assert_eq!(dispatcher.write(RECORD).unwrap(), RECORD.len());
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    dispatcher.wait();

    mock.assert();
    assert!(sink.reports().is_empty());
}

#[test]
fn rejected_record_reports_seq_error() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Error":"bad format"}"#)
        .create();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();
    dispatcher.set_fallback(sink.clone());

    assert_eq!(dispatcher.write(RECORD).unwrap(), RECORD.len());
    dispatcher.wait();
    mock.assert();

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    assert_eq!(report.level, Level::ERROR);
    assert_eq!(report.message, "Seq error");
    assert_eq!(report.field("error-message"), Some("bad format"));
    assert_eq!(report.field("raw-content"), Some(r#"{"Error":"bad format"}"#));
    assert_eq!(report.field("content-type"), Some("application/json"));
    assert_eq!(report.field("status-code"), Some("500"));
}

#[test]
fn rejection_without_error_field_reports_empty_message() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/events/raw")
        .with_status(400)
        .with_header("content-type", "text/plain")
        .with_body("payload too large")
        .create();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();
    dispatcher.set_fallback(sink.clone());

    dispatcher.write(RECORD).unwrap();
    dispatcher.wait();

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].field("error-message"), Some(""));
    assert_eq!(reports[0].field("raw-content"), Some("payload too large"));
    assert_eq!(reports[0].field("content-type"), Some("text/plain"));
}

#[test]
fn rejection_without_sink_is_silent_and_drains() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .with_status(500)
        .with_body(r#"{"Error":"bad format"}"#)
        .expect(3)
        .create();

    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();
    for _ in 0..3 {
        assert_eq!(dispatcher.write(RECORD).unwrap(), RECORD.len());
    }

    assert!(dispatcher.wait_timeout(Duration::from_secs(10)));
    mock.assert();
    assert!(dispatcher.fallback().is_none());
}

/// Reads one HTTP request (head and `Content-Length` body) off the stream.
fn read_request(stream: &mut TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&chunk[..n]);

        let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if request.len() >= end + 4 + length {
            return;
        }
    }
}

#[test]
fn truncated_body_reports_read_failure_with_status() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        stream
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
                  Content-Type: application/json\r\n\
                  Content-Length: 100\r\n\r\n\
                  {\"Error\":",
            )
            .unwrap();
        // Dropping the stream closes the connection mid-body.
    });

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&endpoint, None).unwrap();
    dispatcher.set_fallback(sink.clone());

    dispatcher.write(RECORD).unwrap();
    dispatcher.wait();
    server.join().unwrap();

    let reports = sink.reports();
    assert_eq!(reports.len(), 1, "{reports:?}");
    assert_eq!(reports[0].level, Level::ERROR);
    assert_eq!(reports[0].message, "Failed reading Seq response body");
    let error = reports[0].field("error").unwrap();
    assert!(error.starts_with("status code 500: "), "{error}");
    assert_eq!(dispatcher.in_flight(), 0);
}

/// Panics when asked to report a rejection, records everything else.
struct PanickingSink {
    recorded: Arc<RecordingSink>,
}

impl FallbackSink for PanickingSink {
    fn report(&self, level: Level, message: &str, fields: &[(&str, String)]) {
        if message == "Seq error" {
            panic!("sink failed while reporting");
        }
        self.recorded.report(level, message, fields);
    }
}

#[test]
fn worker_panic_is_reported_before_wait_returns() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/events/raw")
        .with_status(500)
        .with_body(r#"{"Error":"bad format"}"#)
        .expect(2)
        .create();

    let recorded = RecordingSink::new();
    let dispatcher = Dispatcher::with_options(
        &server.url(),
        None,
        Options {
            workers: 1,
            fallback: Some(Arc::new(PanickingSink {
                recorded: recorded.clone(),
            })),
            ..Default::default()
        },
    )
    .unwrap();

    dispatcher.write(RECORD).unwrap();
    dispatcher.wait();

    let reports = recorded.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].message,
        "Seq delivery worker panicked while sending a record"
    );

    // The single worker survived and keeps delivering.
    dispatcher.write(RECORD).unwrap();
    dispatcher.wait();
    assert_eq!(recorded.reports().len(), 2);
    assert_eq!(dispatcher.in_flight(), 0);
}

#[test]
fn network_failure_reports_transport_error() {
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&refused_endpoint(), None).unwrap();
    dispatcher.set_fallback(sink.clone());

    assert_eq!(dispatcher.write(RECORD).unwrap(), RECORD.len());
    dispatcher.wait();

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message, "Failed doing Seq request or reading response");
    assert!(reports[0].field("error").is_some_and(|error| !error.is_empty()));
}

#[test]
fn network_failure_without_sink_still_drains() {
    let dispatcher = Dispatcher::new(&refused_endpoint(), None).unwrap();

    for _ in 0..5 {
        dispatcher.write(RECORD).unwrap();
    }

    assert!(dispatcher.wait_timeout(Duration::from_secs(10)));
    assert_eq!(dispatcher.in_flight(), 0);
}

/**
 * A server that accepts connections but never answers keeps the single
 * worker busy, so a burst of writes overflows the one-slot queue.
 */
#[test]
fn full_queue_drops_records_and_reports_them() {
    let stalled = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", stalled.local_addr().unwrap());

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::with_options(
        &endpoint,
        None,
        Options {
            workers: 1,
            queue_capacity: 1,
            request_timeout: Some(Duration::from_millis(500)),
            fallback: Some(sink.clone()),
            ..Default::default()
        },
    )
    .unwrap();

    for _ in 0..3 {
        assert_eq!(dispatcher.write(RECORD).unwrap(), RECORD.len());
    }
    dispatcher.wait();

    let reports = sink.reports();
    let dropped = reports
        .iter()
        .filter(|report| report.message == "Seq queue is full, dropping record")
        .count();
    let failed = reports.len() - dropped;

    assert!(dropped >= 1);
    assert_eq!(dropped + failed, 3);
    assert!(reports.iter().all(|report| report.level == Level::ERROR));
    assert_eq!(dispatcher.in_flight(), 0);
}

#[test]
fn block_policy_delivers_every_record() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .with_status(201)
        .expect(20)
        .create();

    let dispatcher = Dispatcher::with_options(
        &server.url(),
        None,
        Options {
            workers: 1,
            queue_capacity: 1,
            overflow: OverflowPolicy::Block,
            ..Default::default()
        },
    )
    .unwrap();

    for _ in 0..20 {
        dispatcher.write(RECORD).unwrap();
    }
    dispatcher.wait();

    mock.assert();
}

#[test]
fn fallback_can_be_enabled_while_writes_are_in_flight() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/events/raw")
        .with_status(503)
        .with_body(r#"{"Error":"unavailable"}"#)
        .expect_at_least(1)
        .create();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();

    let writer = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            for _ in 0..50 {
                dispatcher.write(RECORD).unwrap();
            }
        })
    };
    dispatcher.set_fallback(sink.clone());
    writer.join().unwrap();
    dispatcher.wait();

    dispatcher.disable_fallback_logs();
    dispatcher.write(RECORD).unwrap();
    dispatcher.wait();

    let reports = sink.reports();
    assert!(reports.len() <= 50);
    assert!(reports
        .iter()
        .all(|report| report.field("error-message") == Some("unavailable")));
}

#[test]
fn drain_guard_waits_on_drop() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/events/raw")
        .with_status(201)
        .expect(5)
        .create();

    let dispatcher = Dispatcher::new(&server.url(), None).unwrap();
    {
        let _guard = dispatcher.guard();
        for _ in 0..5 {
            dispatcher.write(RECORD).unwrap();
        }
    }

    assert_eq!(dispatcher.in_flight(), 0);
    mock.assert();
}
