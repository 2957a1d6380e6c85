//! Shared helpers for the dispatcher integration tests.

use std::sync::{Arc, Mutex};

use seqlog_core::FallbackSink;
use tracing::Level;

/// One diagnostic captured by `RecordingSink`.
#[derive(Debug, Clone)]
pub struct Report {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Report {
    #[allow(dead_code)]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Fallback sink that keeps every report in memory.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<Report>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }
}

impl FallbackSink for RecordingSink {
    fn report(&self, level: Level, message: &str, fields: &[(&str, String)]) {
        self.reports.lock().unwrap().push(Report {
            level,
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}

/// An address that refuses connections: bind an ephemeral port, then free it.
#[allow(dead_code)]
pub fn refused_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}
