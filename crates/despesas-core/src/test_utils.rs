//! Test utilities for despesas-core
//!
//! This module provides fixtures for building expense tables and archives,
//! plus a mock archive server that stands in for the transparency portal.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use encoding_rs::WINDOWS_1252;
use rust_decimal::Decimal;
use tokio::sync::oneshot;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{ExpenseRecord, PaymentStatus};

/// Header of the portal's expense tables
pub const EXPENSE_HEADER: &str = "id_despesa_detalhe;ano_exercicio;ds_orgao;ds_municipio;ds_funcao_governo;ds_subfuncao_governo;tp_despesa;vl_despesa";

/// Shorthand for a record
pub fn record(theme: &str, subtheme: &str, status: PaymentStatus, amount: Decimal) -> ExpenseRecord {
    ExpenseRecord::new(theme, subtheme, status, amount)
}

/// Shorthand for a paid record
pub fn paid(theme: &str, subtheme: &str, amount: Decimal) -> ExpenseRecord {
    record(theme, subtheme, PaymentStatus::Paid, amount)
}

/// Render rows of (theme, subtheme, status label, amount text) as a
/// Windows-1252 table in the portal's layout
pub fn expense_csv(rows: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    let mut text = String::from(EXPENSE_HEADER);
    text.push('\n');
    for (i, (theme, subtheme, status, amount)) in rows.iter().enumerate() {
        text.push_str(&format!(
            "{};2019;PREFEITURA MUNICIPAL;CAMPINAS;{};{};{};{}\n",
            i + 1,
            theme,
            subtheme,
            status,
            amount
        ));
    }
    let (bytes, _, _) = WINDOWS_1252.encode(&text);
    bytes.into_owned()
}

/// Build an in-memory ZIP archive from (name, contents) entries
pub fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Archive with a single expense table, as the portal publishes it
pub fn expense_archive(rows: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    build_archive(&[("despesas.csv", expense_csv(rows).as_slice())])
}

/// How the mock server answers for one file
#[derive(Clone)]
enum MockResponse {
    Archive(Vec<u8>),
    Status(StatusCode),
    Slow(Duration, Vec<u8>),
}

#[derive(Clone, Default)]
struct MockState {
    files: Arc<HashMap<String, MockResponse>>,
    hits: Arc<AtomicUsize>,
}

/// Builder for `MockArchiveServer`
#[derive(Default)]
pub struct MockArchiveServerBuilder {
    files: HashMap<String, MockResponse>,
}

impl MockArchiveServerBuilder {
    /// Serve an archive for (city, year)
    pub fn archive(mut self, city: &str, year: i32, bytes: Vec<u8>) -> Self {
        self.files
            .insert(archive_name(city, year), MockResponse::Archive(bytes));
        self
    }

    /// Answer (city, year) with a bare status code
    pub fn status(mut self, city: &str, year: i32, status: StatusCode) -> Self {
        self.files
            .insert(archive_name(city, year), MockResponse::Status(status));
        self
    }

    /// Serve an archive only after a delay
    pub fn slow(mut self, city: &str, year: i32, delay: Duration, bytes: Vec<u8>) -> Self {
        self.files
            .insert(archive_name(city, year), MockResponse::Slow(delay, bytes));
        self
    }

    pub async fn start(self) -> MockArchiveServer {
        let state = MockState {
            files: Arc::new(self.files),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let hits = state.hits.clone();

        let app = Router::new()
            .route("/csv/:file", get(handle_archive))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        MockArchiveServer {
            addr,
            hits,
            shutdown_tx: Some(shutdown_tx),
        }
    }
}

/// Mock transparency portal serving expense archives under `/csv/`
pub struct MockArchiveServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockArchiveServer {
    pub fn builder() -> MockArchiveServerBuilder {
        MockArchiveServerBuilder::default()
    }

    /// Base URL to put in `SourceConfig::base_url`
    pub fn url(&self) -> String {
        format!("http://{}/csv", self.addr)
    }

    /// Number of archive requests served so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockArchiveServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn archive_name(city: &str, year: i32) -> String {
    format!("despesas-{}-{}.zip", city, year)
}

async fn handle_archive(State(state): State<MockState>, Path(file): Path<String>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match state.files.get(&file) {
        Some(MockResponse::Archive(bytes)) => bytes.clone().into_response(),
        Some(MockResponse::Status(status)) => (*status).into_response(),
        Some(MockResponse::Slow(delay, bytes)) => {
            tokio::time::sleep(*delay).await;
            bytes.clone().into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
