//! Common test utilities: snapshot fixtures and a fake remote server

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use snapshot_updater::engine::{
    snapshot::schema::DEFAULT_METADATA_TABLE, updater::Fetcher, SnapshotSchema, TableSpec,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

pub const KEY: &str = "test-key";

/// Tables used by the fixtures below
pub fn test_schema() -> SnapshotSchema {
    SnapshotSchema::new(
        DEFAULT_METADATA_TABLE,
        vec![
            TableSpec::new("items").report(&["name", "kind"]),
            TableSpec::new("devices").key("code").report(&["marketname"]),
            TableSpec::new("tags"),
        ],
    )
}

/// Write a snapshot with the metadata row, the fixture tables and `extra_sql`
pub fn write_snapshot(path: &Path, version: &str, last_update: i64, extra_sql: &str) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE {meta} (version TEXT, lastupdate INTEGER);
         CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, kind TEXT);
         CREATE TABLE devices (code TEXT, marketname TEXT);
         CREATE INDEX devices_code ON devices (code);
         CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT);
         INSERT INTO items VALUES (1, 'alpha', 'a'), (2, 'beta', 'b'), (3, 'gamma', 'c');
         INSERT INTO devices VALUES ('d1', 'Phone One'), ('d2', 'Phone Two');
         INSERT INTO tags VALUES (1, 'red'), (2, 'blue');
         {extra_sql}",
        meta = DEFAULT_METADATA_TABLE,
        extra_sql = extra_sql,
    ))
    .unwrap();
    conn.execute(
        &format!("INSERT INTO {} VALUES (?1, ?2)", DEFAULT_METADATA_TABLE),
        rusqlite::params![version, last_update],
    )
    .unwrap();
}

/// Fetcher that ignores proxy settings, so loopback servers are reachable
pub fn local_fetcher() -> Fetcher {
    Fetcher::with_client(reqwest::Client::builder().no_proxy().build().unwrap())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

/// Scripted stand-in for the remote version/checksum/data endpoints
pub struct FakeRemote {
    pub version: String,
    pub data: Vec<u8>,
    /// Checksum responses by hit; the last entry repeats
    pub checksum_statuses: Vec<u16>,
    /// Data responses by hit; the last entry repeats
    pub data_statuses: Vec<u16>,
    /// Data hits (0-based) answered 200 with corrupted bytes
    pub corrupt_hits: Mutex<Vec<usize>>,
    /// Data hits (0-based) that advertise the full length, send half, then abort
    pub dropped_hits: Mutex<Vec<usize>>,
    pub version_hits: AtomicUsize,
    pub checksum_hits: AtomicUsize,
    pub data_hits: AtomicUsize,
}

impl FakeRemote {
    pub fn new(version: &str, data: Vec<u8>) -> Self {
        Self {
            version: version.to_string(),
            data,
            checksum_statuses: vec![200],
            data_statuses: vec![200],
            corrupt_hits: Mutex::new(Vec::new()),
            dropped_hits: Mutex::new(Vec::new()),
            version_hits: AtomicUsize::new(0),
            checksum_hits: AtomicUsize::new(0),
            data_hits: AtomicUsize::new(0),
        }
    }

    pub fn checksum_statuses(mut self, statuses: &[u16]) -> Self {
        self.checksum_statuses = statuses.to_vec();
        self
    }

    pub fn data_statuses(mut self, statuses: &[u16]) -> Self {
        self.data_statuses = statuses.to_vec();
        self
    }

    pub fn corrupt_hits(self, hits: &[usize]) -> Self {
        *self.corrupt_hits.lock().unwrap() = hits.to_vec();
        self
    }

    pub fn dropped_hits(self, hits: &[usize]) -> Self {
        *self.dropped_hits.lock().unwrap() = hits.to_vec();
        self
    }

    pub fn checksum_count(&self) -> usize {
        self.checksum_hits.load(Ordering::SeqCst)
    }

    pub fn data_count(&self) -> usize {
        self.data_hits.load(Ordering::SeqCst)
    }
}

fn scripted(statuses: &[u16], hit: usize) -> StatusCode {
    let code = statuses
        .get(hit)
        .or_else(|| statuses.last())
        .copied()
        .unwrap_or(200);
    StatusCode::from_u16(code).unwrap()
}

async fn version(State(remote): State<Arc<FakeRemote>>) -> (StatusCode, String) {
    remote.version_hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, format!("{}\n", remote.version))
}

async fn checksum(State(remote): State<Arc<FakeRemote>>) -> (StatusCode, String) {
    let hit = remote.checksum_hits.fetch_add(1, Ordering::SeqCst);
    let status = scripted(&remote.checksum_statuses, hit);
    if status != StatusCode::OK {
        return (status, String::new());
    }
    (status, format!("{}  udgerdb_v3.dat\n", sha256_hex(&remote.data)))
}

async fn data(State(remote): State<Arc<FakeRemote>>) -> Response {
    let hit = remote.data_hits.fetch_add(1, Ordering::SeqCst);
    let status = scripted(&remote.data_statuses, hit);
    if status != StatusCode::OK {
        return status.into_response();
    }
    if remote.dropped_hits.lock().unwrap().contains(&hit) {
        let half = remote.data[..remote.data.len() / 2].to_vec();
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(half),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection dropped",
            )),
        ];
        return (
            status,
            [(header::CONTENT_LENGTH, remote.data.len().to_string())],
            Body::from_stream(futures_util::stream::iter(chunks)),
        )
            .into_response();
    }
    if remote.corrupt_hits.lock().unwrap().contains(&hit) {
        let mut corrupted = remote.data.clone();
        corrupted.truncate(corrupted.len() / 2);
        return (status, corrupted).into_response();
    }
    (status, remote.data.clone()).into_response()
}

/// Serve `remote` on an ephemeral port; returns the base URL
pub async fn spawn_remote(remote: Arc<FakeRemote>) -> String {
    let app = Router::new()
        .route(&format!("/{}/version", KEY), get(version))
        .route(&format!("/{}/udgerdb_v3.dat.sha256", KEY), get(checksum))
        .route(&format!("/{}/udgerdb_v3.dat", KEY), get(data))
        .with_state(remote);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}
