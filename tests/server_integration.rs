//! End-to-end tests for the HTTP server.
//!
//! Each test builds a fresh SQLite database, registers files with different
//! location schemes, starts the server on a free port, and checks the
//! download responses. Upstream HTTP mirrors are served by `wiremock`.

use std::io::{Cursor, Read};
use std::sync::Arc;

use gazette_archive::bundle::{BundleMode, Bundler, Payload};
use gazette_archive::config::Config;
use gazette_archive::error::ExportError;
use gazette_archive::export::Exporter;
use gazette_archive::fetch::ByteFetcher;
use gazette_archive::gateway::{MetadataGateway, SqliteGateway};
use gazette_archive::server::{router, run_server, AppState};
use gazette_archive::{migrate, seed};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let mut cfg = Config::with_db_path(tmp.path().join("gazette.sqlite"));
    cfg.server.bind = format!("127.0.0.1:{}", port);
    cfg.fetch.timeout_secs = 5;
    cfg
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn insert_file(pool: &SqlitePool, storage_uri: &str, public_url: Option<&str>) -> i64 {
    sqlx::query(
        "INSERT INTO files (publication_id, storage_uri, public_url, mime) \
         VALUES (1, ?, ?, 'application/pdf')",
    )
    .bind(storage_uri)
    .bind(public_url)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

/// Migrated and seeded database; the seeded file (id 1) is `s3://` only.
async fn prepare(cfg: &Config) -> SqliteGateway {
    migrate::run_migrations(cfg).await.unwrap();
    let gateway = SqliteGateway::connect(cfg).await.unwrap();
    seed::seed_fixture(gateway.pool()).await.unwrap();
    gateway
}

async fn start(cfg: &Config) -> tokio::task::JoinHandle<()> {
    let cfg_clone = cfg.clone();
    let handle = tokio::spawn(async move {
        run_server(&cfg_clone).await.unwrap();
    });
    wait_for_server(port_of(cfg)).await;
    handle
}

fn port_of(cfg: &Config) -> u16 {
    cfg.server.bind.rsplit(':').next().unwrap().parse().unwrap()
}

fn url(cfg: &Config, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port_of(cfg), path)
}

async fn error_code(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"]["code"].as_str().unwrap().to_string()
}

fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    zip.by_name(name).unwrap().read_to_end(&mut out).unwrap();
    out
}

#[tokio::test]
async fn test_list_and_detail() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, find_free_port());
    prepare(&cfg).await;
    let server = start(&cfg).await;
    let client = reqwest::Client::new();

    let list: Value = client
        .get(url(&cfg, "/dof/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["publication_date"], "2025-11-06");
    assert_eq!(rows[0]["publication_type"], "DOF");
    assert_eq!(rows[0]["has_ocr"], true);

    let detail: Value = client
        .get(url(&cfg, "/dof/files/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["pages"].as_array().unwrap().len(), 1);
    assert_eq!(detail["pages"][0]["page_no"], 1);
    assert!(detail["summary"]
        .as_str()
        .unwrap()
        .contains("incentivos fiscales"));

    let resp = client.get(url(&cfg, "/dof/files/42")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(error_code(resp).await, "not_found");

    let resp = client
        .get(url(&cfg, "/dof/files?limit=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    server.abort();
}

#[tokio::test]
async fn test_malformed_parameters_use_json_errors() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, find_free_port());
    prepare(&cfg).await;
    let server = start(&cfg).await;
    let client = reqwest::Client::new();

    for route in [
        "/dof/files/abc",
        "/dof/files/abc/download",
        "/dof/files?limit=x",
    ] {
        let resp = client.get(url(&cfg, route)).send().await.unwrap();
        assert_eq!(resp.status(), 400, "route = {}", route);
        assert!(resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        assert_eq!(error_code(resp).await, "bad_request", "route = {}", route);
    }

    server.abort();
}

#[tokio::test]
async fn test_local_document_download() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, find_free_port());
    let gateway = prepare(&cfg).await;

    let doc = tmp.path().join("x.pdf");
    std::fs::write(&doc, b"0123456789").unwrap();
    let id = seed::register_file(gateway.pool(), 1, &doc, None)
        .await
        .unwrap();

    let server = start(&cfg).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(url(&cfg, &format!("/dof/files/{}/download", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(
        resp.headers()["content-disposition"],
        format!("attachment; filename=\"DOF_2025-11-06_DOF_file{}.pdf\"", id).as_str()
    );
    let document = resp.bytes().await.unwrap();
    assert_eq!(&document[..], b"0123456789");

    let resp = client
        .get(url(&cfg, &format!("/dof/files/{}/download?bundle=ZIP", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/zip");
    assert_eq!(
        resp.headers()["content-disposition"],
        format!("attachment; filename=\"DOF_2025-11-06_DOF_file{}.zip\"", id).as_str()
    );
    let archive = resp.bytes().await.unwrap();
    assert_eq!(zip_entry(&archive, "document.pdf"), document.to_vec());

    server.abort();
}

#[tokio::test]
async fn test_public_url_preferred_over_local_primary() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, find_free_port());
    let gateway = prepare(&cfg).await;

    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mirror/x.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"from mirror".to_vec()))
        .mount(&upstream)
        .await;

    let doc = tmp.path().join("x.pdf");
    std::fs::write(&doc, b"from disk").unwrap();
    let public = format!("{}/mirror/x.pdf", upstream.uri());
    let id = seed::register_file(gateway.pool(), 1, &doc, Some(&public))
        .await
        .unwrap();

    let server = start(&cfg).await;
    let resp = reqwest::get(url(&cfg, &format!("/dof/files/{}/download", id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(&resp.bytes().await.unwrap()[..], b"from mirror");

    server.abort();
}

#[tokio::test]
async fn test_s3_public_alias_and_upstream_failures() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, find_free_port());
    let gateway = prepare(&cfg).await;

    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF ok".to_vec()))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    let aliased = insert_file(
        gateway.pool(),
        "s3://dof-files/ok.pdf",
        Some(&format!("{}/ok.pdf", upstream.uri())),
    )
    .await;
    let broken = insert_file(
        gateway.pool(),
        &format!("{}/broken.pdf", upstream.uri()),
        None,
    )
    .await;
    let nowhere = insert_file(gateway.pool(), "relative/missing.pdf", None).await;

    let server = start(&cfg).await;
    let client = reqwest::Client::new();
    let download = |id: i64, query: &str| {
        client
            .get(url(&cfg, &format!("/dof/files/{}/download{}", id, query)))
            .send()
    };

    let resp = download(aliased, "").await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(&resp.bytes().await.unwrap()[..], b"%PDF ok");

    // Seeded file 1 is s3:// with no public alias.
    let resp = download(1, "?bundle=zip").await.unwrap();
    assert_eq!(resp.status(), 501);
    assert_eq!(error_code(resp).await, "not_implemented");

    let resp = download(broken, "").await.unwrap();
    assert_eq!(resp.status(), 502);
    assert_eq!(error_code(resp).await, "fetch_failed");

    let resp = download(nowhere, "").await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(error_code(resp).await, "not_found");

    let resp = download(999, "").await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = download(aliased, "?bundle=tar").await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "bad_request");

    server.abort();
}

#[tokio::test]
async fn test_archive_without_summary_uses_placeholder() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, find_free_port());
    let gateway = prepare(&cfg).await;

    sqlx::query(
        "INSERT INTO publications (dof_date, type, status) VALUES ('2025-11-07', 'DOF', 'new')",
    )
    .execute(gateway.pool())
    .await
    .unwrap();
    let doc = tmp.path().join("y.pdf");
    std::fs::write(&doc, b"%PDF no summary").unwrap();
    let id = seed::register_file(gateway.pool(), 2, &doc, None)
        .await
        .unwrap();

    let exporter = Exporter::new(
        Arc::new(gateway.clone()),
        ByteFetcher::new(&cfg.fetch).unwrap(),
    );
    let payload = exporter.download(id, BundleMode::Archive).await.unwrap();
    assert_eq!(
        payload.download_name,
        format!("DOF_2025-11-07_DOF_file{}.zip", id)
    );
    assert_eq!(
        zip_entry(&payload.bytes, "summary.txt"),
        b"Sin resumen disponible.".to_vec()
    );
    assert_eq!(zip_entry(&payload.bytes, "document.pdf"), b"%PDF no summary");
}

/// A bundler that always fails, to check the 500 path through a custom
/// router.
struct FailingBundler;

impl Bundler for FailingBundler {
    fn assemble(
        &self,
        _mode: BundleMode,
        _document: Vec<u8>,
        _recorded_mime: Option<&str>,
        _summary: Option<&str>,
        _base_name: &str,
    ) -> Result<Payload, ExportError> {
        Err(ExportError::Bundle("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_custom_bundler_errors_map_to_500() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, 0);
    let gateway = prepare(&cfg).await;

    let doc = tmp.path().join("z.pdf");
    std::fs::write(&doc, b"%PDF").unwrap();
    let id = seed::register_file(gateway.pool(), 1, &doc, None)
        .await
        .unwrap();

    let exporter = Exporter::new(
        Arc::new(gateway.clone()),
        ByteFetcher::new(&cfg.fetch).unwrap(),
    )
    .with_bundler(Arc::new(FailingBundler));
    assert!(exporter.gateway().get_file_by_id(id).await.unwrap().is_some());

    let app = router(AppState::new(Arc::new(cfg.clone()), gateway, exporter));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let resp = reqwest::get(format!("http://{}/dof/files/{}/download", addr, id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(error_code(resp).await, "bundle_error");

    server.abort();
}
