//! 七牛存储测试（mockito 模拟 rs / up / 下载域名）

use std::sync::Arc;

use bytes::Bytes;
use mockito::{Matcher, Server, ServerGuard};

use super::*;
use crate::cipher::{CipherDirection, CipherRegistry};
use crate::error::{StorageError, StorageResult};
use crate::storage::{OpenMode, Storage, StorageFile};

fn config(server: &ServerGuard) -> QiniuConfig {
    QiniuConfig {
        access_key: "ak".to_string(),
        secret_key: "sk".to_string(),
        bucket: "test".to_string(),
        bucket_host: server.url(),
        rs_host: server.url(),
        up_host: server.url(),
        ..QiniuConfig::default()
    }
}

fn storage(server: &ServerGuard) -> QiniuStorage {
    QiniuStorage::new(config(server), &CipherRegistry::new()).unwrap()
}

fn stat_path(key: &str) -> String {
    format!("/stat/{}", encoded_entry_uri("test", key))
}

async fn mock_stat_found(server: &mut ServerGuard, key: &str, size: u64) -> mockito::Mock {
    server
        .mock("POST", stat_path(key).as_str())
        .match_header("authorization", Matcher::Regex("^QBox ak:".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"fsize":{},"hash":"FhAsh","mimeType":"image/png","putTime":17000000000000000}}"#,
            size
        ))
        .create_async()
        .await
}

async fn mock_stat_missing(server: &mut ServerGuard, key: &str) -> mockito::Mock {
    server
        .mock("POST", stat_path(key).as_str())
        .with_status(612)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"no such file or directory"}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn test_end_to_end_save_exists_url() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let _taken = mock_stat_found(&mut server, "img.png", 3).await;
    let free = mock_stat_missing(&mut server, "img_1.png").await;
    let upload = server
        .mock("POST", "/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("img_1\\.png".to_string()),
            Matcher::Regex("ak:".to_string()),
            Matcher::Regex("png-bytes".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hash":"FhAsh","key":"img_1.png"}"#)
        .expect(1)
        .create_async()
        .await;

    let name = storage
        .save("img.png", Bytes::from_static(b"png-bytes"))
        .await
        .unwrap();
    assert_eq!(name, "img_1.png");
    upload.assert_async().await;

    free.assert_async().await;

    // the uploaded object now answers stat
    free.remove_async().await;
    let _uploaded = mock_stat_found(&mut server, "img_1.png", 9).await;
    assert!(storage.exists("img_1.png").await.unwrap());

    let plain = storage.url("img_1.png").unwrap();
    assert_eq!(plain, format!("{}/img_1.png", server.url()));

    let mut private_config = config(&server);
    private_config.is_private = true;
    let private = QiniuStorage::new(private_config, &CipherRegistry::new()).unwrap();
    let signed = private.url("img_1.png").unwrap();
    assert_ne!(signed, plain);
    assert!(signed.starts_with(&format!("{}?e=", plain)));
    assert!(signed.contains("&token=ak:"));
}

#[tokio::test]
async fn test_exists_and_size() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let _found = mock_stat_found(&mut server, "a/b.txt", 1234).await;
    let _missing = mock_stat_missing(&mut server, "a/c.txt").await;

    assert!(storage.exists("a\\b.txt").await.unwrap());
    assert_eq!(storage.size("a/./b.txt").await.unwrap(), 1234);
    assert!(!storage.exists("a/c.txt").await.unwrap());
    assert_eq!(storage.size("a/c.txt").await.unwrap(), 0);

    let info = storage.stat("a/b.txt").await.unwrap().unwrap();
    assert_eq!(info.mime_type, "image/png");
}

#[tokio::test]
async fn test_stat_provider_error() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let _denied = server
        .mock("POST", stat_path("x.txt").as_str())
        .with_status(401)
        .with_body(r#"{"error":"bad token"}"#)
        .create_async()
        .await;

    match storage.exists("x.txt").await {
        Err(StorageError::Provider { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "bad token");
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_available_name_counts_up() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let _b = mock_stat_found(&mut server, "a/b.txt", 1).await;
    let _b1 = mock_stat_found(&mut server, "a/b_1.txt", 1).await;
    let _b2 = mock_stat_missing(&mut server, "a/b_2.txt").await;

    assert_eq!(storage.get_available_name("a/b.txt").await.unwrap(), "a/b_2.txt");
}

#[tokio::test]
async fn test_delete() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let ok = server
        .mock("POST", format!("/delete/{}", encoded_entry_uri("test", "old.txt")).as_str())
        .match_header("authorization", Matcher::Regex("^QBox ak:".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _missing = server
        .mock("POST", format!("/delete/{}", encoded_entry_uri("test", "none.txt")).as_str())
        .with_status(612)
        .with_body(r#"{"error":"no such file or directory"}"#)
        .create_async()
        .await;

    storage.delete("old.txt").await.unwrap();
    ok.assert_async().await;

    match storage.delete("none.txt").await {
        Err(StorageError::Provider { status, message }) => {
            assert_eq!(status, 612);
            assert_eq!(message, "no such file or directory");
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_failure() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let _free = mock_stat_missing(&mut server, "f.txt").await;
    let _upload = server
        .mock("POST", "/")
        .with_status(401)
        .with_body(r#"{"error":"expired token"}"#)
        .create_async()
        .await;

    let err = storage.save("f.txt", Bytes::from_static(b"x")).await.unwrap_err();
    assert!(matches!(err, StorageError::Provider { status: 401, .. }));
    assert!(err.to_string().contains("expired token"));
}

#[tokio::test]
async fn test_sequential_range_reads() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let first = server
        .mock("GET", "/big.bin")
        .match_header("range", "bytes=0-99")
        .with_status(206)
        .with_header("content-range", "bytes 0-99/250")
        .with_body(vec![b'a'; 100])
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/big.bin")
        .match_header("range", "bytes=100-199")
        .with_status(206)
        .with_header("content-range", "bytes 100-199/250")
        .with_body(vec![b'b'; 100])
        .expect(1)
        .create_async()
        .await;

    let mut file = storage.open_file("big.bin", OpenMode::Read);
    let chunk1 = file.read(Some(100)).await.unwrap();
    let chunk2 = file.read(Some(100)).await.unwrap();

    assert_eq!(chunk1, Bytes::from(vec![b'a'; 100]));
    assert_eq!(chunk2, Bytes::from(vec![b'b'; 100]));
    assert_eq!(file.position(), 200);
    // total came from Content-Range, no stat request is made
    assert_eq!(file.size().await.unwrap(), 250);

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_invalid_content_range() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let _m = server
        .mock("GET", "/odd.bin")
        .match_header("range", "bytes=0-9")
        .with_status(206)
        .with_header("content-range", "garbage")
        .with_body("0123456789")
        .create_async()
        .await;

    let mut file = storage.open_file("odd.bin", OpenMode::Read);
    assert!(matches!(
        file.read(Some(10)).await,
        Err(StorageError::InvalidContentRange(_))
    ));
}

#[tokio::test]
async fn test_size_memoized() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let stat = server
        .mock("POST", stat_path("doc.pdf").as_str())
        .with_status(200)
        .with_body(r#"{"fsize":42}"#)
        .expect(1)
        .create_async()
        .await;

    let mut file = storage.open("doc.pdf", OpenMode::Read).unwrap();
    assert_eq!(file.size().await.unwrap(), 42);
    assert_eq!(file.size().await.unwrap(), 42);
    stat.assert_async().await;
}

#[tokio::test]
async fn test_write_read_only_handle() {
    let server = Server::new_async().await;
    let storage = storage(&server);

    let mut file = storage.open_file("r.txt", OpenMode::Read);
    let err = file.write(Bytes::from_static(b"nope")).await.unwrap_err();
    assert!(matches!(err, StorageError::ReadOnly(_)));
    assert!(file.buffer().is_empty());
    assert!(!file.is_dirty());
    // closing a clean handle makes no request
    file.close().await.unwrap();
}

#[tokio::test]
async fn test_close_uploads_once() {
    let mut server = Server::new_async().await;
    let storage = storage(&server);

    let upload = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("draft contents".to_string()))
        .with_status(200)
        .with_body(r#"{"hash":"h","key":"notes/draft.txt"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut file = storage.open("notes\\draft.txt", "wb".parse().unwrap()).unwrap();
    assert_eq!(file.name(), "notes/draft.txt");
    file.write(Bytes::from_static(b"draft contents")).await.unwrap();
    assert!(file.is_dirty());
    file.close().await.unwrap();
    file.close().await.unwrap();

    upload.assert_async().await;
}

fn reverse_registry() -> CipherRegistry {
    let mut registry = CipherRegistry::new();
    registry.register(
        "reverse",
        Arc::new(|data: &[u8], _dir: CipherDirection| -> StorageResult<Vec<u8>> {
            Ok(data.iter().rev().copied().collect())
        }),
    );
    registry
}

#[tokio::test]
async fn test_encrypted_round_trip() {
    let mut server = Server::new_async().await;
    let mut cfg = config(&server);
    cfg.encrypt_func = Some("reverse".to_string());
    let storage = QiniuStorage::new(cfg, &reverse_registry()).unwrap();

    let _free = mock_stat_missing(&mut server, "secret.txt").await;
    let upload = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("dlrow olleh".to_string()))
        .with_status(200)
        .with_body(r#"{"hash":"h","key":"secret.txt"}"#)
        .expect(1)
        .create_async()
        .await;
    let _full = server
        .mock("GET", "/secret.txt")
        .match_header("range", Matcher::Missing)
        .with_status(200)
        .with_body("dlrow olleh")
        .create_async()
        .await;
    let _partial = server
        .mock("GET", "/secret.txt")
        .match_header("range", "bytes=0-4")
        .with_status(206)
        .with_header("content-range", "bytes 0-4/11")
        .with_body("dlrow")
        .create_async()
        .await;

    let name = storage
        .save("secret.txt", Bytes::from_static(b"hello world"))
        .await
        .unwrap();
    upload.assert_async().await;

    let mut file = storage.open(&name, OpenMode::Read).unwrap();
    // full reads are decrypted
    assert_eq!(file.read(None).await.unwrap(), Bytes::from_static(b"hello world"));
    // ranged reads come back as stored
    assert_eq!(file.read(Some(5)).await.unwrap(), Bytes::from_static(b"dlrow"));
}

#[test]
fn test_unresolved_cipher_fails_at_construction() {
    let mut cfg = QiniuConfig::default();
    cfg.encrypt_func = Some("myapp.crypto.encrypt".to_string());
    match QiniuStorage::new(cfg, &CipherRegistry::new()) {
        Err(StorageError::Config(msg)) => assert!(msg.contains("myapp.crypto.encrypt")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_url_host_without_scheme() {
    let cfg = QiniuConfig {
        bucket: "test".to_string(),
        bucket_host: "cdn.example.com/".to_string(),
        ..QiniuConfig::default()
    };
    let storage = QiniuStorage::new(cfg, &CipherRegistry::new()).unwrap();
    assert_eq!(
        storage.url("photos\\2024\\a b.jpg").unwrap(),
        "http://cdn.example.com/photos/2024/a%20b.jpg"
    );
}
