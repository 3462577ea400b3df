//! GET/PUT/MKCOL/DELETE/MOVE/COPY against the mock server

use chrono::{TimeZone, Utc};
use futures_util::TryStreamExt;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use davmirror_core::ports::transport::{ITransport, TransportError};

use crate::common::{self, rp};

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn test_download_streams_content() {
    let (server, transport) = common::setup_dav_mock().await;
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 256) as u8).collect();
    common::mount_download(&server, "/big.bin", &content).await;

    let chunks: Vec<Vec<u8>> = transport
        .download(&rp("/big.bin"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(chunks.concat(), content);
}

#[tokio::test]
async fn test_download_encodes_path() {
    let (server, transport) = common::setup_dav_mock().await;
    common::mount_download(&server, "/My%20Docs/r%C3%A9sum%C3%A9.txt", b"cv").await;

    let chunks: Vec<Vec<u8>> = transport
        .download(&rp("/My Docs/résumé.txt"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.concat(), b"cv");
}

#[tokio::test]
async fn test_download_missing_is_not_found() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(matches!(
        transport.download(&rp("/gone.txt")).await,
        Err(TransportError::NotFound(_))
    ));
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_sends_body_and_mtime_seconds() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PUT"))
        .and(path(common::dav_path("/docs/a.txt")))
        .and(header("X-OC-Mtime", "1700000000"))
        .and(body_bytes(b"hello".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let modified = Utc.timestamp_millis_opt(1_700_000_000_789).unwrap();
    transport
        .upload(&rp("/docs/a.txt"), b"hello".to_vec(), Some(modified))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_without_hint_omits_header() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    transport
        .upload(&rp("/a.txt"), Vec::new(), None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-oc-mtime"));
}

#[tokio::test]
async fn test_upload_failure_is_transfer_error() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&server)
        .await;

    let err = transport
        .upload(&rp("/a.txt"), b"x".to_vec(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Transfer { .. }));
    assert!(err.to_string().contains("507"));
}

// ============================================================================
// Collections
// ============================================================================

#[tokio::test]
async fn test_mkcol_accepts_created_and_existing() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("MKCOL"))
        .and(path(common::dav_path("/new")))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .and(path(common::dav_path("/there")))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .and(path(common::dav_path("/orphan/child")))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    transport.create_directory(&rp("/new")).await.unwrap();
    transport.create_directory(&rp("/there")).await.unwrap();
    let err = transport
        .create_directory(&rp("/orphan/child"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Operation { operation: "MKCOL", .. }));
    assert!(err.to_string().contains("Conflict"));
}

#[tokio::test]
async fn test_delete() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("DELETE"))
        .and(path(common::dav_path("/old.txt")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(common::dav_path("/gone.txt")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    transport.delete(&rp("/old.txt")).await.unwrap();
    assert!(matches!(
        transport.delete(&rp("/gone.txt")).await,
        Err(TransportError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_move_and_copy_send_destination() {
    let (server, transport) = common::setup_dav_mock().await;
    let destination = format!("{}{}", server.uri(), common::dav_path("/b%20c.txt"));
    Mock::given(method("MOVE"))
        .and(path(common::dav_path("/a.txt")))
        .and(header("Destination", destination.as_str()))
        .and(header("Overwrite", "T"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("COPY"))
        .and(path(common::dav_path("/a.txt")))
        .and(header("Destination", destination.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    transport.move_item(&rp("/a.txt"), &rp("/b c.txt")).await.unwrap();
    transport.copy_item(&rp("/a.txt"), &rp("/b c.txt")).await.unwrap();
}
