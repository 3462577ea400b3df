//! PROPFIND listings and existence checks

use davmirror_core::ports::transport::{ITransport, TransportError};
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, collection, file, rp};

const NOV_14: &str = "Tue, 14 Nov 2023 22:13:20 GMT";

#[tokio::test]
async fn test_list_returns_children_without_self() {
    let (server, transport) = common::setup_dav_mock().await;
    common::mount_listing(
        &server,
        "/docs",
        &[
            collection("/docs"),
            file("/docs/readme.md", 10, NOV_14, None),
            file(
                "/docs/Quarterly%20Report.pdf",
                2048,
                NOV_14,
                Some("D41D8CD98F00B204E9800998ECF8427E"),
            ),
            collection("/docs/archive"),
        ],
    )
    .await;

    let mut entries = transport.list(&rp("/docs")).await.unwrap();
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Quarterly Report.pdf", "archive", "readme.md"]);

    let report = &entries[0];
    assert_eq!(report.size, 2048);
    assert_eq!(report.modified_millis(), 1_700_000_000_000);
    assert_eq!(
        report.content_hash.as_ref().map(|h| h.as_str()),
        Some("d41d8cd98f00b204e9800998ecf8427e")
    );

    assert!(entries[1].is_directory);
    assert!(entries[2].content_hash.is_none());
}

#[tokio::test]
async fn test_list_root() {
    let (server, transport) = common::setup_dav_mock().await;
    common::mount_listing(
        &server,
        "/",
        &[collection(""), file("/top.txt", 3, NOV_14, None)],
    )
    .await;

    let entries = transport
        .list(&davmirror_core::domain::RemotePath::root())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "top.txt");
}

#[tokio::test]
async fn test_list_sends_credentials_and_property_request() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PROPFIND"))
        .and(path(common::dav_path("/docs")))
        .and(basic_auth(common::USER, common::PASSWORD))
        .and(header("Depth", "1"))
        .and(body_string_contains("getlastmodified"))
        .and(body_string_contains("checksums"))
        .respond_with(
            ResponseTemplate::new(207).set_body_string(common::multistatus(&[collection("/docs")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let entries = transport.list(&rp("/docs")).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_list_missing_collection_is_list_error() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = transport.list(&rp("/nope")).await.unwrap_err();
    assert!(matches!(err, TransportError::List { ref path, .. } if path == "/nope"));
}

#[tokio::test]
async fn test_list_of_a_file_is_rejected() {
    let (server, transport) = common::setup_dav_mock().await;
    common::mount_listing(&server, "/f.txt", &[file("/f.txt", 1, NOV_14, None)]).await;

    assert!(matches!(
        transport.list(&rp("/f.txt")).await,
        Err(TransportError::List { .. })
    ));
}

#[tokio::test]
async fn test_list_unauthorized() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = transport.list(&rp("/docs")).await.unwrap_err();
    assert!(err.to_string().contains("Unauthorized"));
}

#[tokio::test]
async fn test_exists_uses_depth_zero() {
    let (server, transport) = common::setup_dav_mock().await;
    Mock::given(method("PROPFIND"))
        .and(path(common::dav_path("/docs")))
        .and(header("Depth", "0"))
        .respond_with(
            ResponseTemplate::new(207).set_body_string(common::multistatus(&[collection("/docs")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path(common::dav_path("/missing")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path(common::dav_path("/broken")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(transport.exists(&rp("/docs")).await.unwrap());
    assert!(!transport.exists(&rp("/missing")).await.unwrap());
    assert!(matches!(
        transport.exists(&rp("/broken")).await,
        Err(TransportError::Operation { operation: "PROPFIND", .. })
    ));
}
