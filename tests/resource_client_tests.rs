//! Resource client tests: per-family fetch, normalization, failure mapping
//! and request serialization, driven against the in-process fake backend.

mod common;

use awsconsole::app::errors::ConsoleError;
use awsconsole::app::resource_explorer::tag_filter;
use awsconsole::app::resource_explorer::{
    export, RecordDetail, ResourceClient, ResourceExplorer, ResourceFamily, RuleFilter,
    ViewUpdate, ABSENT,
};
use awsconsole::app::session::SessionController;
use common::{ec2_payload, network_payload, s3_payload, security_groups_payload, FakeBackend};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

async fn logged_in(backend: &FakeBackend) -> Arc<SessionController> {
    let controller = backend.controller();
    controller
        .login("arn:aws:iam::123:role/X", "us-east-1")
        .await
        .unwrap();
    controller
}

#[tokio::test]
async fn test_fetch_ec2_normalizes_and_filters() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-ec2", 200, ec2_payload());
    let client = ResourceClient::new(logged_in(&backend).await, "ap-northeast-2");

    let records = client.fetch_ec2("us-east-1").await.unwrap();
    assert_eq!(records.len(), 2);

    let unnamed = &records[1];
    assert_eq!(unnamed.display_name, "i-0def");
    assert_eq!(unnamed.region, "us-east-1");
    let detail = unnamed.as_ec2().unwrap();
    assert_eq!(detail.public_ip, ABSENT);
    assert!(detail.security_groups.is_empty());

    let prod = tag_filter::filter(&records, "prod");
    assert_eq!(prod.len(), 1);
    assert_eq!(prod[0].resource_id, "i-0abc");
    assert_eq!(tag_filter::filter(&prod, ""), prod);
}

#[tokio::test]
async fn test_blank_region_uses_default() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-ec2", 200, json!([]));
    let client = ResourceClient::new(logged_in(&backend).await, "ap-northeast-2");

    assert!(client.fetch_ec2("  ").await.unwrap().is_empty());
    assert_eq!(
        backend.requests_to("/api/backend-ec2")[0].query.as_deref(),
        Some("region=ap-northeast-2")
    );
}

#[tokio::test]
async fn test_fetch_security_groups_orders_rules() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/security-groups/", 200, security_groups_payload());
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let groups = client.fetch_security_groups().await.unwrap();
    let ids: Vec<&str> = groups.iter().map(|g| g.resource_id.as_str()).collect();
    assert_eq!(ids, vec!["sg-web", "sg-db"]);

    let web = groups[0].as_security_group().unwrap();
    let rules: Vec<(String, &str, &str)> = web
        .rules
        .iter()
        .map(|r| (r.direction.to_string(), r.protocol.as_str(), r.port.as_str()))
        .collect();
    assert_eq!(
        rules,
        vec![
            ("Inbound".to_string(), "tcp", "443"),
            ("Inbound".to_string(), "tcp", "80"),
            ("Outbound".to_string(), "All", "All"),
        ]
    );
    assert_eq!(
        web.rules[1].associated_instance.as_ref().map(|i| i.id.as_str()),
        Some("i-0abc")
    );

    let filtered = RuleFilter {
        vpc_id: Some("vpc-1".into()),
        protocol: Some("tcp".into()),
        port: Some("80".into()),
    }
    .apply(&groups);
    assert_eq!(filtered.len(), 1);

    let csv = export::security_groups_csv(&filtered);
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().nth(3).unwrap().contains(",outbound,All,All,"));
}

#[tokio::test]
async fn test_fetch_s3_sends_no_region() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-s3/", 200, s3_payload());
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let buckets = client.fetch_s3().await.unwrap();
    assert_eq!(buckets[0].status, "encrypted");
    assert_eq!(buckets[1].region, ABSENT);
    assert!(buckets[1].tags.is_empty());

    let request = &backend.requests_to("/api/backend-s3/")[0];
    assert_eq!(request.query, None);
    assert_eq!(request.session_header.as_deref(), Some("sid-1"));
}

#[tokio::test]
async fn test_fetch_network_returns_three_sequences() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-network/", 200, network_payload());
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let topology = client.fetch_network().await.unwrap();
    assert_eq!(topology.vpcs.len(), 1);
    assert_eq!(topology.nat_gateways.len(), 1);

    let subnets: Vec<_> = topology.subnets_in("vpc-1").collect();
    assert_eq!(subnets.len(), 1);
    match &subnets[0].detail {
        RecordDetail::Subnet(subnet) => {
            assert_eq!(subnet.route_table, ABSENT);
            assert_eq!(subnet.available_ips, "251");
        }
        other => panic!("expected a subnet, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_unknown_fetch_and_keeps_session() {
    let backend = FakeBackend::start().await;
    backend.respond(
        "/api/security-groups/",
        500,
        json!({"detail": "Failed to describe security groups from AWS."}),
    );
    backend.respond("/api/backend-s3/", 403, json!({"detail": "Forbidden"}));
    let controller = logged_in(&backend).await;
    let client = ResourceClient::new(controller.clone(), "us-east-1");

    assert_eq!(
        client.fetch_security_groups().await.unwrap_err(),
        ConsoleError::UnknownFetch {
            message: "HTTP 500: Failed to describe security groups from AWS.".into()
        }
    );
    assert!(matches!(
        client.fetch_s3().await.unwrap_err(),
        ConsoleError::UnknownFetch { .. }
    ));
    assert!(controller.store().is_present());
}

#[tokio::test]
async fn test_long_backend_error_reaches_caller_whole() {
    let backend = FakeBackend::start().await;
    let detail = "x".repeat(300);
    backend.respond("/api/backend-s3/", 500, json!({ "detail": detail }));
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let err = client.fetch_s3().await.unwrap_err();
    assert_eq!(
        err,
        ConsoleError::UnknownFetch {
            message: format!("HTTP 500: {}", detail)
        }
    );
    // Only the display form is shortened
    assert_eq!(err.user_message().chars().count(), 200);
}

#[tokio::test]
async fn test_unexpected_payload_shape_is_unknown_fetch() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-ec2", 200, json!({"error": "No data"}));
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    match client.fetch_ec2("us-east-1").await.unwrap_err() {
        ConsoleError::UnknownFetch { message } => assert!(message.contains("list"), "{}", message),
        other => panic!("expected UnknownFetch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_same_family_fetches_are_serialized() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-s3/", 200, s3_payload());
    backend.delay(100);
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let (first, second) = tokio::join!(client.fetch_s3(), client.fetch_s3());
    assert!(first.is_ok() && second.is_ok());
    assert_eq!(backend.requests_to("/api/backend-s3/").len(), 2);
    assert_eq!(backend.max_in_flight(), 1);
}

#[tokio::test]
async fn test_different_families_may_overlap() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-s3/", 200, s3_payload());
    backend.respond("/api/backend-network/", 200, network_payload());
    backend.delay(100);
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let (s3, network) = tokio::join!(client.fetch_s3(), client.fetch_network());
    assert!(s3.is_ok() && network.is_ok());
    assert_eq!(backend.max_in_flight(), 2);
}

#[tokio::test]
async fn test_probe_is_unauthenticated() {
    let backend = FakeBackend::start().await;
    backend.respond(
        "/api/backend-ec2/health",
        200,
        json!({"status": "healthy", "service": "ec2"}),
    );
    let client = ResourceClient::new(logged_in(&backend).await, "us-east-1");

    let health = client.probe(ResourceFamily::Ec2).await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service.as_deref(), Some("ec2"));
    assert_eq!(
        backend.requests_to("/api/backend-ec2/health")[0].session_header,
        None
    );

    backend.respond("/api/backend-s3/health", 401, json!({"detail": "nope"}));
    assert!(matches!(
        client.probe(ResourceFamily::S3).await,
        Err(ConsoleError::UnknownFetch { .. })
    ));
    assert!(client.controller().store().is_present());
}

#[tokio::test]
async fn test_explorer_pages_share_one_expiry_path() {
    let backend = FakeBackend::start().await;
    backend.respond("/api/backend-s3/", 200, s3_payload());
    let controller = logged_in(&backend).await;
    let mut explorer = ResourceExplorer::new(controller.clone(), "us-east-1");

    assert_eq!(explorer.refresh_s3().await, ViewUpdate::Replaced);
    explorer.s3.set_draft("production");
    explorer.s3.commit_filter();
    assert_eq!(explorer.s3.visible().map(Vec::len), Some(1));

    backend.respond("/api/backend-s3/", 500, json!({"detail": "boom"}));
    assert!(matches!(explorer.refresh_s3().await, ViewUpdate::Kept(_)));
    assert_eq!(explorer.s3.result().map(Vec::len), Some(2));

    backend.respond("/api/backend-network/", 401, json!({"detail": "expired"}));
    assert_eq!(
        explorer.refresh_network().await,
        ViewUpdate::Cleared(ConsoleError::SessionExpired)
    );
    assert_eq!(
        explorer.refresh_s3().await,
        ViewUpdate::Cleared(ConsoleError::NoSession)
    );
    assert!(explorer.s3.result().is_none());
    assert!(!controller.store().is_present());
}
