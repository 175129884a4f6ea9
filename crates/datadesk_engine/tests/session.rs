use std::sync::Once;

use datadesk_engine::admin::{self, CollectionStat};
use datadesk_engine::{ApiClient, ClientSettings, Dataset, ErrorClass, FailureKind, SessionHandle};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(desk_logging::initialize_for_tests);
}

fn client(server: &MockServer, session: SessionHandle) -> ApiClient {
    let settings = ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    };
    ApiClient::new(settings, session).unwrap()
}

#[tokio::test]
async fn login_stores_token_used_by_later_requests() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "ada", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "user": {"id": "u1", "username": "ada", "role": "admin"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/company-house/stats"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stats": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionHandle::default();
    let client = client(&server, session.clone());
    let user = admin::login(&client, "ada", "pw").await.unwrap();
    assert_eq!(user.username, "ada");
    assert_eq!(session.token().as_deref(), Some("tok-1"));

    let count = admin::dataset_stats(&client, Dataset::CompanyHouse)
        .await
        .unwrap();
    assert_eq!(count, 42);
}

#[tokio::test]
async fn forbidden_response_clears_session() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Invalid token"})))
        .mount(&server)
        .await;

    let session = SessionHandle::with_token("old");
    let err = admin::me(&client(&server, session.clone())).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Unauthorized(403));
    assert_eq!(err.class(), ErrorClass::Auth);
    assert_eq!(err.message, "Invalid token");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn server_errors_are_transient_with_fallback_message() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = admin::collection_stats(&client(&server, SessionHandle::default()))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
    assert!(err.message.starts_with("Request failed: 500"));
}

#[tokio::test]
async fn collection_stats_and_delete_all() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"collectionName": "companyhouses", "documentCount": 10, "size": 2048, "indexCount": 3}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/company-house/delete-all"))
        .and(body_json(json!({"confirm": "DELETE_ALL_COMPANY_HOUSE_DATA"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "deletedCount": 10})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, SessionHandle::with_token("t"));
    let stats = admin::collection_stats(&client).await.unwrap();
    assert_eq!(
        stats,
        vec![CollectionStat {
            collection_name: "companyhouses".into(),
            document_count: 10,
            size: 2048,
            index_count: 3,
        }]
    );
    assert_eq!(
        admin::delete_all(&client, Dataset::CompanyHouse).await.unwrap(),
        Some(10)
    );
    assert!(admin::delete_all(&client, Dataset::Botsol).await.is_err());
}

#[tokio::test]
async fn moderation_posts_selected_ids() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/adult-keywords/references/bulk-process"))
        .and(body_json(json!({"recordIds": ["r1", "r2"], "isAdultContent": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "2 references processed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, SessionHandle::with_token("t"));
    let ids = vec!["r1".to_string(), "r2".to_string()];
    assert_eq!(
        admin::bulk_process_references(&client, &ids, true)
            .await
            .unwrap(),
        "2 references processed"
    );
    assert!(admin::bulk_process_references(&client, &[], false)
        .await
        .is_err());
}
