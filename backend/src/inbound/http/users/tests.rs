//! Tests for users API handlers.

use super::*;
use crate::domain::ports::{MockUserRepository, UserPersistenceError, UserRepository};
use crate::domain::{EMAIL_MAX, PERSON_NAME_MAX};
use crate::inbound::http::error::{json_config, path_config};
use crate::outbound::memory::InMemoryUserRepository;
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test};
use insta::assert_json_snapshot;
use rstest::{fixture, rstest};
use serde_json::Value;
use std::sync::Arc;

const ADA_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

fn ada() -> User {
    User::try_from_strings(ADA_ID, "ada@example.com", "Ada", "Lovelace").expect("valid user")
}

#[fixture]
fn repository() -> Arc<InMemoryUserRepository> {
    Arc::new(InMemoryUserRepository::new())
}

fn test_app(
    repository: Arc<dyn UserRepository>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(HttpState::from_repository(repository)))
        .app_data(json_config())
        .app_data(path_config())
        .configure(configure)
}

fn create_request(email: &str, first_name: &str, last_name: &str) -> CreateUserRequest {
    CreateUserRequest {
        email: email.into(),
        first_name: first_name.into(),
        last_name: last_name.into(),
    }
}

async fn error_payload(response: actix_web::dev::ServiceResponse) -> Value {
    let body = actix_test::read_body(response).await;
    serde_json::from_slice(&body).expect("error payload")
}

#[test]
fn user_response_uses_camel_case() {
    assert_json_snapshot!(UserResponse::from(&ada()), @r#"
    {
      "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
      "email": "ada@example.com",
      "firstName": "Ada",
      "lastName": "Lovelace"
    }
    "#);
}

#[test]
fn users_response_wraps_list() {
    let body = UsersResponse {
        users: vec![UserResponse::from(&ada())],
    };
    assert_json_snapshot!(body, @r#"
    {
      "users": [
        {
          "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
          "email": "ada@example.com",
          "firstName": "Ada",
          "lastName": "Lovelace"
        }
      ]
    }
    "#);
}

#[rstest]
#[actix_web::test]
async fn list_users_starts_empty(repository: Arc<InMemoryUserRepository>) {
    let app = actix_test::init_service(test_app(repository)).await;
    let request = actix_test::TestRequest::get().uri("/api/users").to_request();

    let body: UsersResponse = actix_test::call_and_read_body_json(&app, request).await;
    assert!(body.users.is_empty());
}

#[rstest]
#[actix_web::test]
async fn get_user_returns_stored_user(repository: Arc<InMemoryUserRepository>) {
    repository.insert(&ada()).await.expect("seed user");
    let app = actix_test::init_service(test_app(repository)).await;
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/users/{ADA_ID}"))
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: UserResponse = actix_test::read_body_json(response).await;
    assert_eq!(body, UserResponse::from(&ada()));
}

#[rstest]
#[actix_web::test]
async fn get_user_reports_missing_user(repository: Arc<InMemoryUserRepository>) {
    let app = actix_test::init_service(test_app(repository)).await;
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/users/{ADA_ID}"))
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let value = error_payload(response).await;
    assert_eq!(value.get("code").and_then(Value::as_str), Some("not_found"));
}

#[rstest]
#[actix_web::test]
async fn get_user_rejects_non_uuid_identifier(repository: Arc<InMemoryUserRepository>) {
    let app = actix_test::init_service(test_app(repository)).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/users/not-a-uuid")
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = error_payload(response).await;
    assert_eq!(
        value.get("code").and_then(Value::as_str),
        Some("invalid_request")
    );
    assert_eq!(
        value.pointer("/details/code").and_then(Value::as_str),
        Some("invalid_uuid")
    );
}

#[rstest]
#[actix_web::test]
async fn create_user_returns_created_with_location(repository: Arc<InMemoryUserRepository>) {
    let app = actix_test::init_service(test_app(repository.clone())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/users")
        .set_json(create_request("ada@example.com", "Ada", "Lovelace"))
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .expect("location header");
    let body: UserResponse = actix_test::read_body_json(response).await;

    assert_eq!(location, format!("/api/users/{}", body.id));
    assert_eq!(body.email, "ada@example.com");
    assert_eq!(body.first_name, "Ada");
    assert_eq!(body.last_name, "Lovelace");
    let id = UserId::new(&body.id).expect("server assigned a UUID");
    assert!(repository.find_by_id(&id).await.expect("lookup").is_some());
}

#[rstest]
#[actix_web::test]
async fn create_user_rejects_duplicate_email(repository: Arc<InMemoryUserRepository>) {
    repository.insert(&ada()).await.expect("seed user");
    let app = actix_test::init_service(test_app(repository.clone())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/users")
        .set_json(create_request("ada@example.com", "Augusta", "King"))
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let value = error_payload(response).await;
    assert_eq!(value.get("code").and_then(Value::as_str), Some("conflict"));
    assert_eq!(repository.list().await.expect("list").len(), 1);
}

#[rstest]
#[case(create_request(&"e".repeat(EMAIL_MAX + 1), "Ada", "Lovelace"), "email")]
#[case(create_request("a@b.com", &"f".repeat(PERSON_NAME_MAX + 1), "Lovelace"), "firstName")]
#[case(create_request("a@b.com", "Ada", &"l".repeat(PERSON_NAME_MAX + 1)), "lastName")]
#[actix_web::test]
async fn create_user_rejects_oversize_fields(
    #[case] payload: CreateUserRequest,
    #[case] field: &'static str,
) {
    let app = actix_test::init_service(test_app(Arc::new(InMemoryUserRepository::new()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/users")
        .set_json(payload)
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = error_payload(response).await;
    assert_eq!(
        value.pointer("/details/field").and_then(Value::as_str),
        Some(field)
    );
    assert_eq!(
        value.pointer("/details/code").and_then(Value::as_str),
        Some("too_long")
    );
}

#[rstest]
#[case(r#"{"firstName":"Ada","lastName":"Lovelace"}"#)]
#[case(r#"["a@b.com","Ada","Lovelace"]"#)]
#[case(r#"{"email":"a@b.com","firstName":"Ada","lastName":"#)]
#[case(r#"{"email":42,"firstName":"Ada","lastName":"Lovelace"}"#)]
#[actix_web::test]
async fn create_user_rejects_malformed_bodies(#[case] body: &'static str) {
    let app = actix_test::init_service(test_app(Arc::new(InMemoryUserRepository::new()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/users")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(body)
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = error_payload(response).await;
    assert_eq!(
        value.get("code").and_then(Value::as_str),
        Some("invalid_request")
    );
}

#[actix_web::test]
async fn repeated_keys_take_last_value_and_missing_names_are_empty() {
    let app = actix_test::init_service(test_app(Arc::new(InMemoryUserRepository::new()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/users")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(r#"{"email":"a@b.com","firstName":"A","firstName":"B"}"#)
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: UserResponse = actix_test::read_body_json(response).await;
    assert!(!created.id.is_empty());
    assert_eq!(created.email, "a@b.com");
    assert_eq!(created.first_name, "B");
    assert_eq!(created.last_name, "");

    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/users/{}", created.id))
        .to_request();
    let fetched: UserResponse = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(fetched, created);
}

#[actix_web::test]
async fn created_users_appear_in_list() {
    let app = actix_test::init_service(test_app(Arc::new(InMemoryUserRepository::new()))).await;
    for (email, first) in [("ada@example.com", "Ada"), ("grace@example.com", "Grace")] {
        let request = actix_test::TestRequest::post()
            .uri("/api/users")
            .set_json(create_request(email, first, "Example"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let request = actix_test::TestRequest::get().uri("/api/users").to_request();
    let body: UsersResponse = actix_test::call_and_read_body_json(&app, request).await;
    let mut emails: Vec<_> = body.users.into_iter().map(|user| user.email).collect();
    emails.sort();
    assert_eq!(emails, ["ada@example.com", "grace@example.com"]);
}

#[actix_web::test]
async fn unavailable_store_maps_to_service_unavailable() {
    let mut repository = MockUserRepository::new();
    repository
        .expect_list()
        .times(1)
        .return_once(|| Err(UserPersistenceError::connection("refused")));
    let app = actix_test::init_service(test_app(Arc::new(repository))).await;
    let request = actix_test::TestRequest::get().uri("/api/users").to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let value = error_payload(response).await;
    assert_eq!(
        value.get("code").and_then(Value::as_str),
        Some("service_unavailable")
    );
    assert_eq!(
        value.get("message").and_then(Value::as_str),
        Some("user store is unavailable")
    );
}

#[actix_web::test]
async fn query_failures_are_redacted() {
    let mut repository = MockUserRepository::new();
    repository
        .expect_find_by_id()
        .times(1)
        .return_once(|_| Err(UserPersistenceError::query("syntax error at or near")));
    let app = actix_test::init_service(test_app(Arc::new(repository))).await;
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/users/{ADA_ID}"))
        .to_request();

    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let value = error_payload(response).await;
    assert_eq!(
        value.get("code").and_then(Value::as_str),
        Some("internal_error")
    );
    assert_eq!(
        value.get("message").and_then(Value::as_str),
        Some("Internal server error")
    );
}
