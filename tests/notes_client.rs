//! Supabase auth and notes clients against an in-process mock project.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use helpdesk_cli::core::Error;
use helpdesk_cli::core::auth::{StaticToken, SupabaseAuth};
use helpdesk_cli::core::notes::{NoteDraft, NoteScope, NotesClient};

const ANON_KEY: &str = "anon-key";
const ACCESS_TOKEN: &str = "access-abc";

#[derive(Debug, Clone)]
struct Call {
    method: String,
    query: HashMap<String, String>,
    prefer: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Project {
    calls: Arc<Mutex<Vec<Call>>>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Rejects requests missing the apikey header or the expected bearer token.
fn check_auth(headers: &HeaderMap, bearer: bool) -> Result<(), Response> {
    if header_str(headers, "apikey") != Some(ANON_KEY) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "No API key found in request"}))).into_response());
    }
    let expected = format!("Bearer {ACCESS_TOKEN}");
    if bearer && header_str(headers, header::AUTHORIZATION.as_str()) != Some(expected.as_str()) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))).into_response());
    }
    Ok(())
}

fn token_response() -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1_900_000_000,
        "refresh_token": "refresh-xyz",
        "user": {"id": "user-1", "email": "ana@example.com"}
    })
}

async fn token(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_auth(&headers, false) {
        return rejection;
    }

    match query.get("grant_type").map(String::as_str) {
        Some("password") if body["email"] == "ana@example.com" && body["password"] == "hunter2" => {
            Json(token_response()).into_response()
        }
        Some("password") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
        )
            .into_response(),
        Some("refresh_token") if body["refresh_token"] == "refresh-xyz" => Json(token_response()).into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn user(headers: HeaderMap) -> Response {
    if let Err(rejection) = check_auth(&headers, true) {
        return rejection;
    }
    Json(json!({"id": "user-1", "email": "ana@example.com", "aud": "authenticated"})).into_response()
}

async fn logout(headers: HeaderMap) -> Response {
    if let Err(rejection) = check_auth(&headers, true) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}

fn row(id: &str, title: &str, is_public: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{title} body"),
        "user_id": "user-1",
        "is_public": is_public,
        "created_at": "2026-03-04T10:00:00+00:00",
        "updated_at": null
    })
}

async fn memories(
    State(project): State<Project>,
    method: axum::http::Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    if let Err(rejection) = check_auth(&headers, true) {
        return rejection;
    }

    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    project.calls.lock().push(Call {
        method: method.to_string(),
        query: query.clone(),
        prefer: header_str(&headers, "prefer").map(str::to_string),
        body: body.clone(),
    });

    match method.as_str() {
        "GET" if query.get("is_public").map(String::as_str) == Some("eq.true") => {
            Json(json!([row("n2", "Shared", true)])).into_response()
        }
        "GET" => Json(json!([row("n2", "Shared", true), row("n1", "Private", false)])).into_response(),
        "POST" => {
            let mut created = body[0].clone();
            created["id"] = json!("n3");
            created["created_at"] = json!("2026-03-05T09:00:00+00:00");
            (StatusCode::CREATED, Json(json!([created]))).into_response()
        }
        "PATCH" if query.get("id").map(String::as_str) == Some("eq.n1") => {
            let mut updated = row("n1", body["title"].as_str().unwrap_or_default(), false);
            updated["updated_at"] = body["updated_at"].clone();
            Json(json!([updated])).into_response()
        }
        // PostgREST matches no rows rather than failing
        "PATCH" => Json(json!([])).into_response(),
        "DELETE" => StatusCode::NO_CONTENT.into_response(),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn start() -> (SupabaseAuth, Project) {
    let project = Project::default();
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/logout", post(logout))
        .route(
            "/rest/v1/memories",
            get(memories).post(memories).patch(memories).delete(memories),
        )
        .with_state(project.clone());

    let url = common::serve(app).await;
    (SupabaseAuth::new(&url, ANON_KEY).unwrap(), project)
}

fn notes(auth: SupabaseAuth) -> NotesClient {
    NotesClient::new(auth, Arc::new(StaticToken::new(ACCESS_TOKEN))).unwrap()
}

fn draft(title: &str, description: &str, is_public: bool) -> NoteDraft {
    NoteDraft {
        title: title.into(),
        description: description.into(),
        is_public,
    }
}

#[tokio::test]
async fn password_sign_in_and_refresh() {
    let (auth, _project) = start().await;

    let session = auth.sign_in_with_password("ana@example.com", "hunter2").await.unwrap();
    assert_eq!(session.access_token, ACCESS_TOKEN);
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-xyz"));
    assert_eq!(session.expires_at, Some(1_900_000_000));
    assert_eq!(session.user.email.as_deref(), Some("ana@example.com"));

    let refreshed = auth.refresh("refresh-xyz").await.unwrap();
    assert_eq!(refreshed.user.id, "user-1");

    let user = auth.user(ACCESS_TOKEN).await.unwrap();
    assert_eq!(user.id, "user-1");

    auth.sign_out(ACCESS_TOKEN).await.unwrap();
}

#[tokio::test]
async fn wrong_password_reports_error_description() {
    let (auth, _project) = start().await;

    match auth.sign_in_with_password("ana@example.com", "nope").await.unwrap_err() {
        Error::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn lists_notes_newest_first() {
    let (auth, project) = start().await;
    let client = notes(auth);

    let mine = client.list(NoteScope::Mine).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[1].title, "Private");

    let shared = client.list(NoteScope::Shared).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert!(shared[0].is_public);

    let calls = project.calls.lock();
    assert_eq!(calls[0].query.get("order").map(String::as_str), Some("created_at.desc"));
    assert_eq!(calls[0].query.get("select").map(String::as_str), Some("*"));
    assert!(!calls[0].query.contains_key("is_public"));
    assert_eq!(calls[1].query.get("is_public").map(String::as_str), Some("eq.true"));
}

#[tokio::test]
async fn create_attaches_signed_in_user() {
    let (auth, project) = start().await;
    let client = notes(auth);

    let note = client
        .create(&draft("  Trip  ", "Flights booked", true))
        .await
        .unwrap();
    assert_eq!(note.id, "n3");
    assert_eq!(note.title, "Trip");
    assert_eq!(note.user_id, "user-1");
    assert!(note.is_public);

    let calls = project.calls.lock();
    let insert = &calls[0];
    assert_eq!(insert.method, "POST");
    assert_eq!(insert.prefer.as_deref(), Some("return=representation"));
    assert_eq!(insert.body[0]["user_id"], "user-1");
    assert_eq!(insert.body[0]["title"], "Trip");
}

#[tokio::test]
async fn update_stamps_updated_at() {
    let (auth, project) = start().await;
    let client = notes(auth);

    let note = client.update("n1", &draft("Renamed", "New body", false)).await.unwrap();
    assert_eq!(note.title, "Renamed");
    assert!(note.updated_at.is_some());

    let calls = project.calls.lock();
    assert_eq!(calls[0].method, "PATCH");
    assert_eq!(calls[0].query.get("id").map(String::as_str), Some("eq.n1"));
    assert!(calls[0].body["updated_at"].is_string());
}

#[tokio::test]
async fn update_of_missing_note_is_not_found() {
    let (auth, _project) = start().await;
    let err = notes(auth)
        .update("missing", &draft("t", "d", false))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 404, .. }));
}

#[tokio::test]
async fn delete_filters_by_id() {
    let (auth, project) = start().await;
    notes(auth).delete("n1").await.unwrap();

    let calls = project.calls.lock();
    assert_eq!(calls[0].method, "DELETE");
    assert_eq!(calls[0].query.get("id").map(String::as_str), Some("eq.n1"));
}

#[tokio::test]
async fn blank_fields_and_missing_token_send_nothing() {
    let (auth, project) = start().await;

    let err = notes(auth.clone()).create(&draft(" ", "body", false)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let anonymous = NotesClient::new(auth, Arc::new(StaticToken::none())).unwrap();
    assert!(matches!(anonymous.list(NoteScope::Mine).await, Err(Error::AuthRequired)));
    assert!(matches!(anonymous.delete("n1").await, Err(Error::AuthRequired)));

    assert!(project.calls.lock().is_empty());
}
