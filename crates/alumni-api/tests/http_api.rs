//! HTTP-level tests: routing, auth, status codes and response shapes.

mod common;

use alumni_api::{AppState, build_router};
use alumni_common::auth::Identity;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{alumni, student, test_state, token};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, who: &Identity) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token(who)))
        .body(Body::empty())
        .unwrap()
}

fn with_json(method: &str, uri: &str, who: &Identity, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token(who)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn open_request(state: &AppState, who: &Identity, mentor: &Identity) -> Uuid {
    let (status, body) = send(
        state,
        with_json(
            "POST",
            "/api/v1/mentorships",
            who,
            json!({
                "alumni_id": mentor.user_id,
                "message": "Could you help me prepare for interviews?",
                "topic": "Interview prep",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn accept(state: &AppState, mentor: &Identity, id: Uuid) {
    let (status, body) = send(
        state,
        with_json(
            "PATCH",
            &format!("/api/v1/mentorships/{id}/status"),
            mentor,
            json!({ "status": "accepted" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (state, _dir) = test_state().await;
    let req = Request::builder()
        .uri("/api/v1/mentorships")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    let (state, _dir) = test_state().await;
    let req = Request::builder()
        .uri("/api/v1/mentorships")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let (state, _dir) = test_state().await;
    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_and_list_views() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;

    let id = open_request(&state, &sam, &mentor).await;

    let (status, body) = send(&state, get("/api/v1/mentorships", &mentor)).await;
    assert_eq!(status, StatusCode::OK);
    let entry = &body.as_array().unwrap()[0];
    assert_eq!(entry["id"], id.to_string());
    assert_eq!(entry["status"], "pending");
    assert!(entry.get("resume_url").is_none());
    assert!(entry["student"].get("resume_url").is_none());

    let (_, body) = send(&state, get("/api/v1/mentorships", &sam)).await;
    assert!(body[0]["resume_url"].is_string());

    let (status, body) = send(
        &state,
        get("/api/v1/mentorships?status=accepted&archived=false", &mentor),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_student_hits_capacity() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 1).await;
    let sam = student(&state, "Sam").await;
    let kim = student(&state, "Kim").await;

    let id = open_request(&state, &sam, &mentor).await;
    accept(&state, &mentor, id).await;

    let (status, body) = send(
        &state,
        with_json(
            "POST",
            "/api/v1/mentorships",
            &kim,
            json!({ "alumni_id": mentor.user_id, "message": "Hello", "topic": "Anything" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CAPACITY_EXCEEDED");

    let (_, body) = send(&state, get("/api/v1/mentors", &kim)).await;
    assert_eq!(body[0]["available_slots"], 0);
}

#[tokio::test]
async fn test_unknown_status_is_a_validation_error() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;
    let id = open_request(&state, &sam, &mentor).await;

    for bad in ["Active", "pending", "completed"] {
        let (status, body) = send(
            &state,
            with_json(
                "PATCH",
                &format!("/api/v1/mentorships/{id}/status"),
                &mentor,
                json!({ "status": bad }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_removed_conversation_is_forbidden() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;
    let id = open_request(&state, &sam, &mentor).await;
    accept(&state, &mentor, id).await;

    let (status, body) = send(
        &state,
        with_json(
            "POST",
            &format!("/api/v1/mentorships/{id}/messages"),
            &sam,
            json!({ "text": "Thanks for accepting!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &state,
        with_json(
            "PATCH",
            &format!("/api/v1/mentorships/{id}/status"),
            &mentor,
            json!({ "status": "removed", "response": "Wrapping up" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&state, get(&format!("/api/v1/mentorships/{id}"), &sam)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_conversation_flow_over_http() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;
    let id = open_request(&state, &sam, &mentor).await;
    accept(&state, &mentor, id).await;

    let (_, body) = send(
        &state,
        with_json(
            "POST",
            &format!("/api/v1/mentorships/{id}/messages"),
            &mentor,
            json!({ "text": "Welcome! What are you working on?" }),
        ),
    )
    .await;
    let message_id = body[0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &state,
        with_json("POST", &format!("/api/v1/mentorships/{id}/read"), &sam, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (status, body) = send(
        &state,
        with_json("POST", &format!("/api/v1/mentorships/{id}/mute"), &sam, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_muted"], true);

    let (status, _) = send(
        &state,
        with_json(
            "POST",
            &format!("/api/v1/mentorships/{id}/notes"),
            &mentor,
            json!({ "text": "Motivated, needs portfolio work" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, student_view) = send(&state, get(&format!("/api/v1/mentorships/{id}"), &sam)).await;
    assert!(student_view.get("mentor_notes").is_none());
    assert_eq!(student_view["unread_count"], 0);
    assert_eq!(student_view["is_muted"], true);

    let (_, mentor_view) = send(&state, get(&format!("/api/v1/mentorships/{id}"), &mentor)).await;
    assert_eq!(mentor_view["mentor_notes"].as_array().unwrap().len(), 1);

    let delete = |who: &Identity| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/mentorships/{id}/messages/{message_id}"))
            .header(header::AUTHORIZATION, format!("Bearer {}", token(who)))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&state, delete(&sam)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&state, delete(&mentor)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_mentoring_settings() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;

    let (status, _) = send(
        &state,
        with_json(
            "PUT",
            "/api/v1/users/@me/mentoring",
            &sam,
            json!({ "mentoring_enabled": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for capacity in [0, 1000] {
        let (status, _) = send(
            &state,
            with_json(
                "PUT",
                "/api/v1/users/@me/mentoring",
                &mentor,
                json!({ "mentoring_enabled": true, "mentorship_capacity": capacity }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "capacity {capacity}");
    }

    let (status, body) = send(
        &state,
        with_json(
            "PUT",
            "/api/v1/users/@me/mentoring",
            &mentor,
            json!({ "mentoring_enabled": true, "mentorship_capacity": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mentorship_capacity"], 5);

    let (_, me) = send(&state, get("/api/v1/users/@me", &mentor)).await;
    assert_eq!(me["role"], "alumni");
    assert_eq!(me["mentoring_enabled"], true);

    let (_, mentors) = send(&state, get("/api/v1/mentors", &sam)).await;
    assert_eq!(mentors[0]["available_slots"], 5);
}

#[tokio::test]
async fn test_capacity_cannot_drop_below_accepted() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    for name in ["Sam", "Kim"] {
        let mentee = student(&state, name).await;
        let id = open_request(&state, &mentee, &mentor).await;
        accept(&state, &mentor, id).await;
    }

    let settings = |capacity: i64| {
        with_json(
            "PUT",
            "/api/v1/users/@me/mentoring",
            &mentor,
            json!({ "mentoring_enabled": true, "mentorship_capacity": capacity }),
        )
    };

    let (status, body) = send(&state, settings(1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (_, me) = send(&state, get("/api/v1/users/@me", &mentor)).await;
    assert_eq!(me["mentorship_capacity"], 2);

    let (status, body) = send(&state, settings(2)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["mentorship_capacity"], 2);

    // Turning mentoring off without a capacity keeps the current one.
    let (status, body) = send(
        &state,
        with_json(
            "PUT",
            "/api/v1/users/@me/mentoring",
            &mentor,
            json!({ "mentoring_enabled": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["mentoring_enabled"], false);
}

fn files_under(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .map(|entry| entry.unwrap().path())
        .map(|path| if path.is_dir() { files_under(&path) } else { 1 })
        .sum()
}

fn multipart(uri: &str, who: &Identity, fields: &[(&str, &str)], file: (&str, &str, &[u8])) -> Request<Body> {
    const BOUNDARY: &str = "alumni-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    let (file_name, content_type, data) = file;
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token(who)))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_image_upload_is_stored_and_served() {
    let (state, _dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;
    let id = open_request(&state, &sam, &mentor).await;
    accept(&state, &mentor, id).await;

    let png: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";
    let (status, body) = send(
        &state,
        multipart(
            &format!("/api/v1/mentorships/{id}/messages/upload"),
            &sam,
            &[("text", "My portfolio landing page")],
            ("landing page.png", "image/png", png),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let sent = &body[0];
    assert_eq!(sent["message_type"], "image");
    assert_eq!(sent["file_name"], "landing page.png");
    assert_eq!(sent["file_size"], png.len());
    let url = sent["file_url"].as_str().unwrap();
    assert!(url.starts_with("/files/messages/"), "{url}");

    let response = build_router(state.clone())
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], png);
}

#[tokio::test]
async fn test_upload_to_pending_mentorship_stores_nothing() {
    let (state, dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;
    let id = open_request(&state, &sam, &mentor).await;

    let (status, _) = send(
        &state,
        multipart(
            &format!("/api/v1/mentorships/{id}/messages/upload"),
            &sam,
            &[],
            ("cv.pdf", "application/pdf", &b"%PDF-1.7"[..]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!dir.path().join("messages").exists());
}

#[tokio::test]
async fn test_resume_upload_updates_profile() {
    let (state, _dir) = test_state().await;
    let sam = student(&state, "Sam").await;

    let mut req = multipart(
        "/api/v1/users/@me/resume",
        &sam,
        &[],
        ("resume.pdf", "application/pdf", &b"%PDF-1.7 resume"[..]),
    );
    *req.method_mut() = axum::http::Method::PUT;

    let (status, body) = send(&state, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["resume_url"].as_str().unwrap();
    assert!(url.starts_with("/files/resumes/"), "{url}");
    assert!(url.ends_with("/resume.pdf"), "{url}");

    let mut blocked = multipart(
        "/api/v1/users/@me/resume",
        &sam,
        &[],
        ("setup.exe", "application/x-msdownload", &b"MZ"[..]),
    );
    *blocked.method_mut() = axum::http::Method::PUT;
    let (status, _) = send(&state, blocked).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rejected_upload_message_is_not_kept() {
    let (state, dir) = test_state().await;
    let mentor = alumni(&state, "Ada", 2).await;
    let sam = student(&state, "Sam").await;
    let id = open_request(&state, &sam, &mentor).await;
    accept(&state, &mentor, id).await;

    let caption = "x".repeat(state.limits.max_message_length + 1);
    let (status, body) = send(
        &state,
        multipart(
            &format!("/api/v1/mentorships/{id}/messages/upload"),
            &sam,
            &[("text", caption.as_str())],
            ("notes.pdf", "application/pdf", &b"%PDF-1.7"[..]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(files_under(&dir.path().join("messages")), 0);
}
