//! Review actions, task allocation, and export against a mock backend.

use labelwise_client::{keys, ClientConfig, ProjectAdmin, SampleReview, Session};
use labelwise_core::{AssignmentForm, Error, ExportOptions, LineItemStatus, MessageDraft, SampleAction};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn session_as(server: &MockServer, is_superuser: bool) -> Session {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "email": "reviewer@example.com",
            "is_active": true,
            "is_superuser": is_superuser,
            "full_name": "Rae Viewer"
        })))
        .mount(server)
        .await;
    let config = ClientConfig::default()
        .with_api_url(server.uri())
        .with_token(Some("tok-1".into()))
        .with_retry_delays(1, 5);
    let session = Session::new(&config).unwrap();
    session.restore().await.unwrap();
    session
}

fn sample_json() -> serde_json::Value {
    let message = |id: i64, index: i64, role: &str, content: &str| {
        json!({
            "id": id,
            "line_message_index": index,
            "role": role,
            "content": content,
            "feedback": null,
            "created_at": "2025-05-01T08:00:00",
            "updated_at": "2025-05-01T08:00:00"
        })
    };
    json!({
        "id": 1007,
        "project_id": 4,
        "line_index": 7,
        "status": "UNLABELED",
        "tools": [],
        "feedback": null,
        "line_messages": [
            message(70, 0, "system", "You are terse."),
            message(71, 1, "user", "Capital of France?"),
            message(72, 2, "assistant", "<think>\n recall \n</think>\n\nParis"),
        ],
        "created_at": "2025-05-01T08:00:00",
        "updated_at": "2025-05-01T08:00:00"
    })
}

async fn mount_sample(server: &MockServer, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/4/samples/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_json()))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_confirm_sends_full_snapshot_and_invalidates_sample() {
    let server = MockServer::start().await;
    let session = session_as(&server, false).await;
    mount_sample(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/4/confirm/1007"))
        .and(body_partial_json(json!({"status": "CONFIRMED", "feedback": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Line item confirmed"})))
        .expect(1)
        .mount(&server)
        .await;

    let review = SampleReview::new(session.clone(), 4);
    let response = review.submit_index(7, SampleAction::Confirm).await.unwrap();
    assert_eq!(response.message, "Line item confirmed");

    let requests = server.received_requests().await.unwrap();
    let confirm = requests
        .iter()
        .find(|r| r.url.path() == "/api/v1/projects/4/confirm/1007")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&confirm.body).unwrap();
    let messages = body["line_messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2]["id"], 72);
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(messages[2]["content"], "<think>recall</think>\nParis");
    assert_eq!(body["tools"], json!([]));

    // The submitted sample was invalidated, so this refetches.
    review.load(7).await.unwrap();
}

#[tokio::test]
async fn test_non_superuser_cannot_approve() {
    let server = MockServer::start().await;
    let session = session_as(&server, false).await;
    mount_sample(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/4/confirm/1007"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(0)
        .mount(&server)
        .await;

    let review = SampleReview::new(session, 4);
    assert_eq!(review.available_actions(), vec![SampleAction::Confirm]);

    let err = review
        .submit_index(7, SampleAction::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn test_superuser_reject_sets_target_status() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;
    mount_sample(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/4/confirm/1007"))
        .and(body_partial_json(json!({"status": "REJECTED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Line item rejected"})))
        .expect(1)
        .mount(&server)
        .await;

    let review = SampleReview::new(session, 4);
    assert_eq!(review.available_actions().len(), 3);
    review
        .submit_index(7, SampleAction::Reject)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_edit_message_joins_think_block() {
    let server = MockServer::start().await;
    let session = session_as(&server, false).await;
    mount_sample(&server, 1).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/projects/4/messages/72"))
        .and(body_partial_json(json!({
            "role": "assistant",
            "content": "<think>check capitals</think>\nParis, France"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 72,
            "line_message_index": 2,
            "role": "assistant",
            "content": "<think>check capitals</think>\nParis, France",
            "created_at": "2025-05-01T08:00:00",
            "updated_at": "2025-05-02T08:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let review = SampleReview::new(session.clone(), 4);
    let item = review.load(7).await.unwrap();
    let mut draft = MessageDraft::from_message(&item.line_messages[2]);
    assert_eq!(draft.think, "recall");
    draft.think = " check capitals ".into();
    draft.body = "Paris, France\n".into();

    let updated = review.edit_message(7, &draft).await.unwrap();
    assert_eq!(updated.id, 72);
    assert!(session.cache().get_fresh::<serde_json::Value>(&keys::sample(4, 7)).await.is_none());
}

#[tokio::test]
async fn test_failed_assignment_keeps_form() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/4/assign"))
        .and(body_partial_json(json!({"user_id": 12, "num_samples": 5})))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Not enough line items to assign"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let admin = ProjectAdmin::new(session);
    let mut form = AssignmentForm::new(20);
    form.select_user(Some(12));
    form.set_num_samples(5);

    let err = admin.assign(4, &mut form).await.unwrap_err();
    assert_eq!(err.notice(), "Not enough line items to assign");
    assert_eq!(form.selected_user(), Some(12));
    assert_eq!(form.num_samples(), 5);
}

#[tokio::test]
async fn test_assignment_resets_form_and_refreshes_status() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects/4/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "SUCCESS",
            "num_samples": 20,
            "num_task_assigned": 0,
            "num_task_not_assigned": 20,
            "user_task_summary": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/4/assign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Tasks assigned"})))
        .expect(1)
        .mount(&server)
        .await;

    let admin = ProjectAdmin::new(session);
    let status = admin.status(4).await.unwrap();
    let mut form = AssignmentForm::new(status.num_task_not_assigned());
    form.select_user(Some(12));
    form.set_num_samples(5);

    admin.assign(4, &mut form).await.unwrap();
    assert_eq!(form.selected_user(), None);
    assert_eq!(form.num_samples(), 1);

    admin.status(4).await.unwrap();
}

#[tokio::test]
async fn test_download_writes_jsonl_file() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;
    let payload = "{\"messages\":[]}\n{\"messages\":[]}\n";

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/4/download"))
        .and(body_partial_json(json!({
            "file_name": "Support-chats-approved",
            "include_statuses": ["APPROVED"],
            "limit": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = ExportOptions::new(4, Some("Support chats"));
    options.include_statuses = vec![LineItemStatus::Approved];
    options.limit = Some(2);
    options.file_name = "Support chats / approved!".into();

    let dir = tempfile::tempdir().unwrap();
    let written = ProjectAdmin::new(session)
        .download(4, &options, dir.path())
        .await
        .unwrap();

    assert_eq!(
        written.file_name().and_then(|n| n.to_str()),
        Some("Support-chats-approved.jsonl")
    );
    assert_eq!(std::fs::read_to_string(&written).unwrap(), payload);
}

#[tokio::test]
async fn test_invalid_export_options_never_sent() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;

    let mut options = ExportOptions::new(4, None);
    options.include_statuses.clear();

    let dir = tempfile::tempdir().unwrap();
    let err = ProjectAdmin::new(session)
        .download(4, &options, dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .all(|r| !r.url.path().ends_with("/download")));
}

async fn mount_allocated_status(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/4/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "SUCCESS",
            "num_samples": 20,
            "num_task_assigned": 17,
            "num_task_not_assigned": 3,
            "user_task_summary": [
                {"user_id": 12, "full_name": "Ana", "email": "ana@example.com", "task_count": 5}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_modify_tasks_caps_at_held_plus_unassigned() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;
    mount_allocated_status(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/projects/4/tasks"))
        .and(wiremock::matchers::body_json(json!({"user_id": 12, "new_num_samples": 8})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Tasks updated"})))
        .expect(1)
        .mount(&server)
        .await;

    let admin = ProjectAdmin::new(session);
    admin.modify_tasks(4, 12, 10_000).await.unwrap();
}

#[tokio::test]
async fn test_modify_tasks_allows_zero() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;
    mount_allocated_status(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/projects/4/tasks"))
        .and(wiremock::matchers::body_json(json!({"user_id": 12, "new_num_samples": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Tasks updated"})))
        .expect(1)
        .mount(&server)
        .await;

    let admin = ProjectAdmin::new(session);
    admin.modify_tasks(4, 12, 0).await.unwrap();
}

#[tokio::test]
async fn test_modify_tasks_for_unassigned_user_not_sent() {
    let server = MockServer::start().await;
    let session = session_as(&server, true).await;
    mount_allocated_status(&server).await;

    let err = ProjectAdmin::new(session)
        .modify_tasks(4, 99, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .all(|r| r.url.path() != "/api/v1/projects/4/tasks"));
}
