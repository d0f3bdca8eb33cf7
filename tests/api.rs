use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use time::{OffsetDateTime, macros::datetime};
use tower::ServiceExt;
use uuid::Uuid;

use jam_hub_back::{
    clock::Clock,
    config::AppConfig,
    dao::{
        jam_store::memory::{MemoryJamStore, MemorySeed},
        models::{
            ConnectionRequestEntity, GameJamEntity, ProfileEntity, SessionEntity, SkillLevel,
            TeamEntity, UserEntity,
        },
    },
    routes,
    state::AppState,
};

const NOW: OffsetDateTime = datetime!(2024-01-02 12:00 UTC);
const ALICE_TOKEN: &str = "alice-session";
const BOB_TOKEN: &str = "bob-session";

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn user(n: u128, name: &str, username: Option<&str>) -> UserEntity {
    UserEntity {
        id: id(n),
        name: Some(name.into()),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        image: None,
        skill_level: SkillLevel::Beginner,
        date_joined: datetime!(2023-06-01 00:00 UTC),
        profile: username.map(|username| ProfileEntity {
            username: username.into(),
            bio: None,
        }),
        tag_ids: Vec::new(),
    }
}

fn jam(n: u128, name: &str, start: OffsetDateTime, end: OffsetDateTime, host: u128) -> GameJamEntity {
    GameJamEntity {
        id: id(n),
        name: name.into(),
        description: String::new(),
        start_date: start,
        end_date: end,
        host_ids: vec![id(host)],
        created_at: start,
        updated_at: start,
    }
}

fn app() -> Router {
    let seed = MemorySeed {
        users: vec![
            user(1, "Alice", Some("alice")),
            user(2, "Bob", Some("bob")),
            user(3, "Carol", Some("carol")),
            user(4, "Dave", None),
        ],
        connections: vec![ConnectionRequestEntity {
            id: id(40),
            sender_id: id(2),
            receiver_id: id(1),
            accepted: true,
        }],
        game_jams: vec![
            jam(10, "New Year Jam", datetime!(2024-01-01 00:00 UTC), datetime!(2024-01-03 00:00 UTC), 1),
            jam(11, "Autumn Jam", datetime!(2023-10-01 00:00 UTC), datetime!(2023-10-03 00:00 UTC), 2),
            jam(12, "Spring Jam", datetime!(2024-04-01 00:00 UTC), datetime!(2024-04-03 00:00 UTC), 2),
        ],
        teams: vec![TeamEntity {
            id: id(20),
            name: "Night Owls".into(),
            game_jam_id: id(10),
            member_ids: vec![id(1), id(3)],
        }],
        sessions: vec![
            SessionEntity {
                token: ALICE_TOKEN.into(),
                user_id: id(1),
                expires_at: datetime!(2024-02-01 00:00 UTC),
            },
            SessionEntity {
                token: BOB_TOKEN.into(),
                user_id: id(2),
                expires_at: datetime!(2024-02-01 00:00 UTC),
            },
        ],
        ..Default::default()
    };
    let clock = Clock::Fixed(NOW);
    let state = AppState::with_store(
        AppConfig::default(),
        clock,
        Arc::new(MemoryJamStore::from_seed(seed, clock)),
    );
    routes::router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn healthcheck_reports_ok_with_store() {
    let (status, body) = send(&app(), get("/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn users_listing_skips_profileless_and_paginates() {
    let app = app();
    let (status, body) = send(&app, get("/users?limit=2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    assert_eq!(body["users"][0]["handle"], "@alice");
    let cursor = body["next_cursor"].as_str().unwrap().to_owned();
    assert_eq!(cursor, id(3).to_string());

    let (_, body) = send(&app, get(&format!("/users?limit=2&cursor={cursor}"))).await;
    assert_eq!(body["users"][0]["username"], "carol");
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn users_listing_filters_by_name_case_insensitively() {
    let (_, body) = send(&app(), get("/users?q=CAR")).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["users"][0]["name"], "Carol");
}

#[tokio::test]
async fn users_limit_out_of_range_is_bad_request() {
    let (status, body) = send(&app(), get("/users?limit=101")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn user_by_username_splits_jams_into_buckets() {
    let (status, body) = send(&app(), get("/users/by-username/alice")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handle"], "@alice");
    assert!(body.get("email").is_none());
    assert_eq!(body["connections"][0]["handle"], "@bob");
    assert_eq!(body["current_game_jams"][0]["name"], "New Year Jam");
    assert_eq!(
        body["current_game_jams"][0]["teams"][0]["members"][1]["username"],
        "carol"
    );
    assert_eq!(body["previous_game_jams"], json!([]));
    assert_eq!(body["upcoming_game_jams"], json!([]));
}

#[tokio::test]
async fn missing_user_and_missing_profile_have_distinct_errors() {
    let app = app();
    let (status, body) = send(&app, get("/users/by-username/nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, get(&format!("/users/{}", id(4)))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ONBOARDING_REQUIRED");
}

#[tokio::test]
async fn me_requires_a_valid_session() {
    let app = app();
    let (status, body) = send(&app, get("/users/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {ALICE_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn update_user_is_idempotent_and_owner_only() {
    let app = app();
    let uri = format!("/users/{}", id(1));
    let patch = json!({"bio": "Makes chiptunes", "skill_level": "advanced"});

    let (status, first) = send(&app, with_json("PUT", &uri, Some(ALICE_TOKEN), patch.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(&app, with_json("PUT", &uri, Some(ALICE_TOKEN), patch.clone())).await;
    assert_eq!(first, second);
    assert_eq!(second["bio"], "Makes chiptunes");
    assert_eq!(second["skill_level"], "advanced");

    let (status, body) = send(&app, with_json("PUT", &uri, Some(BOB_TOKEN), patch)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn update_user_rejects_taken_username() {
    let uri = format!("/users/{}", id(1));
    let (status, body) = send(
        &app(),
        with_json("PUT", &uri, Some(ALICE_TOKEN), json!({"username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn gamejams_time_frame_filter() {
    let app = app();
    let (status, body) = send(&app, get("/gamejams?time_frame=current")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["game_jams"][0]["name"], "New Year Jam");
    assert_eq!(body["game_jams"][0]["team_count"], 1);
    assert_eq!(body["game_jams"][0]["participant_count"], 2);

    let (_, body) = send(&app, get("/gamejams")).await;
    let names: Vec<_> = body["game_jams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|jam| jam["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["Spring Jam", "New Year Jam", "Autumn Jam"]);
}

#[tokio::test]
async fn gamejams_unknown_time_frame_is_rejected() {
    let (status, body) = send(&app(), get("/gamejams?time_frame=someday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_ids_cursors_and_bodies_answer_json_bad_request() {
    let app = app();
    for uri in ["/users/not-a-uuid", "/users?cursor=zzz", "/gamejams/42"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "BAD_REQUEST", "{uri}");
    }

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/users/{}", id(1)))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {ALICE_TOKEN}"))
        .body(Body::from("{\"bio\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn gamejam_detail_and_not_found() {
    let app = app();
    let (status, body) = send(&app, get(&format!("/gamejams/{}", id(10)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hosts"][0]["handle"], "@alice");
    assert_eq!(body["teams"][0]["name"], "Night Owls");
    assert_eq!(body["start_date"], "2024-01-01T00:00:00Z");

    let (status, _) = send(&app, get(&format!("/gamejams/{}", id(99)))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_and_update_gamejam() {
    let app = app();
    let payload = json!({
        "id": "",
        "name": "Summer Jam",
        "start_date": "2024-07-01T00:00:00Z",
        "end_date": "2024-07-03T00:00:00Z"
    });

    let (status, _) = send(&app, with_json("POST", "/gamejams", None, payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) =
        send(&app, with_json("POST", "/gamejams", Some(BOB_TOKEN), payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["host_ids"], json!([id(2).to_string()]));
    assert_eq!(created["description"], "");

    let update = json!({
        "id": created["id"],
        "name": "Summer Jam XL",
        "description": "Bigger",
        "start_date": "2024-07-01T00:00:00Z",
        "end_date": "2024-07-05T00:00:00Z"
    });
    let (status, body) =
        send(&app, with_json("POST", "/gamejams", Some(ALICE_TOKEN), update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, updated) = send(&app, with_json("POST", "/gamejams", Some(BOB_TOKEN), update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["name"], "Summer Jam XL");
}

#[tokio::test]
async fn gamejam_with_reversed_dates_is_rejected() {
    let payload = json!({
        "name": "Backwards Jam",
        "start_date": "2024-07-05T00:00:00Z",
        "end_date": "2024-07-01T00:00:00Z"
    });
    let (status, body) = send(
        &app(),
        with_json("POST", "/gamejams", Some(ALICE_TOKEN), payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn degraded_state_answers_service_unavailable() {
    let app = routes::router(AppState::new(AppConfig::default()));

    let (status, body) = send(&app, get("/users")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

    let (_, body) = send(&app, get("/healthcheck")).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = send(&app(), get("/api-doc/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/gamejams"].is_object());
}

#[tokio::test]
async fn tags_endpoint_lists_catalogue() {
    let (status, body) = send(&app(), get("/tags")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tags": []}));
}
