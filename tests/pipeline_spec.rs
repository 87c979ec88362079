//! End-to-end pipeline tests: generation → fan-out enrichment → aggregation
//! → persistence, against in-process mock collaborator services.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio_test::assert_ok;

use skilltrail::models::Difficulty;
use skilltrail::pipeline::{GeneratorClient, RecommenderClient, RoadmapSession, SessionState};
use skilltrail::store::{LocalStore, RemoteStore, RoadmapStore};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server died");
    });
    format!("http://{addr}")
}

/// The canonical 2 modules x 2 tasks roadmap, 30 estimated minutes per task.
fn sample_roadmap() -> serde_json::Value {
    serde_json::json!({
        "modules": [
            {
                "module_title": "Fundamentals",
                "prerequisites": [],
                "tasks": [
                    { "title": "Components", "description": "", "estimated_minutes": 30 },
                    { "title": "Props and state", "description": "", "estimated_minutes": 30 },
                ]
            },
            {
                "module_title": "Testing",
                "prerequisites": ["Fundamentals"],
                "tasks": [
                    { "title": "Unit testing", "description": "", "estimated_minutes": 30 },
                    { "title": "Integration testing", "description": "", "estimated_minutes": 30 },
                ]
            }
        ]
    })
}

/// Generator mock returning a fixed payload, optionally wrapped in the
/// `{"roadmap": ...}` envelope.
async fn spawn_generator(payload: serde_json::Value) -> String {
    spawn(Router::new().route("/", post(move || async move { Json(payload) }))).await
}

#[derive(Clone, Default)]
struct RecommenderLog {
    calls: Arc<Mutex<Vec<String>>>,
}

/// Recommender mock that records each requested topic and answers with a
/// video carrying no duration stamp.
async fn spawn_recommender(log: RecommenderLog) -> String {
    async fn handle(
        State(log): State<RecommenderLog>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        let topic = body["topic"].as_str().unwrap_or_default().to_string();
        log.calls.lock().unwrap().push(topic.clone());
        Json(serde_json::json!({
            "selected_video": {
                "url": format!("https://youtu.be/{topic}"),
                "title": format!("Learn {topic}"),
                "channel": "Mock Academy",
            },
            "candidates_considered": 5,
        }))
    }
    spawn(Router::new().route("/", post(handle)).with_state(log)).await
}

/// Recommender mock that fails every lookup.
async fn spawn_failing_recommender() -> String {
    spawn(Router::new().route(
        "/",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "quota exceeded" })),
            )
        }),
    ))
    .await
}

fn test_store() -> RoadmapStore {
    let local = LocalStore::open_memory().expect("Failed to create database");
    local.migrate().expect("Failed to migrate");
    RoadmapStore::new(local, RemoteStore::new("http://192.0.2.1:9", None))
}

fn session(generator_url: &str, recommender_url: &str) -> RoadmapSession {
    RoadmapSession::new(
        GeneratorClient::new(generator_url),
        RecommenderClient::new(recommender_url),
        test_store(),
    )
}

mod generation {
    use super::*;

    #[tokio::test]
    async fn blank_topic_or_goal_is_a_noop() {
        let mut session = session("http://192.0.2.1:9", "http://192.0.2.1:9");

        assert_ok!(session.generate("", "React", Difficulty::Beginner).await);
        assert_ok!(session.generate("Testing", "   ", Difficulty::Beginner).await);

        assert_eq!(*session.state(), SessionState::Idle);
        assert!(session.draft().is_none());
    }

    #[tokio::test]
    async fn accepts_a_bare_roadmap_object() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_recommender(RecommenderLog::default()).await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        assert_eq!(*session.state(), SessionState::Generated);
        assert_eq!(session.draft().unwrap().content.task_count(), 4);
    }

    #[tokio::test]
    async fn accepts_the_roadmap_envelope() {
        let generator = spawn_generator(serde_json::json!({ "roadmap": sample_roadmap() })).await;
        let recommender = spawn_recommender(RecommenderLog::default()).await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        assert_eq!(session.draft().unwrap().content.modules.len(), 2);
    }

    #[tokio::test]
    async fn http_failure_enters_failed_state_with_no_partial_roadmap() {
        let generator = spawn(Router::new().route(
            "/",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(serde_json::json!({ "error": "model overloaded" })),
                )
            }),
        ))
        .await;
        let mut session = session(&generator, "http://192.0.2.1:9");

        let result = session.generate("Testing", "React", Difficulty::Beginner).await;
        assert!(result.is_err());
        assert!(matches!(session.state(), SessionState::Failed(_)));
        assert!(session.draft().is_none());
    }

    #[tokio::test]
    async fn combines_topic_and_goal_into_one_goal_string() {
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_by_handler = seen.clone();
        let generator = spawn(Router::new().route(
            "/",
            post(move |Json(body): Json<serde_json::Value>| async move {
                *seen_by_handler.lock().unwrap() =
                    body["goal"].as_str().unwrap_or_default().to_string();
                Json(serde_json::json!({ "modules": [] }))
            }),
        ))
        .await;
        let mut session = session(&generator, "http://192.0.2.1:9");

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        assert_eq!(*seen.lock().unwrap(), "Testing - React");
    }
}

mod enrichment {
    use super::*;

    #[tokio::test]
    async fn makes_exactly_one_lookup_per_task_keyed_by_title() {
        let log = RecommenderLog::default();
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_recommender(log.clone()).await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        session.await_enrichment().await;

        let calls = log.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        let distinct: BTreeSet<&String> = calls.iter().collect();
        assert_eq!(distinct.len(), 4);

        for title in ["Components", "Props and state", "Unit testing", "Integration testing"] {
            let slot = session.enrichment().slot(title).expect("slot missing");
            assert!(!slot.loading);
            assert!(slot.resource.is_some(), "no resource for {title}");
        }
    }

    #[tokio::test]
    async fn failed_lookups_degrade_to_no_resource_not_an_error() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_failing_recommender().await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        session.await_enrichment().await;

        // The session is still healthy; every slot settled without a video.
        assert_eq!(*session.state(), SessionState::Generated);
        let slot = session.enrichment().slot("Components").expect("slot missing");
        assert!(!slot.loading);
        assert!(slot.resource.is_none());
        assert!(slot.error.is_some());
    }

    #[tokio::test]
    async fn all_lookups_failing_totals_the_estimated_hours() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_failing_recommender().await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        session.await_enrichment().await;

        // 4 tasks x 30 estimated minutes = 2.0 hours.
        assert_eq!(session.total_hours_label().unwrap(), "2.0");
    }

    #[tokio::test]
    async fn lookups_report_loading_until_settled() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn(Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Json(serde_json::json!({
                    "selected_video": {
                        "url": "https://youtu.be/x",
                        "title": "x",
                        "channel": "x",
                    }
                }))
            }),
        ))
        .await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        assert!(session.enrichment().any_loading());
        let slot = session.enrichment().slot("Components").expect("slot missing");
        assert!(slot.loading);

        session.await_enrichment().await;
        assert!(!session.enrichment().any_loading());
        let slot = session.enrichment().slot("Components").expect("slot missing");
        assert!(!slot.loading);
        assert!(slot.resource.is_some());
    }

    #[tokio::test]
    async fn stale_session_results_never_reach_the_new_session() {
        // First generation's tasks resolve slowly; the session is superseded
        // before any of them settle.
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_by_handler = hits.clone();
        let generator = spawn(Router::new().route(
            "/",
            post(move || {
                let first = hits_by_handler.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    let title = if first { "Stale task" } else { "Fresh task" };
                    Json(serde_json::json!({
                        "modules": [{
                            "module_title": "Only module",
                            "prerequisites": [],
                            "tasks": [
                                { "title": title, "description": "", "estimated_minutes": 10 }
                            ]
                        }]
                    }))
                }
            }),
        ))
        .await;
        let recommender = spawn(Router::new().route(
            "/",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body["topic"] == "Stale task" {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                Json(serde_json::json!({
                    "selected_video": {
                        "url": "https://youtu.be/x",
                        "title": "x",
                        "channel": "x",
                    }
                }))
            }),
        ))
        .await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Old topic", "old goal", Difficulty::Beginner).await);
        assert_ok!(session.generate("New topic", "new goal", Difficulty::Beginner).await);
        session.await_enrichment().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(session.enrichment().slot("Stale task").is_none());
        let fresh = session.enrichment().slot("Fresh task").expect("slot missing");
        assert!(fresh.resource.is_some());
    }
}

mod saving {
    use super::*;

    #[tokio::test]
    async fn start_learning_without_owner_saves_locally_and_round_trips() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_recommender(RecommenderLog::default()).await;
        let store = test_store();
        let mut session = RoadmapSession::new(
            GeneratorClient::new(generator.as_str()),
            RecommenderClient::new(recommender.as_str()),
            store.clone(),
        );

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        session.await_enrichment().await;

        let id = session.start_learning(None).await.expect("Save failed");
        assert!(id.is_local());
        assert_eq!(*session.state(), SessionState::Saved(id.clone()));

        let saved = store.get(&id).await.expect("Get failed").expect("Missing roadmap");
        assert_eq!(saved.topic, "Testing");
        assert_eq!(saved.content.modules.len(), 2);
        // The enrichment map was embedded into the persisted document.
        assert_eq!(saved.content.video_resources.len(), 4);
    }

    #[tokio::test]
    async fn start_learning_is_rejected_outside_generated_state() {
        let mut session = session("http://192.0.2.1:9", "http://192.0.2.1:9");
        assert!(session.start_learning(None).await.is_err());
    }

    #[tokio::test]
    async fn generation_state_is_cleared_after_save_preventing_a_double_save() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_recommender(RecommenderLog::default()).await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        session.start_learning(None).await.expect("Save failed");

        assert!(session.draft().is_none());
        assert!(session.start_learning(None).await.is_err());
    }

    #[tokio::test]
    async fn reset_returns_to_idle_from_any_state() {
        let generator = spawn_generator(sample_roadmap()).await;
        let recommender = spawn_recommender(RecommenderLog::default()).await;
        let mut session = session(&generator, &recommender);

        assert_ok!(session.generate("Testing", "React", Difficulty::Beginner).await);
        session.reset();

        assert_eq!(*session.state(), SessionState::Idle);
        assert!(session.draft().is_none());
        assert!(session.enrichment().slot("Components").is_none());
    }
}
