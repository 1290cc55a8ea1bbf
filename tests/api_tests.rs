use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use playgraph_api::{
    config::Config,
    db::{create_redis_client, Cache},
    models::{Game, User},
    routes::{create_router, AppState},
    services::{FactProvider, GraphSeed, InMemoryGraph, Recommender},
};

fn user(id: &str, friends: &[&str], liked: &[&str]) -> User {
    let mut user = User::new(id, id.to_uppercase());
    for friend in friends {
        user.add_friend(playgraph_api::models::UserId::new(*friend));
    }
    for game in liked {
        user.add_liked(playgraph_api::models::GameId::new(*game));
    }
    user
}

/// Games only, for content-based and genre lookups
fn catalog_seed() -> GraphSeed {
    GraphSeed {
        games: vec![
            Game::new("chrono", "Chrono Quest")
                .with_genre("RPG")
                .with_platform("PC")
                .with_critic_score(8.8),
            Game::new("saga", "Time Saga")
                .with_genre("RPG")
                .with_platform("PC")
                .with_critic_score(9.1),
            Game::new("echoes", "Echoes")
                .with_genre("Adventure")
                .with_platform("PC")
                .with_critic_score(7.0),
            Game::new("kart", "Kart Rush")
                .with_genre("Racing")
                .with_platform("Switch")
                .with_critic_score(6.5),
        ],
        users: vec![],
    }
}

/// A small social graph around a handful of games
fn social_seed() -> GraphSeed {
    GraphSeed {
        games: vec![
            Game::new("nova", "Nova Drift").with_genre("Shooter").with_platform("Switch"),
            Game::new("star", "Star Path").with_genre("Puzzle").with_platform("Switch"),
            Game::new("relic", "Relic Hunt").with_genre("RPG").with_platform("PC"),
            Game::new("dune", "Dune Echo").with_genre("RPG").with_platform("PC"),
            Game::new("pong", "Pong Party").with_genre("Sports").with_platform("Switch"),
        ],
        users: vec![
            // two friends who both like Nova Drift
            user("u", &["f1", "f2"], &[]),
            user("f1", &[], &["nova"]),
            user("f2", &[], &["nova"]),
            // one friend, whose three friends all like Star Path
            user("c", &["g1"], &[]),
            user("g1", &["x1", "x2", "x3"], &["star"]),
            user("x1", &[], &["star"]),
            user("x2", &[], &["star"]),
            user("x3", &[], &["star"]),
            // RPG on PC fans
            user("p", &[], &["relic"]),
            user("q", &[], &["relic", "pong"]),
        ],
    }
}

async fn create_test_server(seed: GraphSeed) -> TestServer {
    let provider: Arc<dyn FactProvider> = Arc::new(InMemoryGraph::from_seed(seed));
    let config = Config::default();
    let recommender = Recommender::new(provider, config.max_results_limit)
        .await
        .unwrap();
    let state = AppState::new(Arc::new(recommender), &config);
    TestServer::new(create_router(state)).unwrap()
}

/// Server whose cache points at a port where no Redis listens
async fn create_server_with_unreachable_cache(seed: GraphSeed) -> TestServer {
    let provider: Arc<dyn FactProvider> = Arc::new(InMemoryGraph::from_seed(seed));
    let config = Config::default();
    let recommender = Recommender::new(provider, config.max_results_limit)
        .await
        .unwrap();
    let client = create_redis_client("redis://127.0.0.1:1").unwrap();
    let (cache, _writer) = Cache::new(client).await;
    let state = AppState::new(Arc::new(recommender), &config).with_cache(cache);
    TestServer::new(create_router(state)).unwrap()
}

fn recommendations(body: &Value) -> Vec<(String, u64, String)> {
    body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["game_name"].as_str().unwrap().to_string(),
                r["score"].as_u64().unwrap(),
                r["strategy"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(GraphSeed::default()).await;
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["fact_provider"], "in-memory");
    assert_eq!(body["cache_enabled"], false);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(GraphSeed::default()).await;
    let id = "6f1d2c1e-8a7b-4c3d-9e0f-112233445566";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_content_recommendations_by_shared_attributes() {
    let server = create_test_server(catalog_seed()).await;

    let response = server.get("/api/v1/recommendations/games/chrono").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["source"], "content");
    assert_eq!(body["subject"], "chrono");
    assert_eq!(body["max_results"], 10);
    assert_eq!(
        recommendations(&body),
        vec![
            ("Time Saga".to_string(), 2, "PERSONAL".to_string()),
            ("Echoes".to_string(), 1, "PERSONAL".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_max_truncates_results() {
    let server = create_test_server(catalog_seed()).await;

    let response = server.get("/api/v1/recommendations/games/chrono?max=1").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(
        recommendations(&body),
        vec![("Time Saga".to_string(), 2, "PERSONAL".to_string())]
    );
}

#[tokio::test]
async fn test_friend_recommendations() {
    let server = create_test_server(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/u/friends?max=1")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(
        recommendations(&body),
        vec![("Nova Drift".to_string(), 2, "COLLABORATIVE".to_string())]
    );
}

#[tokio::test]
async fn test_friend_recommendations_expand_to_friends_of_friends() {
    let server = create_test_server(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/c/friends?max=5")
        .await;
    response.assert_status_ok();

    // 1 from the direct friend plus 3 / 2 from friends-of-friends
    let body: Value = response.json();
    assert_eq!(
        recommendations(&body),
        vec![("Star Path".to_string(), 2, "COLLABORATIVE".to_string())]
    );
}

#[tokio::test]
async fn test_preference_recommendations() {
    let server = create_test_server(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/p/preferences")
        .await;
    response.assert_status_ok();

    // RPG (2) plus PC (1)
    let body: Value = response.json();
    assert_eq!(
        recommendations(&body),
        vec![("Dune Echo".to_string(), 3, "PERSONAL".to_string())]
    );
}

#[tokio::test]
async fn test_similar_user_recommendations() {
    let server = create_test_server(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/p/similar")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["source"], "similar_users");
    assert_eq!(
        recommendations(&body),
        vec![("Pong Party".to_string(), 1, "COLLABORATIVE".to_string())]
    );
}

#[tokio::test]
async fn test_genre_catalog_ranked_by_critic_score() {
    let server = create_test_server(catalog_seed()).await;

    let response = server.get("/api/v1/recommendations/genres/RPG").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(
        recommendations(&body),
        vec![
            ("Time Saga".to_string(), 91, "PERSONAL".to_string()),
            ("Chrono Quest".to_string(), 88, "PERSONAL".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_zero_max_is_bad_request() {
    let server = create_test_server(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/u/friends?max=0")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("max_results"));
}

#[tokio::test]
async fn test_negative_max_is_bad_request() {
    let server = create_test_server(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/u/friends?max=-1")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("max_results"));
}

#[tokio::test]
async fn test_non_numeric_max_is_bad_request() {
    let server = create_test_server(catalog_seed()).await;

    let response = server
        .get("/api/v1/recommendations/games/chrono?max=many")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("max_results"));
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_an_unreachable_cache() {
    let server = create_server_with_unreachable_cache(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/u/friends?max=0")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("max_results"));
}

#[tokio::test]
async fn test_unreachable_cache_falls_back_to_scoring() {
    let server = create_server_with_unreachable_cache(social_seed()).await;

    let response = server
        .get("/api/v1/recommendations/users/u/friends")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert!(!recommendations(&body).is_empty());

    let rebuild = server.post("/api/v1/admin/category-index/rebuild").await;
    rebuild.assert_status_ok();
    let body: Value = rebuild.json();
    assert_eq!(body["invalidated_cache_entries"], 0);
}

#[tokio::test]
async fn test_max_above_limit_is_bad_request() {
    let server = create_test_server(catalog_seed()).await;

    let response = server
        .get("/api/v1/recommendations/games/chrono?max=1000")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_user_gets_empty_list() {
    let server = create_test_server(social_seed()).await;

    for strategy in ["preferences", "friends", "similar"] {
        let response = server
            .get(&format!("/api/v1/recommendations/users/ghost/{}", strategy))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert!(body["recommendations"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_get_game() {
    let server = create_test_server(catalog_seed()).await;

    let response = server.get("/api/v1/games/saga").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Time Saga");
    assert_eq!(body["genres"], serde_json::json!(["RPG"]));

    let response = server.get("/api/v1/games/missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rebuild_category_index() {
    let server = create_test_server(catalog_seed()).await;

    let before: Value = server.get("/api/v1/admin/category-index").await.json();
    assert_eq!(before["genres"], 3);
    assert_eq!(before["platforms"], 2);
    assert_eq!(before["generation"], 0);

    let response = server.post("/api/v1/admin/category-index/rebuild").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["index"]["genres"], 3);
    assert_eq!(body["index"]["platforms"], 2);
    assert_eq!(body["index"]["developers"], 0);
    assert_eq!(body["index"]["generation"], 1);
    assert_eq!(body["invalidated_cache_entries"], 0);
}

#[tokio::test]
async fn test_demo_seed_file_serves_friend_recommendations() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/seed.json");
    let graph = InMemoryGraph::load_seed_file(path).await.unwrap();
    let provider: Arc<dyn FactProvider> = Arc::new(graph);
    let config = Config::default();
    let recommender = Recommender::new(provider, config.max_results_limit)
        .await
        .unwrap();
    let server =
        TestServer::new(create_router(AppState::new(Arc::new(recommender), &config))).unwrap();

    let response = server
        .get("/api/v1/recommendations/users/ada/friends")
        .await;
    response.assert_status_ok();

    // Dee is only reachable through Ben; a single friend-of-friend vote adds nothing
    let body: Value = response.json();
    assert_eq!(
        recommendations(&body),
        vec![
            ("Time Saga".to_string(), 2, "COLLABORATIVE".to_string()),
            ("Star Path".to_string(), 1, "COLLABORATIVE".to_string()),
            ("Dune Echo".to_string(), 0, "COLLABORATIVE".to_string()),
        ]
    );
}
