//! End-to-end tests through the full router: bootstrap, seeding and the
//! REST surface, against each storage backend.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use roster_server::{
    api::create_router,
    bootstrap,
    config::{Config, StoreBackend},
    features::FeatureState,
};

struct TestApp {
    router: Router,
    state: FeatureState,
    // Keeps the SQLite file alive for the duration of the test
    _dir: Option<TempDir>,
}

impl TestApp {
    async fn new(store: StoreBackend, seed: bool) -> Self {
        let mut config = Config {
            store,
            ..Config::default()
        };
        config.seed.enabled = seed;

        let dir = match store {
            StoreBackend::Sql => {
                let dir = TempDir::new().unwrap();
                config.database.url =
                    format!("sqlite://{}", dir.path().join("roster.db").display());
                Some(dir)
            },
            _ => None,
        };

        let state = bootstrap::build_state(&config).await.unwrap();
        bootstrap::seed_all(&state, &config.seed).await.unwrap();

        Self {
            router: create_router(state.clone(), &config),
            state,
            _dir: dir,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }
}

const BACKENDS: [StoreBackend; 3] = [
    StoreBackend::Sql,
    StoreBackend::Memory,
    StoreBackend::Collection,
];

#[tokio::test]
async fn test_seeded_employees_listed_in_insertion_order() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, true).await;

        let (status, body) = app.get("/api/employee").await;
        assert_eq!(status, StatusCode::OK, "{backend}");

        let employees = body.as_array().unwrap();
        assert_eq!(employees.len(), 3, "{backend}");
        let last_names: Vec<&str> = employees
            .iter()
            .map(|e| e["lastName"].as_str().unwrap())
            .collect();
        assert_eq!(last_names, vec!["Andrews", "Baumgarten", "Gupta"], "{backend}");
        let ids: Vec<i64> = employees.iter().map(|e| e["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3], "{backend}");

        let (status, body) = app.get("/api/employee/5").await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{backend}");
        assert_eq!(body, json!({ "id not found": 5 }), "{backend}");
    }
}

#[tokio::test]
async fn test_student_lifecycle() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, false).await;
        let nikhil = json!({
            "firstName": "Nikhil",
            "lastName": "Singh",
            "email": "code.nikhil20@gmail.com"
        });

        let (status, created) = app.request(Method::POST, "/api/student", Some(nikhil)).await;
        assert_eq!(status, StatusCode::CREATED, "{backend}");
        assert_eq!(created["id"], 1, "{backend}");

        let (status, found) = app.get("/api/student/1").await;
        assert_eq!(status, StatusCode::OK, "{backend}");
        assert_eq!(found["firstName"], "Nikhil");
        assert_eq!(found["lastName"], "Singh");
        assert_eq!(found["email"], "code.nikhil20@gmail.com");

        let (status, body) = app.request(Method::DELETE, "/api/student/1", None).await;
        assert_eq!(status, StatusCode::OK, "{backend}");
        assert_eq!(body, json!({ "deleted": 1 }));

        let (status, body) = app.get("/api/student/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{backend}");
        assert_eq!(body, json!({ "id not found": 1 }));
    }
}

#[tokio::test]
async fn test_delete_where_last_name() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, false).await;
        for (first, last) in [
            ("Arjun", "Dev"),
            ("Nikhil", "Singh"),
            ("Kavya", "Dev"),
            ("Ritik", "Nandan"),
        ] {
            let (status, _) = app
                .request(
                    Method::POST,
                    "/api/student",
                    Some(json!({ "firstName": first, "lastName": last })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = app
            .request(Method::DELETE, "/api/student?field=lastName&value=Dev", None)
            .await;
        assert_eq!(status, StatusCode::OK, "{backend}");
        assert_eq!(body, json!({ "deleted": 2 }), "{backend}");

        let (_, body) = app.get("/api/student").await;
        let remaining: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["firstName"].as_str().unwrap())
            .collect();
        assert_eq!(remaining, vec!["Nikhil", "Ritik"], "{backend}");
    }
}

#[tokio::test]
async fn test_find_all_after_saves_and_deletes() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, false).await;
        const N: i64 = 6;

        for i in 0..N {
            app.request(
                Method::POST,
                "/api/employee",
                Some(json!({ "firstName": format!("Emp{i}"), "lastName": "Staff" })),
            )
            .await;
        }
        for id in [2, 5] {
            let (status, _) = app
                .request(Method::DELETE, &format!("/api/employee/{id}"), None)
                .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = app.get("/api/employee").await;
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3, 4, 6], "{backend}");

        // Ids are not handed out twice
        let (_, created) = app
            .request(
                Method::POST,
                "/api/employee",
                Some(json!({ "firstName": "Late", "lastName": "Hire" })),
            )
            .await;
        assert_eq!(created["id"], N + 1, "{backend}");
    }
}

#[tokio::test]
async fn test_update_through_put() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, true).await;

        let (status, body) = app
            .request(
                Method::PUT,
                "/api/student/2",
                Some(json!({
                    "firstName": "Ritik",
                    "lastName": "Nandan",
                    "email": "ritik@example.com"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{backend}");
        assert_eq!(body["id"], 2);

        let (_, found) = app.get("/api/student/2").await;
        assert_eq!(found["email"], "ritik@example.com", "{backend}");
        assert_eq!(app.state.students.count().await.unwrap(), 3, "{backend}");
    }
}

#[tokio::test]
async fn test_put_after_delete_does_not_recreate() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, true).await;

        let (status, _) = app.request(Method::DELETE, "/api/student/1", None).await;
        assert_eq!(status, StatusCode::OK, "{backend}");

        let (status, body) = app
            .request(
                Method::PUT,
                "/api/student/1",
                Some(json!({ "firstName": "Nikhil", "lastName": "Kumar" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{backend}");
        assert_eq!(body, json!({ "id not found": 1 }));

        let (_, body) = app.get("/api/student").await;
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 3], "{backend}");
    }
}

#[tokio::test]
async fn test_bad_input_is_rejected_without_side_effects() {
    let app = TestApp::new(StoreBackend::Sql, true).await;

    let (status, body) = app.get("/api/student/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/employee",
            Some(json!({ "firstName": "Ghost", "lastName": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .request(
            Method::DELETE,
            "/api/employee?field=lastName%20OR%201%3D1&value=x",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.state.employees.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_seeded_sql_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", dir.path().join("roster.db").display());

    {
        let state = bootstrap::build_state(&config).await.unwrap();
        bootstrap::seed_all(&state, &config.seed).await.unwrap();
    }

    // Second start must not seed the same rows again
    let state = bootstrap::build_state(&config).await.unwrap();
    bootstrap::seed_all(&state, &config.seed).await.unwrap();
    assert_eq!(state.students.count().await.unwrap(), 3);
    assert_eq!(state.employees.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_health_per_backend() {
    for backend in BACKENDS {
        let app = TestApp::new(backend, false).await;
        let (status, body) = app.get("/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], backend.to_string());
    }
}
