use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use customerlake::config::ApiConfig;
use customerlake::database::PlatformDatabase;
use customerlake::server::{build_router, create_state, seed_demo_data};
use serde_json::{json, Value};
use tower::ServiceExt;

const BASE: &str = "/api/rest";

async fn app() -> Router {
    let database = PlatformDatabase::in_memory().await.unwrap();
    let state = create_state(&database).await.unwrap();
    seed_demo_data(&state).await.unwrap();
    build_router(state, &ApiConfig { base_path: BASE.to_string() })
}

async fn send(
    app: &Router,
    method: Method,
    path: &str,
    customer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(format!("{}{}", BASE, path));
    if let Some(customer) = customer {
        builder = builder.header("X-Customer-ID", customer);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, value)
}

fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check_is_outside_base_path() {
    let app = app().await;
    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/projects").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_customer_selector_listing() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/customers", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let customers = body.as_array().unwrap();
    assert_eq!(customers.len(), 2);
    assert_eq!(customers[0]["id"], "cust-001");
    assert_eq!(customers[0]["name"], "Acme Corporation");
    assert_eq!(customers[0]["projects"], json!([1, 2, 3]));
    assert_eq!(customers[1]["projects"], json!([4, 5]));
}

#[tokio::test]
async fn test_scoped_routes_require_a_customer() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/projects", None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CUSTOMER_REQUIRED");
    assert_eq!(body["message"], "Please select a customer first");
}

#[tokio::test]
async fn test_projects_are_filtered_on_the_server() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/projects", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1, 2, 3]);

    let (status, body) = send(&app, Method::GET, "/projects?customer=cust-002", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![4, 5]);

    let (status, _) = send(&app, Method::GET, "/projects/4", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/projects/2", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "web-portal");
}

#[tokio::test]
async fn test_customer_resolution_errors() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/projects", Some("cust-999"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Customer 'cust-999' not found");

    let (status, _) =
        send(&app, Method::GET, "/projects?customer=cust-002", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        send(&app, Method::GET, "/projects?customer=cust-001", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/customers/current", Some("cust-002"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Globex Industries");

    // named but empty
    let (status, body) = send(&app, Method::GET, "/projects", Some(""), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    let (status, _) = send(&app, Method::GET, "/projects?customer=", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/projects?customer=", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // a repeated parameter cannot sneak past the header check
    let (status, body) = send(
        &app,
        Method::GET,
        "/projects?customer=cust-002&customer=cust-001",
        Some("cust-001"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_path_parameters_return_json_errors() {
    let app = app().await;

    for (method, path, customer) in [
        (Method::GET, "/projects/abc", Some("cust-001")),
        (Method::DELETE, "/projects/abc", None),
        (Method::GET, "/connections/abc", Some("cust-001")),
        (Method::DELETE, "/connections/abc", Some("cust-001")),
        (Method::POST, "/customers/cust-001/projects/abc", None),
        (Method::DELETE, "/customers/cust-001/projects/abc", None),
    ] {
        let (status, body) = send(&app, method, path, customer, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body["code"], "BAD_REQUEST", "{}", path);
        assert!(body["message"].is_string(), "{}", path);
    }
}

#[tokio::test]
async fn test_concurrent_customer_creation_keeps_one_writer() {
    let app = app().await;

    let (first, second) = tokio::join!(
        send(
            &app,
            Method::POST,
            "/customers",
            None,
            Some(json!({ "id": "cust-x", "name": "Initech", "projects": [] })),
        ),
        send(
            &app,
            Method::POST,
            "/customers",
            None,
            Some(json!({ "id": "cust-x", "name": "Umbrella", "projects": [] })),
        ),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let winner = if first.0 == StatusCode::CREATED { &first.1 } else { &second.1 };
    let (status, stored) = send(&app, Method::GET, "/customers/cust-x", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["name"], winner["name"]);

    let (status, current) = send(&app, Method::GET, "/customers/current", Some("cust-x"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["name"], winner["name"]);
}

#[tokio::test]
async fn test_customer_lifecycle() {
    let app = app().await;

    let (status, _) = send(&app, Method::POST, "/projects", None, Some(json!({ "id": 6, "name": "billing" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = send(
        &app,
        Method::POST,
        "/customers",
        None,
        Some(json!({ "id": "cust-003", "name": "Initech", "projects": [6] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["projects"], json!([6]));

    let (status, _) = send(&app, Method::POST, "/customers", None, Some(json!({ "name": "initech" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::POST, "/customers/cust-003/projects/1", None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, "/projects", Some("cust-003"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![6]);

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/customers/cust-003",
        None,
        Some(json!({ "description": "Software", "settings": { "timezone": "UTC" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["settings"]["timezone"], "UTC");

    let (status, _) = send(&app, Method::DELETE, "/customers/cust-003", Some("cust-003"), None).await;
    assert_eq!(status, StatusCode::OK);

    // administration stays reachable with a stale selection
    let (status, body) = send(&app, Method::GET, "/customers", Some("cust-003"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::GET, "/projects", Some("cust-003"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_ownership_changes_are_visible_immediately() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/customers/cust-001/projects",
        None,
        Some(json!({ "projects": [1, 2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"], json!([1, 2]));

    let (status, _) = send(&app, Method::POST, "/customers/cust-002/projects/3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, "/projects", Some("cust-002"), None).await;
    assert_eq!(ids(&body), vec![3, 4, 5]);

    let (status, _) = send(&app, Method::DELETE, "/projects/3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, "/customers/current", Some("cust-002"), None).await;
    assert_eq!(body["projects"], json!([4, 5]));

    let (status, _) = send(&app, Method::DELETE, "/customers/cust-002/projects/3", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_connections_are_isolated() {
    let app = app().await;

    let (status, connection) = send(
        &app,
        Method::POST,
        "/connections",
        Some("cust-001"),
        Some(json!({ "name": "GitHub", "plugin": "github", "customerId": "cust-001" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(connection["customerId"], "cust-001");
    let id = connection["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/connections",
        Some("cust-001"),
        Some(json!({ "name": "Jira", "plugin": "jira", "customerId": "cust-002" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/connections", Some("cust-002"), None).await;
    assert_eq!(body, json!([]));

    let path = format!("/connections/{}", id);
    let (status, _) = send(&app, Method::GET, &path, Some("cust-002"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &path, Some("cust-002"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &path, Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::OK);
}

async fn record(app: &Router, customer: &str, body: Value) -> StatusCode {
    send(app, Method::POST, "/deployments", Some(customer), Some(body)).await.0
}

#[tokio::test]
async fn test_metrics_for_a_custom_range() {
    let app = app().await;

    assert_eq!(
        record(&app, "cust-001", json!({ "projectId": 1, "deployedOn": "2024-01-03", "leadTimeHours": 4.0 })).await,
        StatusCode::CREATED
    );
    assert_eq!(
        record(
            &app,
            "cust-001",
            json!({ "projectId": 2, "deployedOn": "2024-01-03", "leadTimeHours": 8.0, "failed": true, "restoreHours": 3.0 })
        )
        .await,
        StatusCode::CREATED
    );
    assert_eq!(
        record(&app, "cust-002", json!({ "projectId": 4, "deployedOn": "2024-01-03", "leadTimeHours": 1.0 })).await,
        StatusCode::CREATED
    );

    let (status, body) = send(
        &app,
        Method::GET,
        "/metrics?startDate=2024-01-01&endDate=2024-01-31",
        Some("cust-001"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customerId"], "cust-001");
    assert_eq!(body["range"], json!({ "start": "2024-01-01", "end": "2024-01-31" }));
    assert_eq!(body["deploymentFrequency"], json!([{ "date": "2024-01-03", "count": 2 }]));
    assert_eq!(body["leadTime"], json!([{ "date": "2024-01-03", "hours": 6.0 }]));
    assert_eq!(body["changeFailureRate"], json!([{ "date": "2024-01-03", "percentage": 50.0 }]));
    assert_eq!(body["timeToRestore"], json!([{ "date": "2024-01-03", "hours": 3.0 }]));
    assert_eq!(body["summary"]["totalDeployments"], 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/metrics?startDate=2024-01-01&endDate=2024-01-31&projectId=1",
        Some("cust-001"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["totalDeployments"], 1);
    assert_eq!(body["projectId"], 1);
}

#[tokio::test]
async fn test_metrics_reject_foreign_projects_and_bad_ranges() {
    let app = app().await;

    assert_eq!(
        record(&app, "cust-001", json!({ "projectId": 4, "deployedOn": "2024-01-03", "leadTimeHours": 1.0 })).await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        record(
            &app,
            "cust-001",
            json!({ "projectId": 1, "deployedOn": "2024-01-03", "leadTimeHours": 1.0, "restoreHours": 2.0 })
        )
        .await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        record(&app, "cust-001", json!({ "projectId": 1, "deployedOn": "2024-01-03", "leadTimeHours": -1.0 })).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        record(&app, "cust-001", json!({ "projectId": 1, "deployedOn": "yesterday", "leadTimeHours": 1.0 })).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        record(
            &app,
            "cust-001",
            json!({ "projectId": 1, "deployedOn": "2024-01-03", "leadTimeHours": 1.0, "failed": true, "restoreHours": -2.0 })
        )
        .await,
        StatusCode::BAD_REQUEST
    );

    for path in [
        "/metrics?projectId=4",
        "/metrics?timeRange=lastDecade",
        "/metrics?timeRange=custom",
        "/metrics?startDate=2024-02-01&endDate=2024-01-01",
        "/metrics?startDate=2024-02-01",
        "/metrics?timeRange=last7days&startDate=2024-01-01&endDate=2024-01-31",
    ] {
        let (status, _) = send(&app, Method::GET, path, Some("cust-001"), None).await;
        let expected = if path.contains("projectId") {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        assert_eq!(status, expected, "{}", path);
    }

    let (status, body) = send(&app, Method::GET, "/metrics?timeRange=last7days", Some("cust-002"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["totalDeployments"], 0);
    assert_eq!(body["deploymentFrequency"], json!([]));

    let today = chrono::Utc::now().date_naive();
    let (status, body) = send(&app, Method::GET, "/metrics?timeRange=thisYear", Some("cust-002"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"]["start"], today.format("%Y-01-01").to_string());
    assert_eq!(body["range"]["end"], today.format("%Y-%m-%d").to_string());
}

#[tokio::test]
async fn test_dashboards_are_scoped_and_render_their_panels() {
    let app = app().await;

    let (_, body) = send(&app, Method::GET, "/dashboards", Some("cust-001"), None).await;
    assert_eq!(body[0]["id"], "dora");

    let (status, dashboard) = send(
        &app,
        Method::POST,
        "/dashboards",
        Some("cust-001"),
        Some(json!({ "id": "delivery", "title": "Delivery", "panels": ["leadTime"], "defaultTimeRange": "last90days" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dashboard["customerId"], "cust-001");

    let (status, _) = send(
        &app,
        Method::POST,
        "/dashboards",
        Some("cust-002"),
        Some(json!({ "id": "delivery", "title": "Mine", "panels": ["leadTime"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/dashboards",
        Some("cust-002"),
        Some(json!({ "title": "Twice", "panels": ["leadTime", "leadTime"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/dashboards/delivery/data", Some("cust-002"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    record(&app, "cust-001", json!({ "projectId": 1, "deployedOn": "2024-01-03", "leadTimeHours": 5.0 })).await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/dashboards/delivery/data?startDate=2024-01-01&endDate=2024-01-31",
        Some("cust-001"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dashboard"]["title"], "Delivery");
    assert_eq!(body["metrics"]["leadTime"], json!([{ "date": "2024-01-03", "hours": 5.0 }]));
    assert!(body["metrics"].get("deploymentFrequency").is_none());

    let (status, body) = send(&app, Method::GET, "/dashboards/delivery/data", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::OK);
    let start = chrono::NaiveDate::parse_from_str(body["metrics"]["range"]["start"].as_str().unwrap(), "%Y-%m-%d").unwrap();
    let end = chrono::NaiveDate::parse_from_str(body["metrics"]["range"]["end"].as_str().unwrap(), "%Y-%m-%d").unwrap();
    assert_eq!((end - start).num_days(), 89);

    let (status, _) = send(&app, Method::DELETE, "/dashboards/dora", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::DELETE, "/dashboards/delivery", Some("cust-001"), None).await;
    assert_eq!(status, StatusCode::OK);
}
