use api_rest::{router, AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, FixedOffset, Utc};
use futures_util::StreamExt;
use hms_core::{maintenance, CoreConfig, CoreContext};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

struct TestApp {
    _tmp: TempDir,
    app: Router,
}

fn seeded_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let cfg = CoreConfig::new(
        tmp.path().to_path_buf(),
        "integration-secret".into(),
        Duration::hours(1),
        1_000,
        FixedOffset::east_opt(0).unwrap(),
    )
    .unwrap();
    let ctx = CoreContext::open(Arc::new(cfg)).unwrap();
    maintenance::seed(&ctx, false, Utc::now()).unwrap();
    TestApp {
        _tmp: tmp,
        app: router(AppState::new(ctx), CorsLayer::permissive()),
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, who: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "usernameOrEmail": who, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed for {who}: {body}");
    body["token"].as_str().unwrap().to_string()
}

fn id_named(list: &Value, name: &str) -> String {
    list.as_array()
        .unwrap()
        .iter()
        .find(|r| r["fullName"] == name)
        .and_then(|r| r["id"].as_str())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_is_public() {
    let t = seeded_app();
    let (status, body) = send(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_missing_fields() {
    let t = seeded_app();
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "usernameOrEmail": "admin@hospital.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "password": "admin123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing fields");
}

#[tokio::test]
async fn protected_routes_need_a_token_and_the_right_role() {
    let t = seeded_app();
    let (status, body) = send(&t.app, Method::GET, "/doctors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&t.app, Method::GET, "/doctors", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let patient = login(&t.app, "john@example.com", "patient123").await;
    let (status, doctors) = send(&t.app, Method::GET, "/doctors", Some(patient.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doctors.as_array().unwrap().len(), 2);

    let (status, body) = send(&t.app, Method::GET, "/patients", Some(patient.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied");

    let reception = login(&t.app, "receptionist@hospital.com", "reception123").await;
    let (status, _) = send(&t.app, Method::GET, "/dashboard/admin", Some(reception.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(
        &t.app,
        Method::GET,
        "/dashboard/receptionist",
        Some(reception.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["conflictWarnings"].is_array());
}

#[tokio::test]
async fn double_booking_is_a_bad_request() {
    let t = seeded_app();
    let admin = login(&t.app, "admin@hospital.com", "admin123").await;
    let (_, doctors) = send(&t.app, Method::GET, "/doctors", Some(admin.as_str()), None).await;
    let (_, patients) = send(&t.app, Method::GET, "/patients", Some(admin.as_str()), None).await;
    let doctor = id_named(&doctors, "Dr. Patel");

    let booking = |patient: &str| {
        json!({
            "patient": id_named(&patients, patient),
            "doctor": doctor,
            "datetime": "2031-01-01T09:00:00Z",
        })
    };
    let (status, first) = send(
        &t.app,
        Method::POST,
        "/appointments",
        Some(admin.as_str()),
        Some(booking("John Doe")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "Scheduled");
    assert_eq!(first["doctor"]["fullName"], "Dr. Patel");

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/appointments",
        Some(admin.as_str()),
        Some(booking("Jane Smith")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Doctor is already booked for this time slot");

    let uri = format!("/appointments/{}", first["id"].as_str().unwrap());
    let (status, body) = send(&t.app, Method::DELETE, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment deleted successfully");
}

#[tokio::test]
async fn doctor_lifecycle_and_credentials() {
    let t = seeded_app();
    let admin = login(&t.app, "admin@hospital.com", "admin123").await;

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doctors",
        Some(admin.as_str()),
        Some(json!({ "fullName": "Dr. Lee", "specialization": "Neurology" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");

    let (status, doctor) = send(
        &t.app,
        Method::POST,
        "/doctors",
        Some(admin.as_str()),
        Some(json!({
            "fullName": "Dr. Lee",
            "specialization": "Neurology",
            "experience": 5,
            "qualification": "MBBS",
            "availableSlots": [{ "start": "2031-01-02T10:00", "end": "2031-01-02T10:30" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = doctor["id"].as_str().unwrap().to_string();

    let uri = format!("/doctors/{id}/generate-credentials");
    let (status, creds) = send(&t.app, Method::POST, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(creds["username"], "dr.lee");
    let (status, _) = send(&t.app, Method::POST, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let password = creds["password"].as_str().unwrap();
    let doctor_token = login(&t.app, "dr.lee", password).await;
    let (status, dash) = send(
        &t.app,
        Method::GET,
        "/dashboard/doctor",
        Some(doctor_token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["doctor"]["fullName"], "Dr. Lee");

    let (status, body) = send(
        &t.app,
        Method::DELETE,
        &format!("/doctors/{id}"),
        Some(admin.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn malformed_ids_and_missing_records() {
    let t = seeded_app();
    let admin = login(&t.app, "admin@hospital.com", "admin123").await;

    let (status, _) = send(&t.app, Method::GET, "/patients/not-an-id", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "0123456789abcdef0123456789abcdef";
    let (status, body) = send(
        &t.app,
        Method::GET,
        &format!("/patients/{missing}"),
        Some(admin.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Patient not found");
}

#[tokio::test]
async fn patients_see_their_own_record_and_prescriptions() {
    let t = seeded_app();
    let patient = login(&t.app, "john@example.com", "patient123").await;

    let (status, mine) = send(&t.app, Method::GET, "/patients/my-data", Some(patient.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["fullName"], "John Doe");

    let uri = format!("/patients/{}/prescriptions", mine[0]["id"].as_str().unwrap());
    let (status, prescriptions) = send(&t.app, Method::GET, &uri, Some(patient.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prescriptions.as_array().unwrap().len(), 1);

    let (status, dash) = send(&t.app, Method::GET, "/dashboard/patient", Some(patient.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["upcomingAppointments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn prescriptions_by_doctors_are_attributed() {
    let t = seeded_app();
    let doctor = login(&t.app, "anjali@hospital.com", "doctor123").await;
    let admin = login(&t.app, "admin@hospital.com", "admin123").await;
    let (_, patients) = send(&t.app, Method::GET, "/patients", Some(admin.as_str()), None).await;
    let jane = id_named(&patients, "Jane Smith");

    let (status, rx) = send(
        &t.app,
        Method::POST,
        &format!("/patients/{jane}/prescriptions"),
        Some(doctor.as_str()),
        Some(json!({ "notes": "Amoxicillin is contraindicated.", "healthSummary": "Penicillin allergy." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rx["doctor"]["fullName"], "Dr. Anjali Bhatt");
    assert_eq!(rx["uploadedBy"], "anjali@hospital.com");

    let (_, record) = send(&t.app, Method::GET, &format!("/patients/{jane}"), Some(admin.as_str()), None).await;
    assert_eq!(record["healthSummary"], "Penicillin allergy.");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let t = seeded_app();
    let (status, doc) = send(&t.app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/appointments"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
}

#[tokio::test]
async fn websocket_requires_a_token() {
    let t = seeded_app();
    let (status, body) = send(&t.app, Method::GET, "/ws", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");
}

#[tokio::test]
async fn numeric_form_strings_are_accepted() {
    let t = seeded_app();
    let admin = login(&t.app, "admin@hospital.com", "admin123").await;

    let (status, doctor) = send(
        &t.app,
        Method::POST,
        "/doctors",
        Some(admin.as_str()),
        Some(json!({
            "fullName": "Dr. Rao",
            "specialization": "Dermatology",
            "experience": "10",
            "qualification": "MD",
            "availableSlots": [{ "start": "2031-01-03T10:00", "end": "2031-01-03T10:30" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{doctor}");
    assert_eq!(doctor["experience"], 10);

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doctors",
        Some(admin.as_str()),
        Some(json!({
            "fullName": "Dr. Rao",
            "specialization": "Dermatology",
            "experience": "",
            "qualification": "MD",
            "availableSlots": [{ "start": "2031-01-03T10:00", "end": "2031-01-03T10:30" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");

    let (status, patient) = send(
        &t.app,
        Method::POST,
        "/patients",
        Some(admin.as_str()),
        Some(json!({ "fullName": "Ravi Kumar", "age": "32", "gender": "Male" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{patient}");
    assert_eq!(patient["age"], 32);
}

#[tokio::test]
async fn websocket_streams_changes_to_authenticated_clients() {
    let t = seeded_app();
    let admin = login(&t.app, "admin@hospital.com", "admin123").await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = t.app.clone();
    tokio::spawn(async move { axum::serve(listener, server).await });

    let url = format!("ws://{addr}/ws?token={admin}");
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let (_, doctors) = send(&t.app, Method::GET, "/doctors", Some(admin.as_str()), None).await;
    let (_, patients) = send(&t.app, Method::GET, "/patients", Some(admin.as_str()), None).await;
    let (status, booked) = send(
        &t.app,
        Method::POST,
        "/appointments",
        Some(admin.as_str()),
        Some(json!({
            "patient": id_named(&patients, "John Doe"),
            "doctor": id_named(&doctors, "Dr. Patel"),
            "datetime": "2031-02-01T09:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let created = next_event(&mut socket).await;
    assert_eq!(created["event"], "appointmentCreated");
    assert_eq!(created["data"]["id"], booked["id"]);

    let update = next_event(&mut socket).await;
    assert_eq!(update["event"], "dashboardUpdate");
    assert_eq!(update["data"]["type"], "appointment");
    assert_eq!(update["data"]["action"], "created");

    socket.close(None).await.unwrap();
}

async fn next_event<S>(socket: &mut tokio_tungstenite::WebSocketStream<S>) -> Value
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::time::timeout(std::time::Duration::from_secs(5), socket.next())
            .await
            .expect("no event within 5s")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}
