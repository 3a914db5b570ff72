use std::sync::Arc;

use api::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use domain::{
    accounts::AccountService,
    i18n::{Locale, MessageKey, Messages},
    memory::{self, MemoryAccounts, MemoryIdentity, MemoryObjectStore, MemoryPharmacies},
    pharmacies::{NewPharmacy, Pharmacy, PharmacyDirectory, PharmacyRepository},
    requests::{AcceptPolicy, Services},
    storage::Uploader,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "medifast-test-boundary";

async fn app_with(policy: AcceptPolicy) -> Router {
    let accounts = Arc::new(MemoryAccounts::default());
    let service = AccountService::new(
        accounts.clone(),
        Arc::new(MemoryIdentity::default()),
        Uploader::new(Arc::new(MemoryObjectStore::default())),
    );
    let requests = memory::request_workflow(accounts, Services::new(policy));

    let pharmacies = Arc::new(MemoryPharmacies::default());
    pharmacies
        .insert(&Pharmacy::new(NewPharmacy {
            name: "Daroukhaneye Pars".to_string(),
            name_fa: Some("داروخانه پارس".to_string()),
            address: "ستارخان، خیابان چهارم".to_string(),
            latitude: 35.715,
            longitude: 51.365,
            is_24h: false,
            phone: Some("021-66551122".to_string()),
            city: "tehran".to_string(),
            accepts_rx: true,
        }))
        .await
        .unwrap();

    build_router(AppState::new(
        service,
        requests,
        PharmacyDirectory::new(pharmacies),
    ))
}

async fn app() -> Router {
    app_with(AcceptPolicy::default()).await
}

/// Send a request and return (status, JSON body).
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    read(resp).await
}

async fn read(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send_multipart(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Vec<u8>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let resp = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    read(resp).await
}

async fn sign_in(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/de/auth/sign-in",
        None,
        Some(json!({ "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["redirect"], "/de/dashboard");
    body["session"]["access_token"].as_str().unwrap().to_string()
}

async fn patient(app: &Router, email: &str) -> String {
    let form = multipart_body(
        &[
            ("email", email),
            ("password", "secret1"),
            ("name", "Maria Huber"),
            ("phone", "+436641234567"),
            ("role", "patient"),
            ("plz", "1060"),
            ("street", "Mariahilfer Str."),
            ("houseNumber", "1"),
        ],
        None,
    );
    let (status, body) = send_multipart(app, "/de/auth/sign-up", None, form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["redirect"], "/de/login?registered=1");

    sign_in(app, email).await
}

async fn courier(app: &Router, email: &str) -> String {
    let form = multipart_body(
        &[
            ("email", email),
            ("password", "secret1"),
            ("name", "Ali Rezaei"),
            ("phone", "+436649876543"),
            ("role", "delivery"),
            ("dateOfBirth", "1995-04-02"),
            ("vehicleType", "bike"),
        ],
        Some(("idDocument", "ausweis.jpg", &b"\xff\xd8\xff"[..])),
    );
    let (status, body) = send_multipart(app, "/de/auth/sign-up", None, form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    sign_in(app, email).await
}

async fn create(app: &Router, token: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/de/requests",
        Some(token),
        Some(json!({ "medicines": "Aspirin 500mg" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn messages_follow_the_path_locale() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/fa/messages", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locale"], "fa");
    assert_eq!(body["direction"], "rtl");

    let (_, body) = send(&app, Method::GET, "/xx/messages", None, None).await;
    assert_eq!(body["locale"], "de");
    assert_eq!(body["direction"], "ltr");
}

#[tokio::test]
async fn me_lists_capabilities_instead_of_the_role_check() {
    let app = app().await;
    let token = courier(&app, "ali@example.at").await;

    let (status, body) = send(&app, Method::GET, "/de/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["role"], "delivery");
    let capabilities = body["capabilities"].as_array().unwrap();
    assert!(capabilities.contains(&json!("accept_request")));
    assert!(!capabilities.contains(&json!("create_request")));
    assert!(body["account"]["id_document_url"].is_string());
}

#[tokio::test]
async fn anonymous_callers_get_401() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/en/requests", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["_form"][0].is_string());
}

#[tokio::test]
async fn sign_up_reports_field_errors() {
    let app = app().await;
    let form = multipart_body(
        &[
            ("email", "not-an-email"),
            ("password", "secret1"),
            ("name", "Maria"),
            ("phone", "+436641234567"),
            ("role", "patient"),
        ],
        None,
    );

    let (status, body) = send_multipart(&app, "/de/auth/sign-up", None, form).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["email"][0].is_string());
}

#[tokio::test]
async fn wrong_password_surfaces_the_provider_message() {
    let app = app().await;
    patient(&app, "maria@example.at").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/de/auth/sign-in",
        None,
        Some(json!({ "email": "maria@example.at", "password": "wrong!" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["_form"][0], "Invalid login credentials");
}

#[tokio::test]
async fn couriers_cannot_create_requests() {
    let app = app().await;
    let token = courier(&app, "ali@example.at").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/de/requests",
        Some(&token),
        Some(json!({ "medicines": "Aspirin", "address": "Ring 1, 1010 Wien" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"]["_form"][0].is_string());

    let (_, jobs) = send(&app, Method::GET, "/de/jobs", Some(&token), None).await;
    assert!(jobs["pending"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_medicines_is_a_field_error() {
    let app = app().await;
    let token = patient(&app, "maria@example.at").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/de/requests",
        Some(&token),
        Some(json!({ "medicines": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["medicines"][0].is_string());

    let (_, list) = send(&app, Method::GET, "/de/requests", Some(&token), None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn delivery_runs_from_pending_to_delivered() {
    let app = app().await;
    let patient_token = patient(&app, "maria@example.at").await;
    let courier_token = courier(&app, "ali@example.at").await;
    let id = create(&app, &patient_token).await;

    let (_, detail) = send(
        &app,
        Method::GET,
        &format!("/de/requests/{id}"),
        Some(&patient_token),
        None,
    )
    .await;
    assert_eq!(detail["status"], "pending");
    assert_eq!(detail["address"], "Mariahilfer Str. 1, 1060 Wien");
    assert_eq!(detail["payment_method"], "cash");
    assert_eq!(detail["tracking"], json!({ "active": true, "interval_ms": 5000 }));

    let (_, jobs) = send(&app, Method::GET, "/de/jobs", Some(&courier_token), None).await;
    assert_eq!(jobs["pending"][0]["patient_name"], "Maria Huber");

    let (status, accepted) = send(
        &app,
        Method::POST,
        &format!("/de/jobs/{id}/accept"),
        Some(&courier_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["next_step"], "picked_up");

    let (status, delivered) = send(
        &app,
        Method::POST,
        &format!("/de/jobs/{id}/status"),
        Some(&courier_token),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered["status"], "delivered");

    let (_, detail) = send(
        &app,
        Method::GET,
        &format!("/de/requests/{id}"),
        Some(&patient_token),
        None,
    )
    .await;
    assert_eq!(detail["tracking"]["active"], false);
    let timeline: Vec<_> = detail["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(timeline.first().map(String::as_str), Some("pending"));
    assert_eq!(timeline.last().map(String::as_str), Some("delivered"));
}

#[tokio::test]
async fn advance_rejects_unknown_targets() {
    let app = app().await;
    let patient_token = patient(&app, "maria@example.at").await;
    let courier_token = courier(&app, "ali@example.at").await;
    let id = create(&app, &patient_token).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/fa/jobs/{id}/status"),
        Some(&courier_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"]["_form"][0],
        Messages::get(Locale::Fa, MessageKey::Generic)
    );
}

#[tokio::test]
async fn malformed_bodies_get_the_form_error() {
    let app = app().await;
    let token = patient(&app, "maria@example.at").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/de/requests")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"medicines\":"))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read(resp).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["_form"][0].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/de/uploads/prescription",
        Some(&token),
        Some(json!({ "file": "rezept.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["_form"][0].is_string());
}

#[tokio::test]
async fn claim_policy_rejects_the_second_courier() {
    let app = app_with(AcceptPolicy::ClaimIfPending).await;
    let patient_token = patient(&app, "maria@example.at").await;
    let first = courier(&app, "ali@example.at").await;
    let second = courier(&app, "reza@example.at").await;
    let id = create(&app, &patient_token).await;

    let uri = format!("/de/jobs/{id}/accept");
    let (status, _) = send(&app, Method::POST, &uri, Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, &uri, Some(&second), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]["_form"][0].is_string());
}

#[tokio::test]
async fn other_patients_get_404() {
    let app = app().await;
    let owner = patient(&app, "maria@example.at").await;
    let stranger = patient(&app, "sara@example.at").await;
    let id = create(&app, &owner).await;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/de/requests/{id}"),
        Some(&stranger),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn online_toggle_is_courier_only() {
    let app = app().await;
    let courier_token = courier(&app, "ali@example.at").await;
    let patient_token = patient(&app, "maria@example.at").await;

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            Method::PUT,
            "/de/courier/online",
            Some(&courier_token),
            Some(json!({ "online": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["is_online"], true);
    }

    let (status, _) = send(
        &app,
        Method::PUT,
        "/de/courier/online",
        Some(&patient_token),
        Some(json!({ "online": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn prescription_upload_needs_a_file() {
    let app = app().await;
    let token = patient(&app, "maria@example.at").await;

    let (status, body) = send_multipart(
        &app,
        "/de/uploads/prescription",
        Some(&token),
        multipart_body(&[], None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["file"][0].is_string());

    let (status, body) = send_multipart(
        &app,
        "/de/uploads/prescription",
        Some(&token),
        multipart_body(&[], Some(("file", "rezept.PNG", &b"\x89PNG"[..]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().ends_with(".png"));
}

#[tokio::test]
async fn only_uploads_lift_the_body_limit() {
    let app = app().await;
    let token = patient(&app, "maria@example.at").await;
    let photo = vec![0u8; 3 * 1024 * 1024];

    let (status, _) = send_multipart(
        &app,
        "/de/uploads/prescription",
        Some(&token),
        multipart_body(&[], Some(("file", "rezept.jpg", &photo[..]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let notes = "x".repeat(3 * 1024 * 1024);
    let (status, body) = send(
        &app,
        Method::POST,
        "/de/requests",
        Some(&token),
        Some(json!({ "medicines": "Aspirin", "notes": notes })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["_form"][0].is_string());
}

#[tokio::test]
async fn pharmacy_map_uses_persian_names_for_farsi() {
    let app = app().await;
    let token = patient(&app, "maria@example.at").await;

    let (_, fa) = send(&app, Method::GET, "/fa/pharmacies", Some(&token), None).await;
    let (_, de) = send(
        &app,
        Method::GET,
        "/de/pharmacies?city=tehran",
        Some(&token),
        None,
    )
    .await;
    let (_, vienna) = send(
        &app,
        Method::GET,
        "/de/pharmacies?city=vienna",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(fa[0]["name"], "داروخانه پارس");
    assert_eq!(de[0]["name"], "Daroukhaneye Pars");
    assert_eq!(vienna, json!([]));
}

#[tokio::test]
async fn settings_round_trip_through_cookies() {
    let app = app().await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/de/settings/senior-mode")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("medifast_senior_mode=1;"));
    let (_, body) = read(resp).await;
    assert_eq!(body["senior_mode"], true);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/de/settings")
                .header(header::COOKIE, "medifast_senior_mode=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (_, body) = read(resp).await;
    assert_eq!(body["senior_mode"], true);
    assert_eq!(body["consent"]["step"], "age");
}

#[tokio::test]
async fn consent_is_stored_after_the_gdpr_step() {
    let app = app().await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/de/settings/consent",
        None,
        Some(json!({ "step": "age", "accept": true })),
    )
    .await;
    assert_eq!(body["step"], "gdpr");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/de/settings/consent")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "step": "gdpr", "accept": true }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("medifast_consent_v1=accepted;"));
}
