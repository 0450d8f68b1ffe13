use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use auth_identity::{FixedClock, Role, TokenService};
use chrono::{Duration, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use ehr_server::{create_app, EhrServer, ServerConfig};

const SECRET: &str = "api-flow-test-secret";

struct TestApp {
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let mut config = ServerConfig::default();
        config.identity.bcrypt_cost = 4;
        config.identity.jwt_secret = SECRET.to_string();

        Self {
            app: create_app(EhrServer::in_memory(config)),
        }
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn signup_asha(&self) -> Value {
        let (status, body) = self
            .send("POST", "/api/patients/signup", None, Some(asha()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn signup_rao(&self) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/doctors/signup",
                None,
                Some(json!({
                    "name": "Dr. Rao",
                    "email": "Rao@Clinic.org",
                    "phoneNumber": "8888888888",
                    "password": "scalpel",
                    "medicalLicenseNumber": "LIC-778899",
                    "specialization": "General Medicine"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

fn asha() -> Value {
    json!({
        "name": "Asha",
        "mobileNumber": "9999999999",
        "password": "secret1",
        "age": 30,
        "bloodGroup": "O+",
        "height": 160,
        "weight": 55
    })
}

fn token_of(body: &Value) -> String {
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["storage"], "in_memory");
}

#[tokio::test]
async fn test_asha_end_to_end() {
    let app = TestApp::new();

    let signup = app.signup_asha().await;
    assert_eq!(signup["success"], true);
    let patient_id = signup["data"]["patientId"].as_str().unwrap().to_string();
    assert!(Regex::new(r"^OPID-\d{8}-\d{4}$").unwrap().is_match(&patient_id));
    assert!(signup["data"].get("password").is_none());
    assert!(signup["data"].get("passwordHash").is_none());

    // The signup token is usable straight away
    let (status, me) = app
        .send("GET", "/api/patients/me", Some(&token_of(&signup)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["patientId"], patient_id.as_str());

    let (status, rejected) = app
        .send(
            "POST",
            "/api/patients/login",
            None,
            Some(json!({ "identifier": "9999999999", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(rejected["success"], false);
    assert_eq!(rejected["errorType"], "invalid_credentials");

    let (status, login) = app
        .send(
            "POST",
            "/api/patients/login",
            None,
            Some(json!({ "identifier": "9999999999", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["message"], "Login successful");
    assert_eq!(login["data"]["patientId"], patient_id.as_str());
    assert!(login["token"].is_string());
}

#[tokio::test]
async fn test_unknown_identifier_matches_wrong_password() {
    let app = TestApp::new();
    app.signup_asha().await;

    let (wrong_status, wrong) = app
        .send(
            "POST",
            "/api/patients/login",
            None,
            Some(json!({ "identifier": "9999999999", "password": "wrong" })),
        )
        .await;
    let (unknown_status, unknown) = app
        .send(
            "POST",
            "/api/patients/login",
            None,
            Some(json!({ "identifier": "1234567890", "password": "secret1" })),
        )
        .await;

    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong["message"], unknown["message"]);
    assert_eq!(wrong["errorCode"], unknown["errorCode"]);
}

#[tokio::test]
async fn test_doctor_token_on_patient_route_is_forbidden() {
    let app = TestApp::new();
    let rao = app.signup_rao().await;

    let (status, body) = app
        .send("GET", "/api/patients/me", Some(&token_of(&rao)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("doctor"));

    let (status, body) = app.send("GET", "/api/patients/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "AUTH_2003");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app
        .send("GET", "/api/doctors/me", Some("not.a.token"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "AUTH_2002");
}

#[tokio::test]
async fn test_token_for_missing_principal_is_unauthorized() {
    let app = TestApp::new();
    let issued = TokenService::new(SECRET, 168)
        .issue(Uuid::new_v4(), Role::Patient)
        .unwrap();

    let (status, body) = app
        .send("GET", "/api/patients/me", Some(&issued.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "AUTH_2004");
    assert_eq!(body["message"], "Principal not found");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::new();
    let signup = app.signup_asha().await;
    let patient = Uuid::parse_str(signup["data"]["id"].as_str().unwrap()).unwrap();

    let last_week = Utc::now() - Duration::days(8);
    let issued = TokenService::with_clock(SECRET, 168, Arc::new(FixedClock(last_week)))
        .issue(patient, Role::Patient)
        .unwrap();

    let (status, body) = app
        .send("GET", "/api/patients/me", Some(&issued.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "AUTH_2002");

    // The same principal with a fresh token gets through
    let (status, _) = app
        .send("GET", "/api/patients/me", Some(&token_of(&signup)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_for_other_deployment_is_rejected() {
    let app = TestApp::new();
    let rao = app.signup_rao().await;

    // Same claims, signed with a different secret
    let mut other = ServerConfig::default();
    other.identity.bcrypt_cost = 4;
    let foreign = TestApp {
        app: create_app(EhrServer::in_memory(other)),
    };
    let (status, _) = foreign
        .send("GET", "/api/doctors/me", Some(&token_of(&rao)), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_signup_is_bad_request() {
    let app = TestApp::new();
    app.signup_asha().await;

    let (status, body) = app
        .send("POST", "/api/patients/signup", None, Some(asha()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "duplicate_principal");
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/patients/signup",
            None,
            Some(json!({ "name": "Asha", "mobileNumber": "9999999999" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "validation_error");
    assert_eq!(body["errorCode"], "VALIDATION_1003");
    assert!(body["errorId"].is_string());
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = TestApp::new();
    let signup = app.signup_asha().await;
    let token = token_of(&signup);

    let (status, updated) = app
        .send("PUT", "/api/patients/me", Some(&token), Some(json!({ "weight": 57.5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["weight"], 57.5);

    // Old password still works after an unrelated edit
    let (status, _) = app
        .send(
            "POST",
            "/api/patients/login",
            None,
            Some(json!({ "identifier": "9999999999", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "PUT",
            "/api/patients/me/password",
            Some(&token),
            Some(json!({ "currentPassword": "secret1", "newPassword": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "POST",
            "/api/patients/login",
            None,
            Some(json!({ "identifier": "9999999999", "password": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_clinical_flow_between_doctor_and_patient() {
    let app = TestApp::new();
    let asha = app.signup_asha().await;
    let rao = app.signup_rao().await;
    let asha_token = token_of(&asha);
    let rao_token = token_of(&rao);
    let patient_id = asha["data"]["patientId"].as_str().unwrap();
    let doctor_id = rao["data"]["doctorId"].as_str().unwrap();
    assert_eq!(rao["data"]["email"], "rao@clinic.org");

    // Patients may not record visits
    let visit_body = json!({
        "patientId": patient_id,
        "reason": "Fever",
        "diagnosis": "Viral fever",
        "symptoms": ["fever", "headache"],
        "prescriptions": [{ "medicine": "Paracetamol", "dosage": "500mg" }]
    });
    let (status, _) = app
        .send("POST", "/api/visits", Some(&asha_token), Some(visit_body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, visit) = app
        .send("POST", "/api/visits", Some(&rao_token), Some(visit_body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{visit}");
    let visit_id = visit["data"]["visitId"].as_str().unwrap().to_string();

    let (status, visits) = app.send("GET", "/api/visits", Some(&asha_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(visits["count"], 1);

    let (status, _) = app
        .send("GET", &format!("/api/visits/{visit_id}"), Some(&asha_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send("GET", "/api/visits/not-a-visit", Some(&asha_token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = app
        .send(
            "POST",
            "/api/reports",
            Some(&rao_token),
            Some(json!({
                "patientId": patient_id,
                "visitId": visit_id,
                "title": "Blood panel",
                "scanType": "Lab",
                "filePath": "uploads/reports/panel.png",
                "mediaType": "image/png"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    assert_eq!(report["data"]["fileKind"], "image");

    let (status, reports) = app.send("GET", "/api/reports", Some(&asha_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reports["count"], 1);

    let (status, query) = app
        .send(
            "POST",
            "/api/queries",
            Some(&asha_token),
            Some(json!({
                "doctorId": doctor_id,
                "subject": "Fever returns",
                "message": "The fever came back at night"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{query}");
    let query_id = query["data"]["queryId"].as_str().unwrap().to_string();

    let reply_uri = format!("/api/queries/{query_id}/reply");
    let (status, answered) = app
        .send("POST", &reply_uri, Some(&rao_token), Some(json!({ "response": "Continue for two days" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["data"]["status"], "answered");

    let (status, _) = app
        .send("POST", &reply_uri, Some(&rao_token), Some(json!({ "response": "Again" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, inbox) = app.send("GET", "/api/queries", Some(&rao_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["count"], 1);
}
