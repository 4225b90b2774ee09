//! # Integration Tests for permits-api
//!
//! Drives the full router over the in-memory store: the Business License
//! submission, officer review, rejection, payment callback and the access
//! rules around them.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use permits_api::config::AppConfig;
use permits_api::state::AppState;

const SECRET: &str = "test-secret";
const HOOK_SECRET: &str = "hook-secret";

const REQUIRED: [&str; 4] = [
    "NATIONAL_ID_COPY",
    "BUSINESS_REGISTRATION_CERTIFICATE",
    "TAX_COMPLIANCE_CERTIFICATE",
    "LOCATION_MAP_GPS_COORDINATES",
];

struct Harness {
    app: axum::Router,
}

impl Harness {
    fn new() -> Self {
        let config = AppConfig {
            auth_token: Some(SECRET.to_string()),
            payment_webhook_secret: Some(HOOK_SECRET.to_string()),
            ..AppConfig::default()
        };
        Self {
            app: permits_api::app(AppState::in_memory(config)),
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };
        self.dispatch(builder.body(body).unwrap()).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn register(&self, role: &str, name: &str, email: &str) -> String {
        let token = format!("{role}:{}:{SECRET}", Uuid::new_v4());
        let (status, body) = self
            .send(
                "POST",
                "/v1/users",
                Some(&token),
                Some(json!({
                    "full_name": name,
                    "email": email,
                    "account_type": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        token
    }

    async fn business_license(&self, token: &str) -> Value {
        let (status, permits) = self.send("GET", "/v1/permit-types", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        permits
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == "Business License")
            .cloned()
            .unwrap()
    }

    async fn submit(&self, token: &str, documents: &[&str]) -> (StatusCode, Value) {
        let permit = self.business_license(token).await;
        self.send(
            "POST",
            "/v1/applications",
            Some(token),
            Some(application_body(&permit["id"], documents)),
        )
        .await
    }

    async fn set_status(
        &self,
        token: &str,
        number: &str,
        status: &str,
        comment: Option<&str>,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/v1/applications/{number}/status"),
            Some(token),
            Some(json!({ "status": status, "comment": comment })),
        )
        .await
    }

    async fn timeline(&self, token: &str, number: &str) -> Vec<Value> {
        let (status, body) = self
            .send(
                "GET",
                &format!("/v1/applications/{number}/timeline"),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body.as_array().unwrap().clone()
    }

    async fn callback(&self, signature: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/payments/callback")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header("x-payment-signature", sig);
        }
        self.dispatch(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

fn application_body(permit_type_id: &Value, documents: &[&str]) -> Value {
    let documents: Vec<Value> = documents
        .iter()
        .map(|t| {
            json!({
                "file_name": format!("{}.pdf", t.to_lowercase()),
                "original_name": format!("{t}.pdf"),
                "file_size": 20480,
                "mime_type": "application/pdf",
                "document_type": t,
                "file_url": format!("https://storage.example.org/uploads/{t}.pdf"),
            })
        })
        .collect();
    json!({
        "permit_type_id": permit_type_id,
        "business_name": "Kangema Hardware",
        "business_type": "Retail",
        "phone_number": "+254712345678",
        "national_id": "12345678",
        "business_address": "Main Street, Kangema",
        "documents": documents,
    })
}

fn is_application_number(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    matches!(parts.as_slice(), ["APP", millis, suffix]
        if !millis.is_empty()
            && millis.bytes().all(|b| b.is_ascii_digit())
            && suffix.len() == 3
            && suffix.bytes().all(|b| b.is_ascii_digit()))
}

// -- Health & Docs ------------------------------------------------------------

#[tokio::test]
async fn health_probes_need_no_token() {
    let h = Harness::new();
    let (status, body) = h.send("GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    let (status, body) = h.send("GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let h = Harness::new();
    let (status, body) = h.send("GET", "/v1/permit-types", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = h
        .send("GET", "/v1/permit-types", Some("citizen:not-a-uuid:test-secret"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = Harness::new();
    let (status, body) = h.send("GET", "/openapi.json", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/applications"].is_object());
}

// -- Submission ---------------------------------------------------------------

#[tokio::test]
async fn business_license_catalog_entry() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let permit = h.business_license(&citizen).await;
    assert_eq!(permit["fee"], "2500.00");
    let required: Vec<&str> = permit["required_documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["document_type"].as_str().unwrap())
        .collect();
    assert_eq!(required, REQUIRED);
}

#[tokio::test]
async fn complete_submission_is_submitted_with_one_event() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let (status, app) = h.submit(&citizen, &REQUIRED).await;
    assert_eq!(status, StatusCode::CREATED, "{app}");
    assert_eq!(app["status"], "SUBMITTED");
    let number = app["application_number"].as_str().unwrap();
    assert!(is_application_number(number), "{number}");

    let (status, docs) = h
        .send(
            "GET",
            &format!("/v1/applications/{number}/documents"),
            Some(&citizen),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(docs.as_array().unwrap().len(), 4);

    let timeline = h.timeline(&citizen, number).await;
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0]["status"], "SUBMITTED");
    assert_eq!(timeline[0]["label"], "Application Submitted");
    assert_eq!(timeline[0]["actor_name"], "Wanjiku Kamau");
    assert_eq!(timeline[0]["is_current"], true);
}

#[tokio::test]
async fn incomplete_document_set_persists_nothing() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let (status, body) = h.submit(&citizen, &REQUIRED[..3]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INCOMPLETE_SET");
    assert_eq!(
        body["error"]["details"]["missing_documents"],
        json!(["LOCATION_MAP_GPS_COORDINATES"])
    );

    let (status, mine) = h.send("GET", "/v1/applications", Some(&citizen), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine, json!([]));
}

#[tokio::test]
async fn empty_document_batch_is_incomplete_submission() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let (status, body) = h.submit(&citizen, &[]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INCOMPLETE_SUBMISSION");
}

#[tokio::test]
async fn invalid_business_fields_are_reported_per_field() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let permit = h.business_license(&citizen).await;
    let mut body = application_body(&permit["id"], &REQUIRED);
    body["phone_number"] = json!("0712");
    body["business_name"] = json!("");
    let (status, err) = h
        .send("POST", "/v1/applications", Some(&citizen), Some(body))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = err["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"business_name"));
    assert!(fields.contains(&"phone_number"));
}

#[tokio::test]
async fn business_field_errors_are_not_hidden_by_document_errors() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let permit = h.business_license(&citizen).await;
    let mut body = application_body(&permit["id"], &["NATIONAL_ID_COPY", "PASSPORT"]);
    body["business_name"] = json!("");
    let (status, err) = h
        .send("POST", "/v1/applications", Some(&citizen), Some(body))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = err["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["business_name", "documents[1].document_type"]);
}

#[tokio::test]
async fn unregistered_caller_cannot_submit() {
    let h = Harness::new();
    let stranger = format!("citizen:{}:{SECRET}", Uuid::new_v4());
    let (status, body) = h.submit(&stranger, &REQUIRED).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

// -- Review -------------------------------------------------------------------

#[tokio::test]
async fn review_and_reject_produces_three_ordered_events() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let officer = h.register("officer", "Otieno Ouma", "otieno@county.example").await;
    let (_, app) = h.submit(&citizen, &REQUIRED).await;
    let number = app["application_number"].as_str().unwrap();

    let (status, reviewed) = h.set_status(&officer, number, "UNDER_REVIEW", None).await;
    assert_eq!(status, StatusCode::OK, "{reviewed}");
    let (status, rejected) = h
        .set_status(&officer, number, "REJECTED", Some("Missing signature page"))
        .await;
    assert_eq!(status, StatusCode::OK, "{rejected}");
    assert_eq!(rejected["status"], "REJECTED");

    let timeline = h.timeline(&citizen, number).await;
    let statuses: Vec<&str> = timeline
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["SUBMITTED", "UNDER_REVIEW", "REJECTED"]);
    assert_eq!(timeline[2]["comment"], "Missing signature page");
    assert_eq!(timeline[2]["actor_name"], "Otieno Ouma");
    assert_eq!(timeline[2]["icon"], "alert");
    assert_eq!(timeline[2]["is_current"], true);
    assert_eq!(timeline[1]["is_current"], false);
}

#[tokio::test]
async fn rejection_comment_needs_ten_characters() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let officer = h.register("officer", "Otieno Ouma", "otieno@county.example").await;
    let (_, app) = h.submit(&citizen, &REQUIRED).await;
    let number = app["application_number"].as_str().unwrap();
    h.set_status(&officer, number, "UNDER_REVIEW", None).await;

    let (status, body) = h
        .set_status(&officer, number, "REJECTED", Some("123456789"))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = h
        .set_status(&officer, number, "REJECTED", Some("1234567890"))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn backward_transition_is_invalid() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let officer = h.register("officer", "Otieno Ouma", "otieno@county.example").await;
    let (_, app) = h.submit(&citizen, &REQUIRED).await;
    let number = app["application_number"].as_str().unwrap();
    h.set_status(&officer, number, "UNDER_REVIEW", None).await;

    let (status, body) = h.set_status(&officer, number, "SUBMITTED", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    assert_eq!(h.timeline(&citizen, number).await.len(), 2);
}

#[tokio::test]
async fn citizen_cannot_review() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let (_, app) = h.submit(&citizen, &REQUIRED).await;
    let number = app["application_number"].as_str().unwrap();
    let (status, _) = h.set_status(&citizen, number, "UNDER_REVIEW", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stale_version_is_conflict() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let officer = h.register("officer", "Otieno Ouma", "otieno@county.example").await;
    let (_, app) = h.submit(&citizen, &REQUIRED).await;
    let number = app["application_number"].as_str().unwrap();
    let version = app["version"].as_i64().unwrap();
    h.set_status(&officer, number, "UNDER_REVIEW", None).await;

    let (status, body) = h
        .send(
            "POST",
            &format!("/v1/applications/{number}/status"),
            Some(&officer),
            Some(json!({ "status": "APPROVED", "expected_version": version })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

// -- Access -------------------------------------------------------------------

#[tokio::test]
async fn other_citizens_are_forbidden_in_every_status() {
    let h = Harness::new();
    let owner = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let other = h.register("citizen", "Njeri Mwangi", "njeri@example.org").await;
    let officer = h.register("officer", "Otieno Ouma", "otieno@county.example").await;
    let permit = h.business_license(&owner).await;

    let mut draft_body = application_body(&permit["id"], &[]);
    draft_body.as_object_mut().unwrap().remove("documents");
    let (status, draft) = h
        .send("POST", "/v1/applications/drafts", Some(&owner), Some(draft_body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{draft}");
    let draft = draft["application_number"].as_str().unwrap().to_string();

    let (_, submitted) = h.submit(&owner, &REQUIRED).await;
    let submitted = submitted["application_number"].as_str().unwrap().to_string();

    let (_, rejected) = h.submit(&owner, &REQUIRED).await;
    let rejected = rejected["application_number"].as_str().unwrap().to_string();
    h.set_status(&officer, &rejected, "UNDER_REVIEW", None).await;
    let (status, body) = h
        .set_status(&officer, &rejected, "REJECTED", Some("Missing signature page"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let completed = pending_payment(&h, &owner).await;
    let (status, body) = h
        .callback(Some(HOOK_SECRET), callback_body(&completed, "QWE123RTY", "SUCCESS"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    for (number, expected) in [
        (&draft, "DRAFT"),
        (&submitted, "SUBMITTED"),
        (&rejected, "REJECTED"),
        (&completed, "COMPLETED"),
    ] {
        let (status, body) = h
            .send("GET", &format!("/v1/applications/{number}"), Some(&owner), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], expected);

        for path in ["", "/documents", "/timeline"] {
            let (status, body) = h
                .send(
                    "GET",
                    &format!("/v1/applications/{number}{path}"),
                    Some(&other),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{expected}{path}");
            assert_eq!(body["error"]["code"], "FORBIDDEN");
        }
    }
}

#[tokio::test]
async fn unknown_application_is_not_found() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    for number in ["APP-1718000000000-999", "nonsense"] {
        let (status, body) = h
            .send("GET", &format!("/v1/applications/{number}"), Some(&citizen), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn officer_queue_is_staff_only() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let officer = h.register("officer", "Otieno Ouma", "otieno@county.example").await;
    h.submit(&citizen, &REQUIRED).await;

    let (status, _) = h
        .send("GET", "/v1/officer/applications", Some(&citizen), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, queue) = h
        .send(
            "GET",
            "/v1/officer/applications?status=SUBMITTED&search=kangema",
            Some(&officer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, stats) = h.send("GET", "/v1/officer/stats", Some(&officer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_applications"], 1);
    assert_eq!(stats["pending_review"], 1);
}

#[tokio::test]
async fn citizen_cannot_self_register_as_officer() {
    let h = Harness::new();
    let token = format!("citizen:{}:{SECRET}", Uuid::new_v4());
    let (status, _) = h
        .send(
            "POST",
            "/v1/users",
            Some(&token),
            Some(json!({
                "full_name": "Wanjiku Kamau",
                "email": "wanjiku@example.org",
                "account_type": "officer",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Drafts -------------------------------------------------------------------

#[tokio::test]
async fn draft_can_be_submitted_with_documents() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let permit = h.business_license(&citizen).await;
    let mut body = application_body(&permit["id"], &[]);
    body.as_object_mut().unwrap().remove("documents");
    let (status, draft) = h
        .send("POST", "/v1/applications/drafts", Some(&citizen), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{draft}");
    assert_eq!(draft["status"], "DRAFT");
    let number = draft["application_number"].as_str().unwrap();

    let documents = application_body(&permit["id"], &REQUIRED)["documents"].clone();
    let (status, submitted) = h
        .send(
            "POST",
            &format!("/v1/applications/{number}/submit"),
            Some(&citizen),
            Some(json!({ "documents": documents })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{submitted}");
    assert_eq!(submitted["status"], "SUBMITTED");

    let labels: Vec<String> = h
        .timeline(&citizen, number)
        .await
        .iter()
        .map(|e| e["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, ["Draft Created", "Application Submitted"]);
}

// -- Payments -----------------------------------------------------------------

async fn pending_payment(h: &Harness, citizen: &str) -> String {
    let (_, app) = h.submit(citizen, &REQUIRED).await;
    let number = app["application_number"].as_str().unwrap().to_string();
    let (status, intent) = h
        .send(
            "POST",
            &format!("/v1/applications/{number}/payment"),
            Some(citizen),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{intent}");
    assert_eq!(intent["amount"], "2500.00");
    assert_eq!(intent["application_number"], number.as_str());
    number
}

fn callback_body(number: &str, transaction_id: &str, status: &str) -> Value {
    json!({
        "application_number": number,
        "transaction_id": transaction_id,
        "status": status,
        "method": "MPESA",
        "amount": "2500.00",
        "timestamp": "2024-06-10T08:30:00Z",
    })
}

#[tokio::test]
async fn payment_callback_completes_application() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let number = pending_payment(&h, &citizen).await;
    assert_eq!(h.timeline(&citizen, &number).await.len(), 2);

    let (status, body) = h
        .callback(Some(HOOK_SECRET), callback_body(&number, "QWE123RTY", "SUCCESS"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["application_status"], "COMPLETED");
    assert_eq!(body["replayed"], false);

    let timeline = h.timeline(&citizen, &number).await;
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline[2]["status"], "COMPLETED");
    assert!(timeline[2]["comment"].is_null());
    assert_eq!(timeline[2]["actor_name"], "County System");
}

#[tokio::test]
async fn repeated_callback_is_idempotent() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let number = pending_payment(&h, &citizen).await;
    let body = callback_body(&number, "QWE123RTY", "SUCCESS");

    let (first, _) = h.callback(Some(HOOK_SECRET), body.clone()).await;
    let (second, replay) = h.callback(Some(HOOK_SECRET), body).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(replay["replayed"], true);
    assert_eq!(h.timeline(&citizen, &number).await.len(), 3);
}

#[tokio::test]
async fn failed_payment_leaves_application_pending() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let number = pending_payment(&h, &citizen).await;
    let (status, body) = h
        .callback(Some(HOOK_SECRET), callback_body(&number, "CARD-77", "FAILED"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_status"], "PAYMENT_PENDING");
    assert_eq!(h.timeline(&citizen, &number).await.len(), 2);
}

#[tokio::test]
async fn callback_requires_signature() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    let number = pending_payment(&h, &citizen).await;
    let body = callback_body(&number, "QWE123RTY", "SUCCESS");

    let (status, _) = h.callback(None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h.callback(Some("guess"), body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.timeline(&citizen, &number).await.len(), 2);
}

#[tokio::test]
async fn dashboard_counts_own_applications() {
    let h = Harness::new();
    let citizen = h.register("citizen", "Wanjiku Kamau", "wanjiku@example.org").await;
    h.submit(&citizen, &REQUIRED).await;
    let number = pending_payment(&h, &citizen).await;
    h.callback(Some(HOOK_SECRET), callback_body(&number, "QWE123RTY", "SUCCESS"))
        .await;

    let (status, dash) = h.send("GET", "/v1/dashboard", Some(&citizen), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total"], 2);
    assert_eq!(dash["pending"], 1);
    assert_eq!(dash["approved"], 1);
    assert_eq!(dash["rejected"], 0);
    assert_eq!(dash["recent"].as_array().unwrap().len(), 2);
}
