//! # API REST
//!
//! REST API for the BINPROFKES E-RM core.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! The acting user is identified by the `x-user-id` header. Every read of patient data
//! goes through the core's disclosure gate on that user's behalf. Role gating is the
//! caller's concern; every data rule lives in `erm-core`.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;
pub mod handlers;

use axum::routing::{get, post, put};
use axum::Router;
use erm_core::ErmCore;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use handlers::ACTOR_HEADER;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub core: ErmCore,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::personnel::create_patient,
        handlers::personnel::list_patients,
        handlers::personnel::get_patient,
        handlers::personnel::transfer_patient,
        handlers::personnel::create_user,
        handlers::personnel::list_users,
        handlers::personnel::record_login,
        handlers::records::create_encounter,
        handlers::records::get_encounter,
        handlers::records::update_encounter,
        handlers::records::delete_encounter,
        handlers::records::create_periodic_exam,
        handlers::records::get_periodic_exam,
        handlers::records::update_periodic_exam,
        handlers::records::delete_periodic_exam,
        handlers::records::periodic_exam_history,
        handlers::records::timeline,
        handlers::records::diagnoses,
        handlers::records::procedures,
        handlers::records::supporting_results,
        handlers::records::visit_stats,
        handlers::records::resume,
        handlers::access::request_access,
        handlers::access::patient_grants,
        handlers::access::user_grants,
        handlers::access::access_stats,
        handlers::continuity::create_export,
        handlers::continuity::get_export,
        handlers::continuity::export_document,
        handlers::continuity::patient_exports,
        handlers::audit::logs,
        handlers::audit::user_logs,
    ),
    components(schemas(
        dto::HealthRes,
        dto::ErrorRes,
        dto::CreatePatientReq,
        dto::CreateUserReq,
        dto::TransferPatientReq,
        dto::AccessGrantReq,
        dto::MedicationReq,
        dto::ContinuityExportReq,
        dto::ResumeRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full application router, Swagger UI included.
pub fn router(core: ErmCore) -> Router {
    use handlers::{access, audit, continuity, personnel, records};

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(personnel::list_patients).post(personnel::create_patient),
        )
        .route("/patients/:id", get(personnel::get_patient))
        .route("/patients/:id/unit", put(personnel::transfer_patient))
        .route("/patients/:id/timeline", get(records::timeline))
        .route("/patients/:id/diagnoses", get(records::diagnoses))
        .route("/patients/:id/procedures", get(records::procedures))
        .route(
            "/patients/:id/supporting-results",
            get(records::supporting_results),
        )
        .route("/patients/:id/stats", get(records::visit_stats))
        .route("/patients/:id/resume", get(records::resume))
        .route(
            "/patients/:id/periodic-exams",
            get(records::periodic_exam_history),
        )
        .route("/patients/:id/access-grants", get(access::patient_grants))
        .route("/patients/:id/access-stats", get(access::access_stats))
        .route(
            "/patients/:id/continuity-exports",
            get(continuity::patient_exports),
        )
        .route(
            "/users",
            get(personnel::list_users).post(personnel::create_user),
        )
        .route("/users/:id/login", post(personnel::record_login))
        .route("/users/:id/access-grants", get(access::user_grants))
        .route("/users/:id/audit-logs", get(audit::user_logs))
        .route("/encounters", post(records::create_encounter))
        .route(
            "/encounters/:id",
            get(records::get_encounter)
                .put(records::update_encounter)
                .delete(records::delete_encounter),
        )
        .route("/periodic-exams", post(records::create_periodic_exam))
        .route(
            "/periodic-exams/:id",
            get(records::get_periodic_exam)
                .put(records::update_periodic_exam)
                .delete(records::delete_periodic_exam),
        )
        .route("/access-grants", post(access::request_access))
        .route("/continuity-exports", post(continuity::create_export))
        .route("/continuity-exports/:id", get(continuity::get_export))
        .route(
            "/continuity-exports/:id/document",
            get(continuity::export_document),
        )
        .route("/audit-logs", get(audit::logs))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { core })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use erm_core::models::{
        AuditAction, EncounterType, ExamCategory, ExamFindings, NewEncounter, NewPatient,
        NewPeriodicExam, NewUser, Patient, Rank, Role, User,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Setup {
        core: ErmCore,
        patient: Patient,
        home_user: User,
        other_user: User,
    }

    fn setup() -> Setup {
        let core = ErmCore::in_memory();
        let directory = core.directory();
        let home_user = directory
            .create_user(
                NewUser {
                    name: "Dr. Rina".into(),
                    role: Role::Operator,
                    unit: Some("Lanud Halim".into()),
                },
                None,
            )
            .unwrap();
        let other_user = directory
            .create_user(
                NewUser {
                    name: "Dr. Agus".into(),
                    role: Role::Operator,
                    unit: Some("Lanud Iswahjudi".into()),
                },
                Some(home_user.id),
            )
            .unwrap();
        let patient = directory
            .create_patient(
                NewPatient {
                    nrp: "521001".into(),
                    name: "Serka Budi Santoso".into(),
                    rank: Rank::Bintara,
                    corps: None,
                    unit: "Lanud Halim".into(),
                    position: None,
                },
                home_user.id,
            )
            .unwrap();
        Setup {
            core,
            patient,
            home_user,
            other_user,
        }
    }

    fn request(method: &str, uri: &str, actor: Option<&User>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = actor {
            builder = builder.header(ACTOR_HEADER, user.id.to_string());
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(core: &ErmCore, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(core.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let s = setup();
        let (status, body) = send(&s.core, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["ok"], true);
    }

    #[tokio::test]
    async fn missing_actor_is_unauthorized() {
        let s = setup();
        let body = json!({"patient_id": s.patient.id.to_string(), "code": "Rikkes", "categories": ["timeline"]});
        let (status, body) = send(&s.core, request("POST", "/access-grants", None, Some(body))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(&body)["error"], "unauthenticated");
    }

    #[tokio::test]
    async fn lainnya_without_note_is_rejected_without_writes() {
        let s = setup();
        let audit_before = s.core.audit().logs().unwrap().len();
        let body = json!({
            "patient_id": s.patient.id.to_string(),
            "code": "Lainnya",
            "categories": ["timeline"],
        });

        let (status, body) = send(
            &s.core,
            request("POST", "/access-grants", Some(&s.other_user), Some(body)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "validation");
        assert!(s.core.access().grants_by_patient(s.patient.id).unwrap().is_empty());
        assert_eq!(s.core.audit().logs().unwrap().len(), audit_before);
    }

    #[tokio::test]
    async fn unknown_justification_code_is_rejected() {
        let s = setup();
        let body = json!({
            "patient_id": s.patient.id.to_string(),
            "code": "Penasaran",
            "categories": ["timeline"],
        });
        let (status, _) = send(
            &s.core,
            request("POST", "/access-grants", Some(&s.other_user), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn disclosure_needs_a_grant_outside_home_unit() {
        let s = setup();
        let uri = format!("/patients/{}/timeline", s.patient.id);

        let (status, body) = send(&s.core, request("GET", &uri, Some(&s.other_user), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json_body(&body)["error"], "access_denied");

        let grant = json!({
            "patient_id": s.patient.id.to_string(),
            "code": "Rujukan",
            "categories": ["timeline"],
        });
        let (status, body) = send(
            &s.core,
            request("POST", "/access-grants", Some(&s.other_user), Some(grant)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_body(&body)["target_facility"], "Lanud Halim");

        let (status, _) = send(&s.core, request("GET", &uri, Some(&s.other_user), None)).await;
        assert_eq!(status, StatusCode::OK);

        let resume_uri = format!("/patients/{}/resume", s.patient.id);
        let (status, _) = send(&s.core, request("GET", &resume_uri, Some(&s.other_user), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&s.core, request("GET", &resume_uri, Some(&s.home_user), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn patient_reads_go_through_the_disclosure_gate() {
        let s = setup();
        let mut new = NewEncounter::new(s.patient.id, "Lanud Halim", EncounterType::Umum);
        new.diagnosis = Some("HIV".into());
        let encounter = s
            .core
            .records()
            .create_encounter(new, s.home_user.id)
            .unwrap();
        let exam = s
            .core
            .records()
            .create_periodic_exam(
                NewPeriodicExam {
                    patient_id: s.patient.id,
                    unit: "Lanud Halim".into(),
                    findings: ExamFindings::new(2024, ExamCategory::Periodik),
                    doctor_id: None,
                    status: None,
                },
                s.home_user.id,
            )
            .unwrap();
        let export = s
            .core
            .exporter()
            .export_for_transfer(
                s.patient.id,
                "Lanud Halim",
                "RSAU Esnawan",
                s.home_user.id,
                None,
            )
            .unwrap();

        let patient = s.patient.id;
        let uris = [
            format!("/patients/{patient}/timeline"),
            format!("/patients/{patient}/diagnoses"),
            format!("/patients/{patient}/procedures"),
            format!("/patients/{patient}/supporting-results"),
            format!("/patients/{patient}/stats"),
            format!("/patients/{patient}/periodic-exams"),
            format!("/patients/{patient}/resume"),
            format!("/patients/{patient}/continuity-exports"),
            format!("/encounters/{}", encounter.id),
            format!("/periodic-exams/{}", exam.id),
            format!("/continuity-exports/{}", export.id),
            format!("/continuity-exports/{}/document", export.id),
        ];

        for uri in &uris {
            let (status, body) = send(&s.core, request("GET", uri, None, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(!String::from_utf8_lossy(&body).contains("HIV"), "{uri}");

            let (status, body) = send(&s.core, request("GET", uri, Some(&s.other_user), None)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(json_body(&body)["error"], "access_denied", "{uri}");

            let (status, _) = send(&s.core, request("GET", uri, Some(&s.home_user), None)).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
        }
        assert!(s.core.access().grants_by_patient(s.patient.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_is_recorded_only_for_the_acting_user() {
        let s = setup();
        let uri = format!("/users/{}/login", s.home_user.id);

        let (status, _) = send(&s.core, request("POST", &uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = send(&s.core, request("POST", &uri, Some(&s.other_user), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json_body(&body)["error"], "access_denied");
        let logins = |user: &User| {
            s.core
                .audit()
                .logs_by_user(user.id)
                .unwrap()
                .into_iter()
                .filter(|e| e.action == AuditAction::Login)
                .count()
        };
        assert_eq!(logins(&s.home_user), 0);

        let (status, body) = send(&s.core, request("POST", &uri, Some(&s.home_user), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_body(&body)["user_id"], s.home_user.id.to_string());
        assert_eq!(logins(&s.home_user), 1);
    }

    #[tokio::test]
    async fn only_the_first_user_registers_without_an_actor() {
        let s = setup();
        let body = json!({"name": "Sertu Wati", "role": "Viewer", "unit": "Lanud Halim"});

        let (status, response) = send(&s.core, request("POST", "/users", None, Some(body.clone()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(&response)["error"], "unauthenticated");
        assert_eq!(s.core.directory().users().unwrap().len(), 2);

        let (status, _) = send(&s.core, request("POST", "/users", Some(&s.home_user), Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);

        let fresh = ErmCore::in_memory();
        let body = json!({"name": "Admin", "role": "SuperAdmin"});
        let (status, _) = send(&fresh, request("POST", "/users", None, Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn encounter_lifecycle_and_not_found() {
        let s = setup();
        let new = json!({
            "patient_id": s.patient.id.to_string(),
            "unit": "Lanud Halim",
            "encounter_type": "Umum",
            "complaint": "Demam",
        });
        let (status, body) = send(
            &s.core,
            request("POST", "/encounters", Some(&s.home_user), Some(new)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json_body(&body)["id"].as_str().unwrap().to_string();

        let patch = json!({"unit": "Lanud Iswahjudi"});
        let (status, _) = send(
            &s.core,
            request("PUT", &format!("/encounters/{id}"), Some(&s.home_user), Some(patch)),
        )
        .await;
        assert!(status.is_client_error());

        let (status, _) = send(
            &s.core,
            request("DELETE", &format!("/encounters/{id}"), Some(&s.home_user), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &s.core,
            request("GET", &format!("/encounters/{id}"), Some(&s.home_user), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["error"], "not_found");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let s = setup();
        let (status, _) = send(&s.core, request("GET", "/patients/not-an-id", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_document_is_plain_text() {
        let s = setup();
        let body = json!({
            "patient_id": s.patient.id.to_string(),
            "origin_facility": "Lanud Halim",
            "destination_facility": "RSAU Esnawan",
            "transfer_note": "Mutasi",
        });
        let (status, body) = send(
            &s.core,
            request("POST", "/continuity-exports", Some(&s.home_user), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json_body(&body)["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &s.core,
            request(
                "GET",
                &format!("/continuity-exports/{id}/document"),
                Some(&s.home_user),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("Fasilitas Tujuan: RSAU Esnawan"));
        assert!(text.contains("Dokumen ini digenerate secara otomatis oleh sistem BINPROFKES"));
    }
}
