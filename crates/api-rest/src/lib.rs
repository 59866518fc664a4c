//! # API REST
//!
//! REST API implementation for the diagnosis catalog.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status-code mapping)
//!
//! Uses `api-shared` for health and authentication helpers.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use dxcat_core::{
    CatalogService, CoreConfig, MatchingEngine, NoteService, Stores, VisibilityResolver,
    VocabularyService,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server.
///
/// Contains the core services every handler delegates to, plus the API key resolved at
/// startup.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    api_key: Arc<str>,
    catalog: CatalogService,
    notes: NoteService,
    matching: MatchingEngine,
    vocabulary: VocabularyService,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, stores: &Stores, api_key: impl Into<Arc<str>>) -> Self {
        let catalog = CatalogService::new(cfg.clone(), stores);
        Self {
            api_key: api_key.into(),
            notes: NoteService::new(catalog.clone()),
            matching: MatchingEngine::new(
                VisibilityResolver::new(stores.membership.clone()),
                stores.catalog.clone(),
            ),
            vocabulary: VocabularyService::new(stores.vocabulary.clone()),
            catalog,
            cfg,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_diagnoses,
        handlers::create_diagnosis,
        handlers::import_diagnoses,
        handlers::match_diagnoses,
        handlers::get_diagnosis,
        handlers::update_diagnosis,
        handlers::delete_diagnosis,
        handlers::list_notes,
        handlers::add_note,
        handlers::edit_note,
        handlers::delete_note,
        handlers::list_symptoms,
    ),
    components(schemas(
        api_shared::HealthRes,
        error::ErrorRes,
        handlers::MatchReq,
        handlers::NoteReq,
        dxcat_core::DiagnosisEntry,
        dxcat_core::DiagnosisNote,
        dxcat_core::DiagnosisPage,
        dxcat_core::DiagnosisPatch,
        dxcat_core::NewDiagnosis,
        dxcat_core::ImportSummary,
        dxcat_core::ImportFailure,
        dxcat_core::MatchOutcome,
        dxcat_core::RankedEntry,
        dxcat_core::TriageContext,
        dxcat_core::Pagination,
        dxcat_core::Scope,
        dxcat_core::CodingSystem,
        dxcat_core::model::ClinicalDetails,
        dxcat_core::model::TypicalDuration,
        dxcat_core::model::DurationUnit,
        dxcat_core::model::Course,
        dxcat_core::model::OneOrMany,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI mounted at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/diagnoses",
            get(handlers::list_diagnoses).post(handlers::create_diagnosis),
        )
        .route("/diagnoses/import", post(handlers::import_diagnoses))
        .route("/diagnoses/match", post(handlers::match_diagnoses))
        .route(
            "/diagnoses/:id",
            get(handlers::get_diagnosis)
                .put(handlers::update_diagnosis)
                .delete(handlers::delete_diagnosis),
        )
        .route(
            "/diagnoses/:id/notes",
            get(handlers::list_notes).post(handlers::add_note),
        )
        .route(
            "/diagnoses/:id/notes/:note_id",
            axum::routing::put(handlers::edit_note).delete(handlers::delete_note),
        )
        .route("/symptoms", get(handlers::list_symptoms))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dxcat_core::repositories::memory::{
        InMemoryCatalog, InMemoryMembership, InMemoryVocabulary, MemberRecord,
        OrganizationMembership,
    };
    use dxcat_core::{OrganizationId, PrincipalId};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    type Caller<'a> = (&'a str, &'a str, Option<&'a str>);

    const ROOT: Caller<'static> = ("root", "super_admin", None);
    const ADMIN_A: Caller<'static> = ("admin-a", "company_admin", Some("org-a"));
    const PSY_A1: Caller<'static> = ("psy-a1", "psychologist", Some("org-a"));
    const PSY_B1: Caller<'static> = ("psy-b1", "psychologist", Some("org-b"));

    fn app() -> Router {
        let membership = InMemoryMembership::from_organizations(vec![
            OrganizationMembership {
                organization_id: OrganizationId::new("org-a"),
                admin_id: Some(PrincipalId::new("admin-a")),
                psychologists: vec![MemberRecord {
                    id: PrincipalId::new("psy-a1"),
                    active: true,
                }],
            },
            OrganizationMembership {
                organization_id: OrganizationId::new("org-b"),
                admin_id: Some(PrincipalId::new("admin-b")),
                psychologists: vec![MemberRecord {
                    id: PrincipalId::new("psy-b1"),
                    active: true,
                }],
            },
        ]);
        let stores = Stores {
            catalog: Arc::new(InMemoryCatalog::default()),
            membership: Arc::new(membership),
            vocabulary: Arc::new(InMemoryVocabulary::default()),
        };
        router(AppState::new(Arc::new(CoreConfig::default()), &stores, KEY))
    }

    fn request(method: &str, uri: &str, caller: Option<Caller<'_>>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some((id, role, org)) = caller {
            builder = builder
                .header("x-api-key", KEY)
                .header("x-principal-id", id)
                .header("x-principal-role", role);
            if let Some(org) = org {
                builder = builder.header("x-organization-id", org);
            }
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        builder.body(body).expect("request should build")
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.expect("router should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, value)
    }

    async fn create(app: &Router, caller: Caller<'_>, body: Value) -> Value {
        let (status, entry) = send(app, request("POST", "/diagnoses", Some(caller), Some(body))).await;
        assert_eq!(status, StatusCode::CREATED, "create should succeed: {entry}");
        entry
    }

    #[tokio::test]
    async fn test_health_needs_no_credentials() {
        let app = app();
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_rejects_missing_or_bad_credentials() {
        let app = app();
        let (status, _) = send(&app, request("GET", "/diagnoses", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            request("GET", "/diagnoses", Some(("u", "janitor", None)), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("x-principal-role"));
    }

    #[tokio::test]
    async fn test_create_read_update_status_codes() {
        let app = app();
        let entry = create(
            &app,
            ADMIN_A,
            json!({"name": "Panic Disorder", "dsm5Code": "300.01", "symptoms": ["Palpitations"]}),
        )
        .await;
        assert_eq!(entry["scope"], "organization");
        assert_eq!(entry["organizationId"], "org-a");
        assert_eq!(entry["symptoms"], json!(["palpitations"]));
        let uri = format!("/diagnoses/{}", entry["id"].as_str().unwrap());

        let (status, _) = send(&app, request("GET", &uri, Some(PSY_A1), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, hidden) = send(&app, request("GET", &uri, Some(PSY_B1), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, forbidden) = send(
            &app,
            request("PUT", &uri, Some(PSY_A1), Some(json!({"summary": "x"}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(hidden["error"], forbidden["error"]);

        let (status, updated) = send(
            &app,
            request(
                "PUT",
                &uri,
                Some(ADMIN_A),
                Some(json!({"name": "Renamed", "summary": "Recurrent attacks"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Panic Disorder");
        assert_eq!(updated["summary"], "Recurrent attacks");

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/diagnoses",
                Some(ADMIN_A),
                Some(json!({"name": "Panic Disorder", "dsm5Code": "300.01"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            request("POST", "/diagnoses", Some(ADMIN_A), Some(json!({"name": "No Code"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, request("GET", "/diagnoses/not-an-id", Some(ADMIN_A), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_match_end_to_end() {
        let app = app();
        create(
            &app,
            ADMIN_A,
            json!({
                "name": "Major Depressive Disorder",
                "dsm5Code": "296.23",
                "symptoms": ["depressed mood", "insomnia"]
            }),
        )
        .await;

        let (status, outcome) = send(
            &app,
            request(
                "POST",
                "/diagnoses/match",
                Some(PSY_A1),
                Some(json!({
                    "symptoms": ["#Depressed_Mood"],
                    "page": "abc",
                    "pageSize": 0,
                    "course": "Episodic"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["results"][0]["matchCount"], 1);
        assert_eq!(outcome["results"][0]["matchPercentage"], 50.0);
        assert_eq!(outcome["results"][0]["matchedSymptoms"], json!(["depressed_mood"]));
        assert_eq!(outcome["pagination"]["currentPage"], 1);
        assert_eq!(outcome["pagination"]["itemsPerPage"], 20);

        let (_, other_tenant) = send(
            &app,
            request(
                "POST",
                "/diagnoses/match",
                Some(PSY_B1),
                Some(json!({"symptoms": ["depressed mood"]})),
            ),
        )
        .await;
        assert_eq!(other_tenant["results"], json!([]));

        let (_, empty) = send(
            &app,
            request("POST", "/diagnoses/match", Some(PSY_A1), Some(json!({"symptoms": ["  #"]}))),
        )
        .await;
        assert_eq!(empty["results"], json!([]));
        assert_eq!(empty["pagination"]["totalItems"], 0);
        assert_eq!(empty["pagination"]["hasNextPage"], false);
    }

    #[tokio::test]
    async fn test_import_requires_super_admin() {
        let app = app();
        let records = json!([
            {"name": "Insomnia Disorder", "dsm5Code": "307.42", "scope": "personal"},
            {"name": "Missing Code"}
        ]);

        let (status, _) = send(
            &app,
            request("POST", "/diagnoses/import", Some(ADMIN_A), Some(records.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, summary) = send(
            &app,
            request("POST", "/diagnoses/import", Some(ROOT), Some(records)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["insertedCount"], 1);
        assert_eq!(summary["entries"][0]["scope"], "global");
        assert_eq!(summary["failures"][0]["index"], 1);

        let (_, page) = send(&app, request("GET", "/diagnoses?search=insomnia", Some(PSY_B1), None)).await;
        assert_eq!(page["pagination"]["totalItems"], 1);
    }

    #[tokio::test]
    async fn test_notes_and_delete_flow() {
        let app = app();
        let entry = create(
            &app,
            ADMIN_A,
            json!({"name": "Social Anxiety Disorder", "icd10Code": "F40.10"}),
        )
        .await;
        let entry_uri = format!("/diagnoses/{}", entry["id"].as_str().unwrap());
        let notes_uri = format!("{entry_uri}/notes");

        let (status, note) = send(
            &app,
            request("POST", &notes_uri, Some(PSY_A1), Some(json!({"content": "check onset"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let note_uri = format!("{notes_uri}/{}", note["id"].as_str().unwrap());

        let (status, _) = send(
            &app,
            request("PUT", &note_uri, Some(ADMIN_A), Some(json!({"content": "hijack"}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, notes) = send(&app, request("GET", &notes_uri, Some(ADMIN_A), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(notes[0]["content"], "check onset");

        let (status, _) = send(&app, request("DELETE", &note_uri, Some(PSY_A1), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, request("DELETE", &entry_uri, Some(ADMIN_A), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("GET", &entry_uri, Some(ADMIN_A), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_sort_field() {
        let app = app();
        let (status, body) = send(
            &app,
            request("GET", "/diagnoses?sortBy=colour", Some(PSY_A1), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("colour"));
    }

    #[test]
    fn test_openapi_lists_catalog_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/diagnoses", "/diagnoses/match", "/diagnoses/{id}/notes/{note_id}", "/symptoms"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
