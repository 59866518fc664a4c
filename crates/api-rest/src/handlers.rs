//! HTTP handlers.
//!
//! Every handler except `health` authenticates the caller through [`Authenticated`] and hands the
//! resulting principal to the core services. Handlers translate between wire shapes and core
//! types and nothing more.

use crate::error::{ApiError, ErrorRes};
use crate::extract::Authenticated;
use crate::AppState;
use api_shared::{HealthRes, HealthService};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use dxcat_core::predicate::{SortKey, SortOrder, SortSpec};
use dxcat_core::validation::parse_record_id;
use dxcat_core::{
    CodingSystem, CoreConfig, DiagnosisEntry, DiagnosisNote, DiagnosisPage, DiagnosisPatch,
    ImportSummary, ListQuery, MatchOutcome, MatchQuery, NewDiagnosis, PageRequest, Scope,
    TriageContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.parse().map(Some).map_err(ApiError::BadRequest),
        None => Ok(None),
    }
}

/// Query parameters of `GET /diagnoses`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Case-insensitive substring over name, codes, section and chapter.
    pub search: Option<String>,
    /// `global`, `organization` or `personal`.
    pub scope: Option<String>,
    /// `DSM-5` or `ICD-10`.
    pub system: Option<String>,
    /// `name`, `code`, `codingSystem`, `scope`, `createdAt` or `updatedAt`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListParams {
    fn into_query(self, cfg: &CoreConfig) -> Result<ListQuery, ApiError> {
        let key: SortKey = parse_optional(self.sort_by.as_deref())?.unwrap_or_default();
        let order: SortOrder = parse_optional(self.sort_order.as_deref())?.unwrap_or_default();
        Ok(ListQuery {
            search: self.search,
            scope: parse_optional::<Scope>(self.scope.as_deref())?,
            coding_system: parse_optional::<CodingSystem>(self.system.as_deref())?,
            sort: SortSpec::new(key, order),
            page: PageRequest::coerce(self.page.as_deref(), self.page_size.as_deref(), cfg),
        })
    }
}

/// Body of `POST /diagnoses/match`.
///
/// `page` and `pageSize` accept numbers or numeric strings; anything unusable falls back to the
/// defaults. The triage context fields are accepted alongside the symptoms.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchReq {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub coding_system: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub page: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub page_size: Option<Value>,
    #[serde(default)]
    pub show_all: bool,
    #[serde(flatten)]
    pub context: TriageContext,
}

fn loose_number(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

impl MatchReq {
    fn into_query(self, cfg: &CoreConfig) -> Result<MatchQuery, ApiError> {
        let page = PageRequest::coerce(
            loose_number(self.page.as_ref()).as_deref(),
            loose_number(self.page_size.as_ref()).as_deref(),
            cfg,
        );
        Ok(MatchQuery {
            symptoms: self.symptoms,
            coding_system: parse_optional::<CodingSystem>(self.coding_system.as_deref())?,
            page,
            show_all: self.show_all,
            context: self.context,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteReq {
    pub content: String,
}

/// Query parameters of `GET /symptoms`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SymptomParams {
    /// Returns names starting with this prefix (normalised first).
    pub prefix: Option<String>,
    pub limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
///
/// Unauthenticated; used by monitoring and load balancers.
#[axum::debug_handler(state = AppState)]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/diagnoses",
    params(ListParams),
    responses(
        (status = 200, description = "One page of readable diagnoses", body = DiagnosisPage),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_diagnoses(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(params): Query<ListParams>,
) -> Result<Json<DiagnosisPage>, ApiError> {
    let query = params.into_query(&state.cfg)?;
    Ok(Json(state.catalog.list_readable(&principal, &query).await?))
}

#[utoipa::path(
    post,
    path = "/diagnoses",
    request_body = NewDiagnosis,
    responses(
        (status = 201, description = "Diagnosis created", body = DiagnosisEntry),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 409, description = "Duplicate name and code", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Create a diagnosis.
///
/// Scope is assigned from the caller's role; only an organization admin may opt into
/// `personal`.
#[axum::debug_handler(state = AppState)]
pub async fn create_diagnosis(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(req): Json<NewDiagnosis>,
) -> Result<(StatusCode, Json<DiagnosisEntry>), ApiError> {
    let entry = state.catalog.create(&principal, req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    post,
    path = "/diagnoses/import",
    request_body = Vec<NewDiagnosis>,
    responses(
        (status = 200, description = "Import summary, including per-record failures", body = ImportSummary),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 403, description = "Caller is not a platform admin", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn import_diagnoses(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(records): Json<Vec<NewDiagnosis>>,
) -> Result<Json<ImportSummary>, ApiError> {
    Ok(Json(state.catalog.bulk_import(&principal, records).await?))
}

#[utoipa::path(
    post,
    path = "/diagnoses/match",
    request_body = MatchReq,
    responses(
        (status = 200, description = "Ranked matches", body = MatchOutcome),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Rank the caller's readable diagnoses against a set of symptoms.
#[axum::debug_handler(state = AppState)]
pub async fn match_diagnoses(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(req): Json<MatchReq>,
) -> Result<Json<MatchOutcome>, ApiError> {
    let query = req.into_query(&state.cfg)?;
    Ok(Json(state.matching.match_symptoms(&principal, &query).await?))
}

#[utoipa::path(
    get,
    path = "/diagnoses/{id}",
    params(("id" = String, Path, description = "Diagnosis identifier")),
    responses(
        (status = 200, description = "The diagnosis", body = DiagnosisEntry),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn get_diagnosis(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DiagnosisEntry>, ApiError> {
    let id = parse_record_id(&id)?;
    Ok(Json(state.catalog.get_one(&principal, &id).await?))
}

#[utoipa::path(
    put,
    path = "/diagnoses/{id}",
    params(("id" = String, Path, description = "Diagnosis identifier")),
    request_body = DiagnosisPatch,
    responses(
        (status = 200, description = "Diagnosis updated", body = DiagnosisEntry),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 403, description = "Not allowed to modify", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes),
        (status = 409, description = "Duplicate name and code", body = ErrorRes)
    )
)]
/// Update a diagnosis. Write-once fields in the body are ignored.
#[axum::debug_handler(state = AppState)]
pub async fn update_diagnosis(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    Json(patch): Json<DiagnosisPatch>,
) -> Result<Json<DiagnosisEntry>, ApiError> {
    let id = parse_record_id(&id)?;
    Ok(Json(state.catalog.update(&principal, &id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/diagnoses/{id}",
    params(("id" = String, Path, description = "Diagnosis identifier")),
    responses(
        (status = 204, description = "Diagnosis deleted"),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 403, description = "Not allowed to modify", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn delete_diagnosis(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_record_id(&id)?;
    state.catalog.delete(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/diagnoses/{id}/notes",
    params(("id" = String, Path, description = "Diagnosis identifier")),
    responses(
        (status = 200, description = "Notes on the diagnosis", body = Vec<DiagnosisNote>),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_notes(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Vec<DiagnosisNote>>, ApiError> {
    let id = parse_record_id(&id)?;
    Ok(Json(state.notes.list(&principal, &id).await?))
}

#[utoipa::path(
    post,
    path = "/diagnoses/{id}/notes",
    params(("id" = String, Path, description = "Diagnosis identifier")),
    request_body = NoteReq,
    responses(
        (status = 201, description = "Note added", body = DiagnosisNote),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn add_note(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<NoteReq>,
) -> Result<(StatusCode, Json<DiagnosisNote>), ApiError> {
    let id = parse_record_id(&id)?;
    let note = state.notes.add(&principal, &id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    put,
    path = "/diagnoses/{id}/notes/{note_id}",
    params(
        ("id" = String, Path, description = "Diagnosis identifier"),
        ("note_id" = String, Path, description = "Note identifier")
    ),
    request_body = NoteReq,
    responses(
        (status = 200, description = "Note edited", body = DiagnosisNote),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 403, description = "Caller is not the author", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn edit_note(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path((id, note_id)): Path<(String, String)>,
    Json(req): Json<NoteReq>,
) -> Result<Json<DiagnosisNote>, ApiError> {
    let id = parse_record_id(&id)?;
    let note_id = parse_record_id(&note_id)?;
    Ok(Json(
        state.notes.edit(&principal, &id, &note_id, &req.content).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/diagnoses/{id}/notes/{note_id}",
    params(
        ("id" = String, Path, description = "Diagnosis identifier"),
        ("note_id" = String, Path, description = "Note identifier")
    ),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 401, description = "Unauthenticated", body = ErrorRes),
        (status = 403, description = "Caller is not the author", body = ErrorRes),
        (status = 404, description = "Not found or not accessible", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn delete_note(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path((id, note_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id = parse_record_id(&id)?;
    let note_id = parse_record_id(&note_id)?;
    state.notes.delete(&principal, &id, &note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/symptoms",
    params(SymptomParams),
    responses(
        (status = 200, description = "Symptom names for autocomplete", body = Vec<String>),
        (status = 401, description = "Unauthenticated", body = ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_symptoms(
    State(state): State<AppState>,
    Authenticated(_principal): Authenticated,
    Query(params): Query<SymptomParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let limit = PageRequest::coerce(None, params.limit.as_deref(), &state.cfg).page_size();
    let prefix = params.prefix.unwrap_or_default();
    Ok(Json(state.vocabulary.suggest(&prefix, limit).await?))
}
