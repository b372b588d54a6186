use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::extractor::AuthUser;
use crate::errors::AppError;
use crate::models::submission::{
    new_submission_id, AgentSnapshot, ImageKind, ImageRef, SubmissionFields, SubmissionStatus,
};
use crate::profile::generator::{generate_profile, BorrowerInput};
use crate::state::AppState;
use crate::storage::{delete_quietly, extension_for_mime};
use crate::submissions::images::replace_image;
use crate::submissions::query::{matches_search, paginate, DEFAULT_PAGE_SIZE};
use crate::submissions::store;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<SubmissionStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: SubmissionStatus,
    pub notes: Option<String>,
}

/// POST /api/submissions
///
/// Multipart intake: text parts carry borrower/waiver/agent fields, file parts
/// carry the optional photo and signatures. Unauthenticated — intake devices
/// sit behind their own kiosk gateway.
pub async fn handle_create_submission(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut fields = SubmissionFields::default();
    let mut agent = AgentSnapshot::default();
    let mut uploads: Vec<(ImageKind, Bytes, String)> = Vec::new();

    while let Some(part) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = part.name().map(str::to_string) else {
            continue;
        };

        if let Some(kind) = image_kind_for_part(&name) {
            let content_type = part.content_type().map(str::to_string).unwrap_or_default();
            if extension_for_mime(&content_type).is_none() {
                return Err(AppError::Validation(format!(
                    "Unsupported image type '{content_type}' for {name}"
                )));
            }
            let bytes = part.bytes().await.map_err(bad_multipart)?;
            if !bytes.is_empty() {
                uploads.push((kind, bytes, content_type));
            }
        } else {
            let value = part.text().await.map_err(bad_multipart)?;
            assign_text_field(&mut fields, &mut agent, &name, value);
        }
    }

    let missing = fields.missing_required();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    // Images are uploaded only after validation passes, so a rejected intake
    // never leaves objects behind in the bucket.
    let mut profile_image: Option<ImageRef> = None;
    let mut client_signature: Option<ImageRef> = None;
    let mut representative_signature: Option<ImageRef> = None;
    for (kind, bytes, content_type) in uploads {
        let image = state.images.upload(bytes, &content_type, kind).await?;
        match kind {
            ImageKind::Profile => profile_image = Some(image),
            ImageKind::ClientSignature => client_signature = Some(image),
            ImageKind::RepresentativeSignature => representative_signature = Some(image),
        }
    }

    let id = new_submission_id();
    let agent = (!agent.agent_id.is_empty()).then_some(&agent);
    let row = store::insert(
        &state.db,
        store::NewSubmission {
            id: &id,
            fields: &fields,
            profile_image: profile_image.as_ref(),
            client_signature: client_signature.as_ref(),
            representative_signature: representative_signature.as_ref(),
            agent,
        },
    )
    .await?;

    info!("Created submission {} for borrower {}", row.id, row.name);

    Ok(Json(json!({
        "success": true,
        "data": { "submissionId": row.id, "id": row.id }
    })))
}

/// GET /api/submissions?page&limit&status&search
pub async fn handle_list_submissions(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = store::list(&state.db, params.status).await?;

    let search = params.search.unwrap_or_default();
    let filtered: Vec<_> = rows
        .into_iter()
        .filter(|row| matches_search(row, &search))
        .collect();

    let (page_rows, pagination) = paginate(
        &filtered,
        params.page.unwrap_or(1),
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    );

    Ok(Json(json!({
        "success": true,
        "data": { "submissions": page_rows, "pagination": pagination }
    })))
}

/// GET /api/submissions/:id
pub async fn handle_get_submission(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let row = store::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    Ok(Json(json!({ "success": true, "data": { "submission": row } })))
}

/// PUT /api/submissions/:id/status
///
/// Transitions are deliberately unconstrained: any status may follow any
/// other. Review metadata records who moved it and when.
pub async fn handle_update_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_review)?;

    let row = store::update_status(
        &state.db,
        &id,
        req.status,
        &caller.0.agent_id,
        req.notes.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    info!(
        "Submission {} moved to {:?} by {}",
        row.id, row.status, caller.0.agent_id
    );

    Ok(Json(json!({ "success": true, "data": { "submission": row } })))
}

/// DELETE /api/submissions/:id
///
/// Hard delete, cascading deletion of every stored image object.
pub async fn handle_delete_submission(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_approve)?;

    let row = store::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    store::delete(&state.db, &id).await?;

    for image in row.all_images() {
        delete_quietly(state.images.as_ref(), &image.storage_key).await;
    }

    info!("Deleted submission {} and its stored images", id);

    Ok(Json(json!({ "success": true, "message": "Submission deleted" })))
}

/// POST /api/submissions/:id/image
///
/// Multipart: an `imageType` text part naming the slot, plus one file part.
pub async fn handle_replace_image(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_review)?;

    let mut kind: Option<ImageKind> = None;
    let mut upload: Option<(Bytes, String)> = None;

    while let Some(part) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = part.name().map(str::to_string) else {
            continue;
        };
        if name == "imageType" {
            let value = part.text().await.map_err(bad_multipart)?;
            kind = Some(ImageKind::from_request_str(&value).ok_or_else(|| {
                AppError::Validation(format!(
                    "imageType must be one of profile, clientSignature, representativeSignature (got '{value}')"
                ))
            })?);
        } else {
            let content_type = part.content_type().map(str::to_string).unwrap_or_default();
            if extension_for_mime(&content_type).is_none() {
                return Err(AppError::Validation(format!(
                    "Unsupported image type: {content_type}"
                )));
            }
            let bytes = part.bytes().await.map_err(bad_multipart)?;
            upload = Some((bytes, content_type));
        }
    }

    let kind = kind.ok_or_else(|| AppError::Validation("imageType is required".to_string()))?;
    let (bytes, content_type) =
        upload.ok_or_else(|| AppError::Validation("An image file is required".to_string()))?;

    let row = store::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    let prior = row.image(kind);
    let image = replace_image(
        state.images.as_ref(),
        prior.as_ref(),
        bytes,
        &content_type,
        kind,
    )
    .await?;

    let row = store::set_image(&state.db, &id, kind, &image)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    info!("Replaced {:?} image on submission {}", kind, id);

    Ok(Json(json!({
        "success": true,
        "data": { "image": image, "submission": row }
    })))
}

/// POST /api/submissions/:id/generate-profile
pub async fn handle_generate_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_generate_profiles)?;

    let row = store::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    let input = BorrowerInput::from(&row);
    let profile = generate_profile(&state.llm, state.config.use_mock_responses, &input).await?;

    let row = store::set_generated_profile(&state.db, &id, &profile)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    info!("Generated profile for submission {id}");

    Ok(Json(json!({
        "success": true,
        "data": {
            "generatedProfile": profile,
            "profileGeneratedAt": row.profile_generated_at
        }
    })))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart request: {e}"))
}

/// File part names accepted by the intake form.
fn image_kind_for_part(part_name: &str) -> Option<ImageKind> {
    match part_name {
        "profilePhoto" => Some(ImageKind::Profile),
        "clientSignature" => Some(ImageKind::ClientSignature),
        "representativeSignature" => Some(ImageKind::RepresentativeSignature),
        _ => None,
    }
}

/// Routes a multipart text part into the right submission or agent field.
/// Unknown part names are ignored so older intake clients keep working.
fn assign_text_field(
    fields: &mut SubmissionFields,
    agent: &mut AgentSnapshot,
    name: &str,
    value: String,
) {
    let opt = |v: String| if v.trim().is_empty() { None } else { Some(v) };
    match name {
        "name" => fields.name = value,
        "branch" => fields.branch = value,
        "clientId" => fields.client_id = value,
        "loanAmount" => fields.loan_amount = value,
        "groupName" => fields.group_name = opt(value),
        "background" => fields.background = opt(value),
        "business" => fields.business = value,
        "loanPurpose" => fields.loan_purpose = value,
        "challenges" => fields.challenges = opt(value),
        "community" => fields.community = opt(value),
        "previousLoans" => fields.previous_loans = opt(value),
        "futurePlans" => fields.future_plans = opt(value),
        "additionalComments" => fields.additional_comments = opt(value),
        "waiverClientName" => fields.waiver_client_name = opt(value),
        "waiverSignatureDate" => fields.waiver_signature_date = opt(value),
        "waiverAddress" => fields.waiver_address = opt(value),
        "waiverRepSignatureDate" => fields.waiver_rep_signature_date = opt(value),
        "agentId" => agent.agent_id = value,
        "agentName" => agent.name = value,
        "agentBranch" => agent.branch = value,
        "agentRole" => agent.role = value,
        _ => {}
    }
}
