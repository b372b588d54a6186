use sqlx::PgPool;

use crate::models::submission::{
    AgentSnapshot, GeneratedProfile, ImageKind, ImageRef, SubmissionFields, SubmissionRow,
    SubmissionStatus,
};

const SUBMISSION_COLUMNS: &str = "id, name, branch, client_id, loan_amount, group_name, background, business, \
     loan_purpose, challenges, community, previous_loans, future_plans, \
     additional_comments, waiver_client_name, waiver_signature_date, waiver_address, \
     waiver_rep_signature_date, profile_image, client_signature, \
     representative_signature, generated_profile, profile_generated_at, status, \
     reviewed_by, reviewed_at, review_notes, agent_id, agent_name, agent_branch, \
     agent_role, created_at, updated_at";

pub struct NewSubmission<'a> {
    pub id: &'a str,
    pub fields: &'a SubmissionFields,
    pub profile_image: Option<&'a ImageRef>,
    pub client_signature: Option<&'a ImageRef>,
    pub representative_signature: Option<&'a ImageRef>,
    pub agent: Option<&'a AgentSnapshot>,
}

pub async fn insert(
    pool: &PgPool,
    submission: NewSubmission<'_>,
) -> Result<SubmissionRow, sqlx::Error> {
    let NewSubmission {
        id,
        fields,
        profile_image,
        client_signature,
        representative_signature,
        agent,
    } = submission;

    let to_json = |image: Option<&ImageRef>| image.map(|i| serde_json::json!(i));

    sqlx::query_as(&format!(
        r#"
        INSERT INTO submissions
            (id, name, branch, client_id, loan_amount, group_name, background,
             business, loan_purpose, challenges, community, previous_loans,
             future_plans, additional_comments, waiver_client_name,
             waiver_signature_date, waiver_address, waiver_rep_signature_date,
             profile_image, client_signature, representative_signature, status,
             agent_id, agent_name, agent_branch, agent_role)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, 'pending', $22, $23, $24, $25)
        RETURNING {SUBMISSION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.branch)
    .bind(&fields.client_id)
    .bind(&fields.loan_amount)
    .bind(&fields.group_name)
    .bind(&fields.background)
    .bind(&fields.business)
    .bind(&fields.loan_purpose)
    .bind(&fields.challenges)
    .bind(&fields.community)
    .bind(&fields.previous_loans)
    .bind(&fields.future_plans)
    .bind(&fields.additional_comments)
    .bind(&fields.waiver_client_name)
    .bind(&fields.waiver_signature_date)
    .bind(&fields.waiver_address)
    .bind(&fields.waiver_rep_signature_date)
    .bind(to_json(profile_image))
    .bind(to_json(client_signature))
    .bind(to_json(representative_signature))
    .bind(agent.map(|a| a.agent_id.clone()))
    .bind(agent.map(|a| a.name.clone()))
    .bind(agent.map(|a| a.branch.clone()))
    .bind(agent.map(|a| a.role.clone()))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<SubmissionRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Fetches submissions newest first, optionally restricted to one status.
/// Text search and pagination happen in memory afterwards (see `query`).
pub async fn list(
    pool: &PgPool,
    status: Option<SubmissionStatus>,
) -> Result<Vec<SubmissionRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS} FROM submissions
        WHERE ($1::submission_status IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#
    ))
    .bind(status)
    .fetch_all(pool)
    .await
}

pub async fn update_status(
    pool: &PgPool,
    id: &str,
    status: SubmissionStatus,
    reviewer_agent_id: &str,
    notes: Option<&str>,
) -> Result<Option<SubmissionRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE submissions
        SET status = $2,
            reviewed_by = $3,
            reviewed_at = now(),
            review_notes = $4,
            updated_at = now()
        WHERE id = $1
        RETURNING {SUBMISSION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .bind(reviewer_agent_id)
    .bind(notes)
    .fetch_optional(pool)
    .await
}

/// Writes the new reference for one image slot. The column name comes from
/// `ImageKind::column`, a closed set, never from request input.
pub async fn set_image(
    pool: &PgPool,
    id: &str,
    kind: ImageKind,
    image: &ImageRef,
) -> Result<Option<SubmissionRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE submissions
        SET {} = $2, updated_at = now()
        WHERE id = $1
        RETURNING {SUBMISSION_COLUMNS}
        "#,
        kind.column()
    ))
    .bind(id)
    .bind(serde_json::json!(image))
    .fetch_optional(pool)
    .await
}

pub async fn set_generated_profile(
    pool: &PgPool,
    id: &str,
    profile: &GeneratedProfile,
) -> Result<Option<SubmissionRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE submissions
        SET generated_profile = $2,
            profile_generated_at = now(),
            updated_at = now()
        WHERE id = $1
        RETURNING {SUBMISSION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(serde_json::json!(profile))
    .fetch_optional(pool)
    .await
}

/// Hard delete. The caller is responsible for cascading image deletion.
pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM submissions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
