use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Workflow status of a submission. Transitions are unconstrained (any state is
/// reachable from any state via the status endpoint).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Reviewed,
    Approved,
    Rejected,
}

/// The three image slots a submission carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Profile,
    ClientSignature,
    RepresentativeSignature,
}

impl ImageKind {
    /// Parses the `imageType` value sent by clients.
    pub fn from_request_str(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(ImageKind::Profile),
            "clientSignature" => Some(ImageKind::ClientSignature),
            "representativeSignature" => Some(ImageKind::RepresentativeSignature),
            _ => None,
        }
    }

    /// Folder namespace used for stored objects of this kind.
    pub fn folder(&self) -> &'static str {
        match self {
            ImageKind::Profile => "borrowers/profile",
            ImageKind::ClientSignature => "borrowers/signatures/client",
            ImageKind::RepresentativeSignature => "borrowers/signatures/representative",
        }
    }

    /// Database column holding this image reference.
    pub fn column(&self) -> &'static str {
        match self {
            ImageKind::Profile => "profile_image",
            ImageKind::ClientSignature => "client_signature",
            ImageKind::RepresentativeSignature => "representative_signature",
        }
    }
}

/// A stored image reference: public URL plus the provider key needed for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub url: String,
    pub storage_key: String,
}

/// The narrative profile produced by the generation adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedProfile {
    pub title: String,
    pub profile: String,
    pub key_points: Vec<String>,
    pub sentiment: String,
}

/// Snapshot of the agent who submitted the record, denormalized so later user
/// edits do not rewrite submission history.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub name: String,
    pub branch: String,
    pub role: String,
}

/// Borrower and waiver fields collected by the intake form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubmissionFields {
    pub name: String,
    pub branch: String,
    pub client_id: String,
    pub loan_amount: String,
    pub group_name: Option<String>,
    pub background: Option<String>,
    pub business: String,
    pub loan_purpose: String,
    pub challenges: Option<String>,
    pub community: Option<String>,
    pub previous_loans: Option<String>,
    pub future_plans: Option<String>,
    pub additional_comments: Option<String>,
    pub waiver_client_name: Option<String>,
    pub waiver_signature_date: Option<String>,
    pub waiver_address: Option<String>,
    pub waiver_rep_signature_date: Option<String>,
}

impl SubmissionFields {
    /// Returns the names of required fields that are missing or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("name", &self.name),
            ("branch", &self.branch),
            ("clientId", &self.client_id),
            ("loanAmount", &self.loan_amount),
            ("business", &self.business),
            ("loanPurpose", &self.loan_purpose),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        missing
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubmissionRow {
    pub id: String,
    pub name: String,
    pub branch: String,
    pub client_id: String,
    pub loan_amount: String,
    pub group_name: Option<String>,
    pub background: Option<String>,
    pub business: String,
    pub loan_purpose: String,
    pub challenges: Option<String>,
    pub community: Option<String>,
    pub previous_loans: Option<String>,
    pub future_plans: Option<String>,
    pub additional_comments: Option<String>,
    pub waiver_client_name: Option<String>,
    pub waiver_signature_date: Option<String>,
    pub waiver_address: Option<String>,
    pub waiver_rep_signature_date: Option<String>,
    pub profile_image: Option<Value>,
    pub client_signature: Option<Value>,
    pub representative_signature: Option<Value>,
    pub generated_profile: Option<Value>,
    pub profile_generated_at: Option<DateTime<Utc>>,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
    pub agent_branch: Option<String>,
    pub agent_role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRow {
    /// Decodes the stored JSONB reference for the given image slot.
    pub fn image(&self, kind: ImageKind) -> Option<ImageRef> {
        let value = match kind {
            ImageKind::Profile => self.profile_image.as_ref(),
            ImageKind::ClientSignature => self.client_signature.as_ref(),
            ImageKind::RepresentativeSignature => self.representative_signature.as_ref(),
        }?;
        serde_json::from_value(value.clone()).ok()
    }

    /// All image references currently stored on this submission.
    pub fn all_images(&self) -> Vec<ImageRef> {
        [
            ImageKind::Profile,
            ImageKind::ClientSignature,
            ImageKind::RepresentativeSignature,
        ]
        .into_iter()
        .filter_map(|kind| self.image(kind))
        .collect()
    }
}

/// Generates a submission id: `SUB-<epoch millis>-<4 uppercase alphanumerics>`.
/// The timestamp keeps ids roughly sortable; the suffix guards against two
/// intakes landing on the same millisecond.
pub fn new_submission_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("SUB-{millis}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_id_format() {
        let id = new_submission_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SUB");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_submission_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..50).map(|_| new_submission_id()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_missing_required_reports_blank_name() {
        let fields = SubmissionFields {
            name: "  ".to_string(),
            branch: "Nakuru".to_string(),
            client_id: "C-1001".to_string(),
            loan_amount: "15000".to_string(),
            business: "Grocery kiosk".to_string(),
            loan_purpose: "Restock inventory".to_string(),
            ..Default::default()
        };
        assert_eq!(fields.missing_required(), vec!["name"]);
    }

    #[test]
    fn test_missing_required_empty_when_complete() {
        let fields = SubmissionFields {
            name: "Sarah Wambui".to_string(),
            branch: "Nakuru".to_string(),
            client_id: "C-1001".to_string(),
            loan_amount: "15000".to_string(),
            business: "Grocery kiosk".to_string(),
            loan_purpose: "Restock inventory".to_string(),
            ..Default::default()
        };
        assert!(fields.missing_required().is_empty());
    }

    #[test]
    fn test_image_kind_parses_request_values() {
        assert_eq!(
            ImageKind::from_request_str("profile"),
            Some(ImageKind::Profile)
        );
        assert_eq!(
            ImageKind::from_request_str("clientSignature"),
            Some(ImageKind::ClientSignature)
        );
        assert_eq!(
            ImageKind::from_request_str("representativeSignature"),
            Some(ImageKind::RepresentativeSignature)
        );
        assert_eq!(ImageKind::from_request_str("banner"), None);
    }

    #[test]
    fn test_all_images_skips_empty_slots() {
        let row = sample_row();
        let images = row.all_images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].storage_key, "borrowers/profile/abc.jpg");
    }

    fn sample_row() -> SubmissionRow {
        SubmissionRow {
            id: "SUB-1700000000000-A1B2".to_string(),
            name: "Sarah Wambui".to_string(),
            branch: "Nakuru".to_string(),
            client_id: "C-1001".to_string(),
            loan_amount: "15000".to_string(),
            group_name: None,
            background: None,
            business: "Grocery kiosk".to_string(),
            loan_purpose: "Restock inventory".to_string(),
            challenges: None,
            community: None,
            previous_loans: None,
            future_plans: None,
            additional_comments: None,
            waiver_client_name: None,
            waiver_signature_date: None,
            waiver_address: None,
            waiver_rep_signature_date: None,
            profile_image: Some(serde_json::json!({
                "url": "https://cdn.example.com/borrowers/profile/abc.jpg",
                "storage_key": "borrowers/profile/abc.jpg"
            })),
            client_signature: None,
            representative_signature: None,
            generated_profile: None,
            profile_generated_at: None,
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            agent_id: Some("FA012".to_string()),
            agent_name: Some("Joseph Mwangi".to_string()),
            agent_branch: Some("Nakuru".to_string()),
            agent_role: Some("field_agent".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
