//! Borrower profile generation.
//!
//! Flow: flatten borrower fields → build prompt → LLM call → parse JSON reply.
//! Degrades in two ways: a reply that is not valid JSON is wrapped verbatim
//! with empty metadata, and a transport/API failure (or mock mode) falls back
//! to a deterministic template narrative. The one hard business rule is the
//! fail-closed check on a blank borrower name.

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::submission::{GeneratedProfile, SubmissionRow};
use crate::profile::prompts::{PROFILE_PROMPT_TEMPLATE, PROFILE_SYSTEM};

/// The borrower fields the generator works from, flattened out of a submission.
#[derive(Debug, Clone, Default)]
pub struct BorrowerInput {
    pub name: String,
    pub branch: String,
    pub business: String,
    pub loan_purpose: String,
    pub loan_amount: String,
    pub group_name: String,
    pub background: String,
    pub community: String,
    pub challenges: String,
    pub previous_loans: String,
    pub future_plans: String,
}

impl From<&SubmissionRow> for BorrowerInput {
    fn from(row: &SubmissionRow) -> Self {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        BorrowerInput {
            name: row.name.clone(),
            branch: row.branch.clone(),
            business: row.business.clone(),
            loan_purpose: row.loan_purpose.clone(),
            loan_amount: row.loan_amount.clone(),
            group_name: opt(&row.group_name),
            background: opt(&row.background),
            community: opt(&row.community),
            challenges: opt(&row.challenges),
            previous_loans: opt(&row.previous_loans),
            future_plans: opt(&row.future_plans),
        }
    }
}

/// Shape of the expected LLM reply.
#[derive(Debug, Deserialize)]
struct ProfileReply {
    title: String,
    profile: String,
    #[serde(default)]
    metadata: ReplyMetadata,
}

#[derive(Debug, Deserialize, Default)]
struct ReplyMetadata {
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    sentiment: String,
}

/// Generates a narrative profile for the borrower.
pub async fn generate_profile(
    llm: &LlmClient,
    use_mock: bool,
    input: &BorrowerInput,
) -> Result<GeneratedProfile, AppError> {
    // The one explicit business rule on this path: no name, no profile.
    if input.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Cannot generate a profile without a borrower name".to_string(),
        ));
    }

    if use_mock {
        info!("Mock mode enabled, returning template profile");
        return Ok(fallback_profile(input));
    }

    let prompt = build_profile_prompt(input);

    match llm.call_text(&prompt, PROFILE_SYSTEM).await {
        Ok(text) => Ok(parse_reply(&text)),
        Err(e) => {
            warn!("LLM profile call failed, using template fallback: {e}");
            Ok(fallback_profile(input))
        }
    }
}

/// Fills the prompt template with the borrower record.
pub fn build_profile_prompt(input: &BorrowerInput) -> String {
    let or_na = |s: &str| {
        if s.trim().is_empty() {
            "not provided".to_string()
        } else {
            s.to_string()
        }
    };
    PROFILE_PROMPT_TEMPLATE
        .replace("{name}", &input.name)
        .replace("{branch}", &or_na(&input.branch))
        .replace("{business}", &or_na(&input.business))
        .replace("{loan_purpose}", &or_na(&input.loan_purpose))
        .replace("{loan_amount}", &or_na(&input.loan_amount))
        .replace("{group_name}", &or_na(&input.group_name))
        .replace("{background}", &or_na(&input.background))
        .replace("{community}", &or_na(&input.community))
        .replace("{challenges}", &or_na(&input.challenges))
        .replace("{previous_loans}", &or_na(&input.previous_loans))
        .replace("{future_plans}", &or_na(&input.future_plans))
}

/// Parses the LLM reply. A reply that is not the expected JSON shape is kept
/// verbatim as the narrative with empty metadata rather than discarded.
fn parse_reply(text: &str) -> GeneratedProfile {
    match serde_json::from_str::<ProfileReply>(text) {
        Ok(reply) => GeneratedProfile {
            title: reply.title,
            profile: reply.profile,
            key_points: reply.metadata.key_points,
            sentiment: reply.metadata.sentiment,
        },
        Err(e) => {
            warn!("LLM reply was not valid JSON ({e}), wrapping raw text");
            GeneratedProfile {
                title: String::new(),
                profile: text.to_string(),
                key_points: Vec::new(),
                sentiment: String::new(),
            }
        }
    }
}

/// Heuristic used to pick between the two fallback narratives.
fn is_agriculture(business: &str) -> bool {
    let lower = business.to_lowercase();
    ["farm", "agricultur", "livestock", "crop", "poultry", "dairy"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Deterministic template narrative used in mock mode and on adapter failure.
fn fallback_profile(input: &BorrowerInput) -> GeneratedProfile {
    let name = input.name.trim();
    let first_name = name.split_whitespace().next().unwrap_or(name);
    let business = if input.business.trim().is_empty() {
        "a small business".to_string()
    } else {
        input.business.trim().to_string()
    };
    let purpose = if input.loan_purpose.trim().is_empty() {
        "grow the business".to_string()
    } else {
        input.loan_purpose.trim().to_string()
    };
    let branch = if input.branch.trim().is_empty() {
        "their community".to_string()
    } else {
        format!("the {} area", input.branch.trim())
    };

    if is_agriculture(&input.business) {
        GeneratedProfile {
            title: format!("{first_name}'s harvest of hope"),
            profile: format!(
                "{name} works the land in {branch}, running {business}. Farming \
                is demanding work, and every season brings its own risks, but \
                {first_name} has kept the operation going through careful planning \
                and long days. This loan will help {first_name} {purpose}, \
                strengthening the farm for the seasons ahead. With better yields, \
                {first_name} hopes to support the family and supply more fresh \
                produce to neighbors in {branch}."
            ),
            key_points: vec![
                "Experienced smallholder farmer".to_string(),
                "Loan funds directly improve production".to_string(),
                "Feeds and supplies the local community".to_string(),
            ],
            sentiment: "resilient".to_string(),
        }
    } else {
        GeneratedProfile {
            title: format!("{first_name}'s growing enterprise"),
            profile: format!(
                "{name} runs {business} in {branch}, serving customers with \
                dedication day after day. Building a business takes persistence, \
                and {first_name} has shown plenty of it. This loan will help \
                {first_name} {purpose}, taking the next step toward a more stable \
                livelihood. As the business grows, {first_name} looks forward to \
                creating opportunity for the family and for others in {branch}."
            ),
            key_points: vec![
                "Established local business owner".to_string(),
                "Clear plan for the loan".to_string(),
                "Committed to the local community".to_string(),
            ],
            sentiment: "determined".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmClient;

    fn retail_input() -> BorrowerInput {
        BorrowerInput {
            name: "Sarah Wambui".to_string(),
            branch: "Nakuru".to_string(),
            business: "Grocery kiosk".to_string(),
            loan_purpose: "restock inventory and add a cold display".to_string(),
            loan_amount: "15000".to_string(),
            ..Default::default()
        }
    }

    fn test_llm() -> LlmClient {
        LlmClient::new("test-key".to_string(), "test-model".to_string())
    }

    #[tokio::test]
    async fn test_blank_name_fails_closed() {
        let mut input = retail_input();
        input.name = "   ".to_string();

        let result = generate_profile(&test_llm(), true, &input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_mock_mode_profile_contains_borrower_name() {
        let result = generate_profile(&test_llm(), true, &retail_input())
            .await
            .unwrap();
        assert!(result.profile.contains("Sarah Wambui"));
        assert!(!result.key_points.is_empty());
        assert!(!result.sentiment.is_empty());
    }

    #[test]
    fn test_agriculture_detection() {
        assert!(is_agriculture("Maize farm"));
        assert!(is_agriculture("Dairy cooperative"));
        assert!(is_agriculture("POULTRY keeping"));
        assert!(!is_agriculture("Grocery kiosk"));
        assert!(!is_agriculture("Tailoring shop"));
    }

    #[test]
    fn test_fallback_picks_agriculture_template() {
        let mut input = retail_input();
        input.business = "Mixed crop farm".to_string();
        let profile = fallback_profile(&input);
        assert!(profile.title.contains("harvest"));
        assert!(profile.profile.contains("Sarah Wambui"));
        assert_eq!(profile.sentiment, "resilient");
    }

    #[test]
    fn test_parse_reply_accepts_expected_schema() {
        let text = r#"{
            "title": "Meet Sarah",
            "profile": "Sarah runs a kiosk.",
            "metadata": { "key_points": ["hard working"], "sentiment": "hopeful" }
        }"#;
        let profile = parse_reply(text);
        assert_eq!(profile.title, "Meet Sarah");
        assert_eq!(profile.key_points, vec!["hard working".to_string()]);
        assert_eq!(profile.sentiment, "hopeful");
    }

    #[test]
    fn test_parse_reply_wraps_non_json_verbatim() {
        let text = "Sarah is a dedicated shopkeeper in Nakuru.";
        let profile = parse_reply(text);
        assert_eq!(profile.profile, text);
        assert!(profile.title.is_empty());
        assert!(profile.key_points.is_empty());
    }

    #[test]
    fn test_prompt_includes_borrower_fields_and_redaction_rules() {
        let prompt = build_profile_prompt(&retail_input());
        assert!(prompt.contains("Sarah Wambui"));
        assert!(prompt.contains("Grocery kiosk"));
        assert!(prompt.contains("PRIVACY"));
        // Blank optional fields are labelled rather than left dangling
        assert!(prompt.contains("Group: not provided"));
    }
}
