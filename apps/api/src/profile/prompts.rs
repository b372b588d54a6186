// All LLM prompt constants for borrower profile generation.

/// System prompt — enforces JSON-only output.
pub const PROFILE_SYSTEM: &str =
    "You are a skilled microfinance storyteller writing borrower profiles for a \
    lending marketplace. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Profile prompt template. Replace each `{field}` placeholder before sending.
pub const PROFILE_PROMPT_TEMPLATE: &str = r#"Write a marketing-style narrative profile for the borrower below.

Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "A short headline of at most 10 words",
  "profile": "The narrative text",
  "metadata": {
    "key_points": ["3 to 5 short phrases capturing the borrower's strengths"],
    "sentiment": "one of: hopeful, determined, ambitious, resilient"
  }
}

Rules for the narrative:

STRUCTURE (plain text, no markdown, no bullet lists):
- Opening: 2 sentences introducing the borrower and their business.
- Body: 3 to 4 sentences covering how the loan will be used and the
  challenges the business faces.
- Closing: 2 sentences on future plans and community impact.

PRIVACY — NEVER include:
- Client identifiers or account numbers
- Exact street addresses
- Phone numbers or email addresses
Refer to location only by branch or town name.

TONE: warm and factual. Do not invent numbers or achievements that are not in
the provided fields. Write in the third person using the borrower's first name.

BORROWER RECORD:
Name: {name}
Branch: {branch}
Business: {business}
Loan purpose: {loan_purpose}
Loan amount: {loan_amount}
Group: {group_name}
Background: {background}
Community: {community}
Challenges: {challenges}
Previous loans: {previous_loans}
Future plans: {future_plans}"#;
