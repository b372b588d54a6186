//! In-memory search and pagination over the fetched submission set.
//!
//! Admin volumes are small (hundreds of records per branch), so the status
//! filter runs in SQL and the text search and pagination run here, where the
//! matching rules stay unit-testable.

use serde::Serialize;

use crate::models::submission::SubmissionRow;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub pages: usize,
    pub limit: usize,
}

/// Case-insensitive substring match across the searchable submission fields.
pub fn matches_search(row: &SubmissionRow, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [
        row.name.as_str(),
        row.branch.as_str(),
        row.client_id.as_str(),
        row.id.as_str(),
        row.business.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&query))
}

/// Slices one page out of the filtered set. `page` is 1-based; out-of-range
/// pages return an empty list with the pagination math intact.
pub fn paginate<T: Clone>(items: &[T], page: usize, limit: usize) -> (Vec<T>, Pagination) {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let page = page.max(1);
    let total = items.len();
    let pages = total.div_ceil(limit);

    let start = (page - 1) * limit;
    let slice = if start >= total {
        Vec::new()
    } else {
        items[start..(start + limit).min(total)].to_vec()
    };

    (
        slice,
        Pagination {
            total,
            page,
            pages,
            limit,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::SubmissionStatus;
    use chrono::Utc;

    fn row(id: &str, name: &str, branch: &str, client_id: &str) -> SubmissionRow {
        SubmissionRow {
            id: id.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
            client_id: client_id.to_string(),
            loan_amount: "10000".to_string(),
            group_name: None,
            background: None,
            business: "Grocery kiosk".to_string(),
            loan_purpose: "Restock".to_string(),
            challenges: None,
            community: None,
            previous_loans: None,
            future_plans: None,
            additional_comments: None,
            waiver_client_name: None,
            waiver_signature_date: None,
            waiver_address: None,
            waiver_rep_signature_date: None,
            profile_image: None,
            client_signature: None,
            representative_signature: None,
            generated_profile: None,
            profile_generated_at: None,
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            agent_id: None,
            agent_name: None,
            agent_branch: None,
            agent_role: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pagination_of_23_items_with_limit_10() {
        let items: Vec<u32> = (0..23).collect();

        let (page1, meta) = paginate(&items, 1, 10);
        assert_eq!(page1.len(), 10);
        assert_eq!(meta.pages, 3);
        assert_eq!(meta.total, 23);

        let (page2, _) = paginate(&items, 2, 10);
        assert_eq!(page2.len(), 10);
        assert_eq!(page2[0], 10);

        let (page3, _) = paginate(&items, 3, 10);
        assert_eq!(page3.len(), 3);

        let (page4, meta) = paginate(&items, 4, 10);
        assert!(page4.is_empty());
        assert_eq!(meta.pages, 3);
    }

    #[test]
    fn test_pagination_clamps_bad_inputs() {
        let items: Vec<u32> = (0..5).collect();

        let (page, meta) = paginate(&items, 0, 0);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.limit, 1);
        assert_eq!(page.len(), 1);

        let (_, meta) = paginate(&items, 1, 10_000);
        assert_eq!(meta.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_of_empty_set() {
        let items: Vec<u32> = Vec::new();
        let (page, meta) = paginate(&items, 1, 10);
        assert!(page.is_empty());
        assert_eq!(meta.pages, 0);
        assert_eq!(meta.total, 0);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let row = row("SUB-1700000000000-A1B2", "Sarah Wambui", "Nakuru", "C-1001");
        assert!(matches_search(&row, "wambui"));
        assert!(matches_search(&row, "SARAH"));
        assert!(matches_search(&row, "nakuru"));
        assert!(matches_search(&row, "c-1001"));
        assert!(matches_search(&row, "sub-1700000000000"));
        assert!(matches_search(&row, "grocery"));
        assert!(!matches_search(&row, "otieno"));
    }

    #[test]
    fn test_blank_search_matches_everything() {
        let row = row("SUB-1-AAAA", "Sarah Wambui", "Nakuru", "C-1001");
        assert!(matches_search(&row, ""));
        assert!(matches_search(&row, "   "));
    }
}
