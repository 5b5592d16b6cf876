use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::CursorPage;

/// One page of query results as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub results: Vec<Value>,
    /// Total number of matches, not the size of this page
    pub count: u64,
    pub has_more: bool,
    /// Always null once the result set is exhausted
    pub cursor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

impl From<CursorPage> for ResultPage {
    fn from(page: CursorPage) -> Self {
        let count = page.count.unwrap_or(page.result.len() as u64);
        // The database may keep the handle alive briefly; it must not leak past the last page
        let cursor_id = if page.has_more { page.id } else { None };

        Self {
            results: page.result,
            count,
            has_more: page.has_more,
            cursor_id,
            stats: page.stats,
        }
    }
}
