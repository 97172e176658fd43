use crate::model::Demo;

/// The select value the dashboard sends when no status filter is active.
pub const ALL_STATUSES: &str = "All Statuses";

/// Projects the store snapshot for display: status filter first, then a
/// case-insensitive substring match on title and sales rep. Input order is
/// preserved (head-first, newest first). Collections stay small, so this is
/// recomputed on every call.
pub fn project(demos: &[Demo], status_filter: &str, search_term: &str) -> Vec<Demo> {
    let status_filter = status_filter.trim();
    let needle = search_term.trim().to_lowercase();
    demos
        .iter()
        .filter(|d| {
            status_filter.is_empty()
                || status_filter == ALL_STATUSES
                || d.status.as_str() == status_filter
        })
        .filter(|d| {
            needle.is_empty()
                || d.title.to_lowercase().contains(&needle)
                || d.sales_rep.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
