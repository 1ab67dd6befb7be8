use store::models::Favorite;

/// Cursor for the following page: the last fetched item's timestamp, and
/// only when the page came back full, so a post-fetch text filter cannot
/// stall pagination.
pub fn next_cursor(last_ts: Option<i64>, fetched: usize, page_size: usize) -> Option<i64> {
    if fetched == page_size { last_ts } else { None }
}

/// Case-insensitive substring filter over fact and explanation, applied
/// after the page fetch.
pub fn filter_by_query(items: Vec<Favorite>, query: &str) -> Vec<Favorite> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| {
            item.fact.to_lowercase().contains(&query)
                || item.explanation.to_lowercase().contains(&query)
        })
        .collect()
}
