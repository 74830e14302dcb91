//! Search aggregation.
//!
//! The search endpoint returns at most [`PAGE_SIZE`] rows per request. Larger
//! result sets are assembled either from parallel offset windows or from a
//! strictly sequential walk over a `search_after` cursor.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use tracing::{debug, error, info, warn};

use super::HypothesisClient;
use crate::error::Result;
use crate::models::{
    compare_sort_values, Annotation, SearchPage, SearchQuery, SortField, SortOrder, PAGE_SIZE,
};
use crate::progress::Progress;
use crate::retry::execute_with_retry;

/// Searches above this many rows are slow enough to warn about.
const LARGE_SEARCH_WARNING: usize = 5000;

/// Pause between cursor pages.
const PAGE_DELAY: Duration = Duration::from_secs(1);

/// Sort annotations in place by `sort`, in `order`.
///
/// The sort is stable, so applying it twice yields the same sequence.
pub fn order_annotations(annotations: &mut [Annotation], order: SortOrder, sort: SortField) {
    annotations.sort_by(|a, b| {
        let ord = compare_sort_values(a.sort_value(sort), b.sort_value(sort));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

impl HypothesisClient {
    /// Fetch a single page of search results.
    ///
    /// The page limit is clamped to [`PAGE_SIZE`] and the offset defaults to 0.
    /// Retried according to the search policy.
    pub async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage> {
        let page = query.page(
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(PAGE_SIZE),
        );
        let request = self.request(Method::GET, "/search").query(page.to_params());

        let response = execute_with_retry(
            self.transport(),
            &request,
            self.config.search.retry_policy(),
            &[StatusCode::OK],
        )
        .await?;
        let result: SearchPage = response.json()?;

        debug!(
            "Search page offset={} returned {} of {} rows",
            page.offset.unwrap_or(0),
            result.rows.len(),
            result.total
        );
        Ok(result)
    }

    /// Search annotations, fetching as many pages as needed.
    ///
    /// Pages after the first are requested concurrently. Rows are returned in
    /// page order; no ordering across pages is guaranteed. Any failed page fails
    /// the whole search.
    pub async fn search_annotations(&self, query: &SearchQuery) -> Result<Vec<Annotation>> {
        let result = self.search_offset_pages(query).await;
        if let Err(ref e) = result {
            error!("Search failed: {}", e);
        }
        result
    }

    async fn search_offset_pages(&self, query: &SearchQuery) -> Result<Vec<Annotation>> {
        let max_annotations = self.config.search.max_annotations;
        let first = self
            .search_page(&query.page(0, query.limit.unwrap_or(PAGE_SIZE)))
            .await?;

        let total = query
            .limit
            .unwrap_or(first.total)
            .min(first.total)
            .min(max_annotations);

        let mut rows = first.rows;
        if rows.is_empty() || rows.len() >= total {
            rows.truncate(total);
            return Ok(rows);
        }

        if total > LARGE_SEARCH_WARNING {
            warn!(
                "Retrieving {} annotations, this may take a while (server total {})",
                total, first.total
            );
        }

        let pages: Vec<_> = (rows.len()..total)
            .step_by(PAGE_SIZE)
            .map(|offset| query.page(offset, PAGE_SIZE.min(total - offset)))
            .collect();
        debug!("Fetching {} more page(s) in parallel", pages.len());

        let futures = pages.iter().map(|page| self.search_page(page));
        let results = futures::future::try_join_all(futures).await?;

        for page in results {
            rows.extend(page.rows);
        }
        rows.truncate(total);

        debug!("Search returned {} annotations", rows.len());
        Ok(rows)
    }

    /// Search annotations one page at a time using a `search_after` cursor.
    ///
    /// The result is sorted by the query's sort field (default `updated`) and
    /// order (default `desc`).
    pub async fn search_annotations_sequential(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<Annotation>> {
        self.search_annotations_sequential_with_progress(query, &Progress::new())
            .await
    }

    /// Like [`search_annotations_sequential`](Self::search_annotations_sequential),
    /// reporting one progress step per page.
    pub async fn search_annotations_sequential_with_progress(
        &self,
        query: &SearchQuery,
        progress: &Progress,
    ) -> Result<Vec<Annotation>> {
        let result = self.search_cursor_pages(query, progress).await;
        if let Err(ref e) = result {
            error!("Sequential search failed: {}", e);
        }
        result
    }

    async fn search_cursor_pages(
        &self,
        query: &SearchQuery,
        progress: &Progress,
    ) -> Result<Vec<Annotation>> {
        let sort = query.sort.unwrap_or_default();
        let order = query.order.unwrap_or_default();
        let base = query.clone().sorted_by(sort, order);

        progress.grow(1);
        let first = self
            .search_page(&base.page(0, base.limit.unwrap_or(PAGE_SIZE)))
            .await?;

        let effective = base
            .limit
            .unwrap_or(first.total)
            .min(first.total)
            .min(self.config.search.max_annotations);

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        merge_unique(&mut merged, &mut seen, first.rows);
        order_annotations(&mut merged, order, sort);

        // Page 0 already covered the first window
        let calls = effective.div_ceil(PAGE_SIZE).saturating_sub(1);
        if merged.len() < effective {
            progress.grow(calls);
        }
        progress.advance();

        if merged.len() < effective && effective > LARGE_SEARCH_WARNING {
            warn!(
                "Retrieving {} annotations sequentially, this may take a while",
                effective
            );
        }

        for _ in 0..calls {
            if merged.len() >= effective {
                break;
            }
            tokio::time::sleep(PAGE_DELAY).await;

            // Merged rows are kept in traversal order, so the last one is the boundary
            let cursor = match merged.last().and_then(|a| a.sort_value(sort)) {
                Some(cursor) => cursor.to_string(),
                None => {
                    debug!("Last record has no {} value, stopping", sort.as_str());
                    break;
                }
            };
            let remaining = effective - merged.len();
            let page = base
                .page(0, remaining.min(PAGE_SIZE))
                .with_search_after(cursor);

            let result = self.search_page(&page).await?;
            if result.rows.is_empty() {
                debug!("Empty page after {} rows, stopping", merged.len());
                break;
            }

            let added = merge_unique(&mut merged, &mut seen, result.rows);
            order_annotations(&mut merged, order, sort);
            progress.advance();

            if added == 0 {
                warn!(
                    "Cursor page returned no new rows after {} rows, stopping",
                    merged.len()
                );
                break;
            }
        }

        merged.truncate(effective);
        progress.finish();

        info!(
            "Sequential search returned {} annotations (sort={}, order={})",
            merged.len(),
            sort.as_str(),
            order.as_str()
        );
        Ok(merged)
    }
}

/// Append rows whose id has not been seen yet. Rows without an id are kept.
///
/// Returns how many rows were appended.
fn merge_unique(
    merged: &mut Vec<Annotation>,
    seen: &mut HashSet<String>,
    rows: Vec<Annotation>,
) -> usize {
    let before = merged.len();
    for row in rows {
        match row.id {
            Some(ref id) if !seen.insert(id.clone()) => continue,
            _ => merged.push(row),
        }
    }
    merged.len() - before
}
