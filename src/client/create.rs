//! Bulk annotation creation with read-back verification.
//!
//! The store may acknowledge a create without persisting it. After every
//! round of creates the new records are searched back by id, and whatever
//! could not be found is submitted again, up to `create.max_retries` rounds.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use tracing::{debug, info, warn};

use super::HypothesisClient;
use crate::error::{ClientError, Result};
use crate::models::{Annotation, SearchQuery, SortOrder};
use crate::progress::Progress;
use crate::retry::execute_with_retry;

/// Wait before searching back freshly created annotations.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// How a batch of creates is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    /// All creates in flight at once.
    Parallel,
    /// One create at a time, in submission order.
    Sequential,
}

impl CreationMode {
    /// Batches larger than `max_parallel` are created sequentially.
    pub fn for_batch(count: usize, max_parallel: usize) -> Self {
        if count > max_parallel {
            CreationMode::Sequential
        } else {
            CreationMode::Parallel
        }
    }
}

impl HypothesisClient {
    /// Create one annotation and return the stored record.
    pub async fn create_annotation(&self, annotation: &Annotation) -> Result<Annotation> {
        self.require_token("create annotations")?;

        let request = self
            .request(Method::POST, "/annotations")
            .json(annotation)?;
        let response = execute_with_retry(
            self.transport(),
            &request,
            self.config.create.retry_policy(),
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;

        let created: Annotation = response.json()?;
        debug!("Created annotation {:?}", created.id);
        Ok(created)
    }

    /// Create many annotations and confirm they were persisted.
    ///
    /// Returns the confirmed records. Fails as a whole if any create fails,
    /// if the verification search fails, or if some records still cannot be
    /// found after the configured number of re-submissions.
    pub async fn create_annotations(
        &self,
        annotations: Vec<Annotation>,
    ) -> Result<Vec<Annotation>> {
        self.create_annotations_with_progress(annotations, &Progress::new())
            .await
    }

    /// Like [`create_annotations`](Self::create_annotations), reporting one
    /// progress step per create call (re-submissions included).
    pub async fn create_annotations_with_progress(
        &self,
        annotations: Vec<Annotation>,
        progress: &Progress,
    ) -> Result<Vec<Annotation>> {
        if annotations.is_empty() {
            return Err(ClientError::InvalidArgument(
                "annotation list is empty".to_string(),
            ));
        }
        self.require_token("create annotations")?;

        let group = annotations[0].group.clone();
        let max_rounds = self.config.create.max_retries;
        let submitted = annotations.len();

        progress.grow(submitted);
        let mut pending = annotations;
        let mut confirmed = Vec::with_capacity(submitted);
        let mut round: u32 = 0;

        loop {
            let created = self.submit_batch(&pending, progress).await?;

            tokio::time::sleep(SETTLE_DELAY).await;
            let found = self
                .find_created(&created, group.as_deref())
                .await
                .map_err(|e| ClientError::VerificationFailed(Box::new(e)))?;

            let mut unconfirmed = Vec::new();
            for (payload, record) in pending.into_iter().zip(created) {
                match record.id {
                    Some(ref id) if found.contains(id) => confirmed.push(record),
                    _ => unconfirmed.push(payload),
                }
            }

            if unconfirmed.is_empty() {
                break;
            }
            if round >= max_rounds {
                return Err(ClientError::InconsistentWrite {
                    unconfirmed: unconfirmed.len(),
                    attempts: round,
                });
            }

            round += 1;
            warn!(
                "{} annotation(s) missing after create, re-submitting ({}/{})",
                unconfirmed.len(),
                round,
                max_rounds
            );
            progress.grow(unconfirmed.len());
            pending = unconfirmed;
        }

        info!(
            "Created {} annotation(s) with {} re-submission round(s)",
            confirmed.len(),
            round
        );
        Ok(confirmed)
    }

    /// Create every payload, returning responses in submission order.
    async fn submit_batch(
        &self,
        pending: &[Annotation],
        progress: &Progress,
    ) -> Result<Vec<Annotation>> {
        let mode = CreationMode::for_batch(pending.len(), self.config.create.max_parallel);
        debug!("Creating {} annotation(s) ({:?})", pending.len(), mode);

        match mode {
            CreationMode::Parallel => {
                let futures = pending.iter().map(|annotation| async move {
                    let result = self.create_annotation(annotation).await;
                    if result.is_ok() {
                        progress.advance();
                    }
                    result
                });
                let results = futures::future::join_all(futures).await;

                let mut created = Vec::with_capacity(results.len());
                let mut failed = 0;
                let mut first_error = None;
                for result in results {
                    match result {
                        Ok(record) => created.push(record),
                        Err(e) => {
                            failed += 1;
                            first_error.get_or_insert(e);
                        }
                    }
                }

                match first_error {
                    None => Ok(created),
                    Some(source) => Err(ClientError::SomeAnnotationsFailed {
                        failed,
                        submitted: pending.len(),
                        source: Box::new(source),
                    }),
                }
            }
            CreationMode::Sequential => {
                let mut created = Vec::with_capacity(pending.len());
                for annotation in pending {
                    match self.create_annotation(annotation).await {
                        Ok(record) => {
                            created.push(record);
                            progress.advance();
                        }
                        Err(e) => {
                            return Err(ClientError::SomeAnnotationsFailed {
                                failed: pending.len() - created.len(),
                                submitted: pending.len(),
                                source: Box::new(e),
                            })
                        }
                    }
                }
                Ok(created)
            }
        }
    }

    /// Ids of the most recent annotations by the creator of `created`.
    async fn find_created(
        &self,
        created: &[Annotation],
        group: Option<&str>,
    ) -> Result<HashSet<String>> {
        let mut query = SearchQuery::new()
            .with_order(SortOrder::Desc)
            .with_limit(created.len());
        if let Some(user) = created.first().and_then(|a| a.user.as_deref()) {
            query = query.user(user);
        }
        if let Some(group) = group {
            query = query.group(group);
        }

        let rows = self.search_annotations(&query).await?;
        Ok(rows.into_iter().filter_map(|a| a.id).collect())
    }
}
