//! Single-annotation endpoints and bulk delete.

use reqwest::{Method, StatusCode};
use tracing::{debug, info};

use super::{require_id, segment, HypothesisClient};
use crate::error::{ClientError, Result};
use crate::models::{Annotation, DeleteResponse};
use crate::retry::{execute_once, execute_with_retry};

impl HypothesisClient {
    /// Fetch an annotation by id. Works without a token for public records.
    pub async fn fetch_annotation(&self, id: &str) -> Result<Annotation> {
        require_id(id, "annotation")?;
        let request = self.request(Method::GET, &format!("/annotations/{}", segment(id)));
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }

    /// Update an annotation. Only the fields present in `changes` are sent.
    pub async fn update_annotation(&self, id: &str, changes: &Annotation) -> Result<Annotation> {
        require_id(id, "annotation")?;
        self.require_token("update annotations")?;

        let request = self
            .request(Method::PATCH, &format!("/annotations/{}", segment(id)))
            .json(changes)?;
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }

    /// Delete one annotation.
    pub async fn delete_annotation(&self, id: &str) -> Result<DeleteResponse> {
        require_id(id, "annotation")?;
        self.require_token("delete annotations")?;

        let request = self.request(Method::DELETE, &format!("/annotations/{}", segment(id)));
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }

    /// Delete many annotations concurrently.
    ///
    /// Each delete is retried with the delete policy. The call fails as a whole
    /// if any delete fails.
    pub async fn delete_annotations(&self, ids: &[String]) -> Result<Vec<DeleteResponse>> {
        if ids.is_empty() {
            return Err(ClientError::InvalidArgument(
                "annotation id list is empty".to_string(),
            ));
        }
        for id in ids {
            require_id(id, "annotation")?;
        }
        self.require_token("delete annotations")?;

        let policy = self.config.delete.retry_policy();
        let futures = ids.iter().map(|id| async move {
            let request = self.request(Method::DELETE, &format!("/annotations/{}", segment(id)));
            let response =
                execute_with_retry(self.transport(), &request, policy, &[StatusCode::OK]).await?;
            let deleted: DeleteResponse = response.json()?;
            debug!("Deleted annotation {}", deleted.id);
            Ok::<_, ClientError>(deleted)
        });
        let deleted = futures::future::try_join_all(futures).await?;

        info!("Deleted {} annotation(s)", deleted.len());
        Ok(deleted)
    }
}
