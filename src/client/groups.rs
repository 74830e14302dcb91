//! Group endpoints.

use reqwest::{Method, StatusCode};
use tracing::info;

use super::{require_id, segment, HypothesisClient};
use crate::error::{ClientError, Result};
use crate::models::{Group, GroupUpdate, NewGroup};
use crate::retry::execute_once;

impl HypothesisClient {
    /// Groups visible to the caller. Anonymous callers only see public groups.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let request = self.request(Method::GET, "/groups");
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }

    pub async fn fetch_group(&self, id: &str) -> Result<Group> {
        require_id(id, "group")?;
        let request = self.request(Method::GET, &format!("/groups/{}", segment(id)));
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }

    /// Create a private group owned by the caller.
    pub async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        if group.name.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "group name must not be empty".to_string(),
            ));
        }
        self.require_token("create groups")?;

        let request = self.request(Method::POST, "/groups").json(group)?;
        let response = execute_once(
            self.transport(),
            &request,
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;
        let created: Group = response.json()?;
        info!("Created group {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_group(&self, id: &str, update: &GroupUpdate) -> Result<Group> {
        require_id(id, "group")?;
        if update.is_empty() {
            return Err(ClientError::InvalidArgument(
                "group update sets no fields".to_string(),
            ));
        }
        self.require_token("update groups")?;

        let request = self
            .request(Method::PATCH, &format!("/groups/{}", segment(id)))
            .json(update)?;
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }

    /// Remove the caller from a group.
    pub async fn leave_group(&self, id: &str) -> Result<()> {
        require_id(id, "group")?;
        self.require_token("leave groups")?;

        let request = self.request(Method::DELETE, &format!("/groups/{}/members/me", segment(id)));
        execute_once(
            self.transport(),
            &request,
            &[StatusCode::NO_CONTENT, StatusCode::OK],
        )
        .await?;
        info!("Left group {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::PUBLIC_GROUP;

    #[tokio::test]
    async fn test_group_lifecycle() {
        let (client, _) = client();

        let mut new_group = NewGroup::new("Reading club");
        new_group.description = Some("Weekly papers".to_string());
        let group = client.create_group(&new_group).await.unwrap();
        assert_eq!(group.name, "Reading club");
        assert_eq!(group.description.as_deref(), Some("Weekly papers"));

        let renamed = client
            .update_group(&group.id, &GroupUpdate::name("Journal club"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Journal club");

        let fetched = client.fetch_group(&group.id).await.unwrap();
        assert_eq!(fetched, renamed);

        let groups = client.list_groups().await.unwrap();
        assert!(groups.iter().any(|g| g.is_public()));
        assert!(groups.iter().any(|g| g.id == group.id));

        client.leave_group(&group.id).await.unwrap();
        let groups = client.list_groups().await.unwrap();
        assert!(!groups.iter().any(|g| g.id == group.id));
    }

    #[tokio::test]
    async fn test_invalid_group_arguments() {
        let (client, store) = client();

        assert!(matches!(
            client.create_group(&NewGroup::new("  ")).await,
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.update_group("g1", &GroupUpdate::default()).await,
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.leave_group("").await,
            Err(ClientError::InvalidArgument(_))
        ));
        assert_eq!(store.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_group_management_needs_token() {
        let (client, store) = anonymous_client();

        assert!(matches!(
            client.create_group(&NewGroup::new("Private")).await,
            Err(ClientError::MissingCredential(_))
        ));
        assert!(matches!(
            client.leave_group(PUBLIC_GROUP).await,
            Err(ClientError::MissingCredential(_))
        ));
        assert_eq!(store.request_count().await, 0);

        let groups = client.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_unknown_group() {
        let (client, _) = client();
        let err = client.leave_group("nope").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api {
                status: StatusCode::NOT_FOUND,
                ..
            }
        ));
    }
}
