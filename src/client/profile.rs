use reqwest::{Method, StatusCode};

use super::HypothesisClient;
use crate::error::Result;
use crate::models::Profile;
use crate::retry::execute_once;

impl HypothesisClient {
    /// Profile of the user the token belongs to.
    pub async fn get_user_profile(&self) -> Result<Profile> {
        self.require_token("fetch the user profile")?;
        let request = self.request(Method::GET, "/profile");
        let response = execute_once(self.transport(), &request, &[StatusCode::OK]).await?;
        Ok(response.json()?)
    }
}
