//! Profile API trait

use async_trait::async_trait;

use crate::client::http::ApiClient;
use crate::client::models::{ProfileUpdate, UserProfile};
use crate::client::request::ApiRequest;
use crate::error::ApiResult;

const PROFILE_PATH: &str = "/api/protected/profile";

/// The signed-in user's own profile
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn get_profile(&self) -> ApiResult<UserProfile>;

    /// Apply `update` and return the stored profile
    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile>;
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn get_profile(&self) -> ApiResult<UserProfile> {
        self.send_json(ApiRequest::get(PROFILE_PATH)).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        let request = ApiRequest::post(PROFILE_PATH).json(update)?;
        self.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cookies::CookieJar;
    use crate::session::token::test_jwt;
    use crate::session::{AccessToken, HistoryNavigator, Session, routes};
    use crate::store::{MemoryStore, StoreHandle, TabId};
    use mockito::Matcher;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_update_profile_posts_changes() {
        let mut server = mockito::Server::new_async().await;
        let token = test_jwt(4_000_000_000, "ada");
        let mock = server
            .mock("POST", PROFILE_PATH)
            .match_header("authorization", format!("Bearer {}", token).as_str())
            .match_body(Matcher::Json(serde_json::json!({"name": "Ada L."})))
            .with_status(200)
            .with_body(r#"{"id":"u1","email":"ada@example.com","name":"Ada L."}"#)
            .create_async()
            .await;

        let store = StoreHandle::new(MemoryStore::new_shared(), TabId::generate());
        let session = Session::new(store, Arc::new(HistoryNavigator::new(routes::PROFILE)));
        session.establish(AccessToken::new(token)).await;
        let client =
            ApiClient::new(&server.url(), "en", Arc::new(CookieJar::new()), session).unwrap();

        let update = ProfileUpdate {
            name: Some("Ada L.".to_string()),
            ..Default::default()
        };
        let profile = client.update_profile(&update).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada L."));
        mock.assert_async().await;
    }
}
