//! Administration API trait

use async_trait::async_trait;

use crate::client::http::{ApiClient, path_segment};
use crate::client::models::{
    AccessMode, AccessModeSetting, AdminUser, CreateUserRequest, ListEntry, ListEntryRequest,
    Listing, UpdateUserRequest,
};
use crate::client::request::ApiRequest;
use crate::error::{ApiError, ApiResult};

/// Which access list an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessList {
    Whitelist,
    Blacklist,
}

impl AccessList {
    fn path(self) -> &'static str {
        match self {
            AccessList::Whitelist => "/api/admin/whitelist",
            AccessList::Blacklist => "/api/admin/blacklist",
        }
    }
}

impl std::fmt::Display for AccessList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AccessList::Whitelist => "whitelist",
            AccessList::Blacklist => "blacklist",
        })
    }
}

/// Administration operations; all require the `admin` role server-side
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Whether the current user is an administrator
    async fn verify_admin(&self) -> ApiResult<bool>;

    // ========================================================================
    // Users
    // ========================================================================

    async fn list_users(&self) -> ApiResult<Vec<AdminUser>>;

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<AdminUser>;

    async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> ApiResult<AdminUser>;

    async fn delete_user(&self, id: &str) -> ApiResult<()>;

    // ========================================================================
    // Access lists
    // ========================================================================

    async fn list_entries(&self, list: AccessList) -> ApiResult<Vec<ListEntry>>;

    async fn add_entry(&self, list: AccessList, request: &ListEntryRequest)
    -> ApiResult<ListEntry>;

    async fn remove_entry(&self, list: AccessList, id: &str) -> ApiResult<()>;

    // ========================================================================
    // Access mode
    // ========================================================================

    async fn get_access_mode(&self) -> ApiResult<AccessMode>;

    async fn set_access_mode(&self, mode: AccessMode) -> ApiResult<AccessMode>;
}

const USERS_PATH: &str = "/api/admin/users";
const ACCESS_MODE_PATH: &str = "/api/admin/access-mode";

#[async_trait]
impl AdminApi for ApiClient {
    async fn verify_admin(&self) -> ApiResult<bool> {
        match self.execute(ApiRequest::get("/api/admin/verify-admin")).await {
            Ok(_) => Ok(true),
            Err(ApiError::Forbidden(_) | ApiError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list_users(&self) -> ApiResult<Vec<AdminUser>> {
        let listing: Listing<AdminUser> = self.send_json(ApiRequest::get(USERS_PATH)).await?;
        Ok(listing.into_vec())
    }

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<AdminUser> {
        self.send_json(ApiRequest::post(USERS_PATH).json(request)?)
            .await
    }

    async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> ApiResult<AdminUser> {
        let path = format!("{}/{}", USERS_PATH, path_segment(id));
        self.send_json(ApiRequest::put(path).json(request)?).await
    }

    async fn delete_user(&self, id: &str) -> ApiResult<()> {
        let path = format!("{}/{}", USERS_PATH, path_segment(id));
        self.send_message(ApiRequest::delete(path)).await.map(|_| ())
    }

    async fn list_entries(&self, list: AccessList) -> ApiResult<Vec<ListEntry>> {
        let listing: Listing<ListEntry> = self.send_json(ApiRequest::get(list.path())).await?;
        Ok(listing.into_vec())
    }

    async fn add_entry(
        &self,
        list: AccessList,
        request: &ListEntryRequest,
    ) -> ApiResult<ListEntry> {
        self.send_json(ApiRequest::post(list.path()).json(request)?)
            .await
    }

    async fn remove_entry(&self, list: AccessList, id: &str) -> ApiResult<()> {
        let path = format!("{}/{}", list.path(), path_segment(id));
        self.send_message(ApiRequest::delete(path)).await.map(|_| ())
    }

    async fn get_access_mode(&self) -> ApiResult<AccessMode> {
        let setting: AccessModeSetting = self.send_json(ApiRequest::get(ACCESS_MODE_PATH)).await?;
        Ok(setting.mode)
    }

    async fn set_access_mode(&self, mode: AccessMode) -> ApiResult<AccessMode> {
        let request = ApiRequest::put(ACCESS_MODE_PATH).json(&AccessModeSetting { mode })?;
        // Some servers answer with an empty body; the request succeeded either way.
        let response = self.execute(request).await?;
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str::<AccessModeSetting>(&body)
            .map(|setting| setting.mode)
            .unwrap_or(mode))
    }
}
