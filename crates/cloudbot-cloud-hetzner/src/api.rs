//! Hetzner Cloud REST API client
//!
//! Thin JSON client over `https://api.hetzner.cloud/v1` using Bearer token
//! authentication. Responses are decoded into the wire types below and
//! converted to fleet records by the provider.

use crate::error::{HetznerError, Result};
use chrono::{DateTime, FixedOffset};
use cloudbot_cloud::{ActionStatus, ImageType, ServerStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const HETZNER_API_BASE: &str = "https://api.hetzner.cloud/v1";

const PER_PAGE: u32 = 50;

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct HetznerConfig {
    pub api_token: String,
    pub base_url: String,
}

impl HetznerConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: HETZNER_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Hetzner Cloud API client
pub struct HetznerApi {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl HetznerApi {
    pub fn new(config: HetznerConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(HetznerError::MissingToken);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_token: config.api_token,
            base_url: config.base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!("GET {} {:?}", path, query);
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.api_token)
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        tracing::debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<Option<ActionEnvelope>> {
        tracing::debug!("DELETE {}", path);
        let response = self
            .client
            .delete(self.url(path))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// List all servers (all pages)
    pub async fn list_servers(&self) -> Result<Vec<ApiServer>> {
        let mut servers = Vec::new();
        let mut page = Some(1);
        while let Some(p) = page {
            let resp: ServersPage = self
                .get("/servers", &[("page", p.to_string()), ("per_page", PER_PAGE.to_string())])
                .await?;
            servers.extend(resp.servers);
            page = resp.meta.and_then(|m| m.pagination.next_page);
        }
        Ok(servers)
    }

    /// Get server by exact name
    pub async fn find_server(&self, name: &str) -> Result<Option<ApiServer>> {
        let resp: ServersPage = self.get("/servers", &[("name", name.to_string())]).await?;
        Ok(resp.servers.into_iter().find(|s| s.name == name))
    }

    /// List all images of a type (all pages)
    pub async fn list_images(&self, image_type: ImageType) -> Result<Vec<ApiImage>> {
        let mut images = Vec::new();
        let mut page = Some(1);
        while let Some(p) = page {
            let resp: ImagesPage = self
                .get(
                    "/images",
                    &[
                        ("type", image_type.as_str().to_string()),
                        ("page", p.to_string()),
                        ("per_page", PER_PAGE.to_string()),
                    ],
                )
                .await?;
            images.extend(resp.images);
            page = resp.meta.and_then(|m| m.pagination.next_page);
        }
        Ok(images)
    }

    /// List all SSH keys (all pages)
    pub async fn list_ssh_keys(&self) -> Result<Vec<ApiSshKey>> {
        let mut keys = Vec::new();
        let mut page = Some(1);
        while let Some(p) = page {
            let resp: SshKeysPage = self
                .get("/ssh_keys", &[("page", p.to_string()), ("per_page", PER_PAGE.to_string())])
                .await?;
            keys.extend(resp.ssh_keys);
            page = resp.meta.and_then(|m| m.pagination.next_page);
        }
        Ok(keys)
    }

    pub async fn create_server(&self, body: &CreateServerBody) -> Result<CreateServerResponse> {
        self.post("/servers", body).await
    }

    pub async fn shutdown_server(&self, id: u64) -> Result<ApiAction> {
        let resp: ActionEnvelope = self
            .post(
                &format!("/servers/{}/actions/shutdown", id),
                &serde_json::json!({}),
            )
            .await?;
        Ok(resp.action)
    }

    pub async fn create_image(&self, id: u64, body: &CreateImageBody) -> Result<CreateImageResponse> {
        self.post(&format!("/servers/{}/actions/create_image", id), body)
            .await
    }

    pub async fn delete_server(&self, id: u64) -> Result<ApiAction> {
        let resp = self.delete(&format!("/servers/{}", id)).await?;
        resp.map(|r| r.action)
            .ok_or_else(|| HetznerError::UnexpectedResponse {
                status: 204,
                body: "delete server returned no action".to_string(),
            })
    }

    /// Delete an image. Hetzner answers 204 without an action.
    pub async fn delete_image(&self, id: u64) -> Result<Option<ApiAction>> {
        let resp = self.delete(&format!("/images/{}", id)).await?;
        Ok(resp.map(|r| r.action))
    }

    pub async fn get_action(&self, id: u64) -> Result<ApiAction> {
        let resp: ActionEnvelope = self.get(&format!("/actions/{}", id), &[]).await?;
        Ok(resp.action)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(error_from_body(status.as_u16(), &body));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Map an error response to a typed error
pub(crate) fn error_from_body(status: u16, body: &str) -> HetznerError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    match (status, parsed) {
        (401, Some(env)) => HetznerError::AuthenticationFailed(env.error.message),
        (401, None) => HetznerError::AuthenticationFailed(body.to_string()),
        (_, Some(env)) => HetznerError::Api {
            code: env.error.code,
            message: env.error.message,
        },
        (_, None) => HetznerError::UnexpectedResponse {
            status,
            body: body.to_string(),
        },
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiServer {
    pub id: u64,
    pub name: String,
    pub status: ServerStatus,
    pub created: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiImage {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    /// Size in GB, only set for snapshots and backups
    #[serde(default)]
    pub image_size: Option<f64>,
    pub created: Option<DateTime<FixedOffset>>,
    #[serde(rename = "type")]
    pub image_type: ImageType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSshKey {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAction {
    pub id: u64,
    pub command: String,
    pub status: ActionStatus,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ActionEnvelope {
    pub action: ApiAction,
}

#[derive(Debug, Deserialize)]
struct Meta {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ServersPage {
    servers: Vec<ApiServer>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct ImagesPage {
    images: Vec<ApiImage>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct SshKeysPage {
    ssh_keys: Vec<ApiSshKey>,
    meta: Option<Meta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServerBody {
    pub name: String,
    pub server_type: String,
    pub location: String,
    pub image: String,
    pub ssh_keys: Vec<u64>,
    pub public_net: PublicNetBody,
    pub start_after_create: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicNetBody {
    pub enable_ipv4: bool,
    pub enable_ipv6: bool,
    pub ipv4: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServerResponse {
    pub server: ApiServer,
    pub action: ApiAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateImageBody {
    pub description: String,
    #[serde(rename = "type")]
    pub image_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateImageResponse {
    pub image: ApiImage,
    pub action: ApiAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_rejected() {
        let result = HetznerApi::new(HetznerConfig::new("  "));
        assert!(matches!(result, Err(HetznerError::MissingToken)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = HetznerConfig::new("token").with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"error":{"code":"conflict","message":"server is locked","details":{}}}"#;
        match error_from_body(409, body) {
            HetznerError::Api { code, message } => {
                assert_eq!(code, "conflict");
                assert_eq!(message, "server is locked");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized() {
        let body = r#"{"error":{"code":"unauthorized","message":"unable to authenticate"}}"#;
        assert!(matches!(
            error_from_body(401, body),
            HetznerError::AuthenticationFailed(msg) if msg == "unable to authenticate"
        ));
    }

    #[test]
    fn test_unparseable_error_body() {
        assert!(matches!(
            error_from_body(502, "<html>bad gateway</html>"),
            HetznerError::UnexpectedResponse { status: 502, .. }
        ));
    }

    #[test]
    fn test_servers_page() {
        let body = r#"{
            "servers": [
                {"id": 42, "name": "nub", "status": "running", "created": "2024-02-16T10:00:00+00:00",
                 "public_net": {}, "server_type": {"name": "ccx33"}}
            ],
            "meta": {"pagination": {"page": 1, "per_page": 50, "next_page": null}}
        }"#;
        let page: ServersPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.servers.len(), 1);
        assert_eq!(page.servers[0].status, ServerStatus::Running);
        assert!(page.meta.unwrap().pagination.next_page.is_none());
    }

    #[test]
    fn test_ssh_keys_page_follows_next_page() {
        let body = r#"{
            "ssh_keys": [{"id": 7, "name": "ops", "fingerprint": "aa:bb"}],
            "meta": {"pagination": {"page": 1, "per_page": 50, "next_page": 2}}
        }"#;
        let page: SshKeysPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.ssh_keys.len(), 1);
        assert_eq!(page.meta.unwrap().pagination.next_page, Some(2));
    }

    #[test]
    fn test_create_server_body_shape() {
        let body = CreateServerBody {
            name: "nub".to_string(),
            server_type: "ccx33".to_string(),
            location: "hel1".to_string(),
            image: "149793636".to_string(),
            ssh_keys: vec![1, 2],
            public_net: PublicNetBody {
                enable_ipv4: true,
                enable_ipv6: true,
                ipv4: Some(48363362),
            },
            start_after_create: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["public_net"]["ipv4"], 48363362);
        assert_eq!(json["public_net"]["enable_ipv6"], true);
        assert_eq!(json["image"], "149793636");
        assert_eq!(json["ssh_keys"], serde_json::json!([1, 2]));
    }
}
