//! Hetzner Cloud provider implementation

use crate::api::{
    ApiAction, ApiImage, ApiServer, CreateImageBody, CreateServerBody, HetznerApi, HetznerConfig,
    PublicNetBody,
};
use crate::error::Result;
use async_trait::async_trait;
use cloudbot_cloud::{
    ActionError, ActionHandle, CreateServerRequest, CreatedImage, CreatedServer, FleetProvider,
    ImageRecord, ImageType, ServerRecord, SshKey,
};

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// The reserved IPv4 identity is attached; IPv6 stays on as the API default
impl From<&CreateServerRequest> for CreateServerBody {
    fn from(request: &CreateServerRequest) -> Self {
        Self {
            name: request.name.clone(),
            server_type: request.server_type.clone(),
            location: request.location.clone(),
            image: request.image_id.to_string(),
            ssh_keys: request.ssh_keys.iter().map(|k| k.id).collect(),
            public_net: PublicNetBody {
                enable_ipv4: true,
                enable_ipv6: true,
                ipv4: Some(request.network_identity.id),
            },
            start_after_create: true,
        }
    }
}

impl From<ApiServer> for ServerRecord {
    fn from(server: ApiServer) -> Self {
        Self {
            id: server.id,
            name: server.name,
            status: server.status,
            created_at: server.created,
        }
    }
}

impl From<ApiImage> for ImageRecord {
    fn from(image: ApiImage) -> Self {
        Self {
            id: image.id,
            description: image.description.unwrap_or_default(),
            size_bytes: image
                .image_size
                .map(|gb| (gb * BYTES_PER_GB).round() as u64),
            created_at: image.created,
            image_type: image.image_type,
        }
    }
}

impl From<ApiAction> for ActionHandle {
    fn from(action: ApiAction) -> Self {
        Self {
            id: action.id,
            command: action.command,
            status: action.status,
            error: action.error.map(|e| ActionError::new(e.code, e.message)),
        }
    }
}

/// Hetzner Cloud provider
pub struct HetznerProvider {
    api: HetznerApi,
}

impl HetznerProvider {
    pub fn new(config: HetznerConfig) -> Result<Self> {
        Ok(Self {
            api: HetznerApi::new(config)?,
        })
    }
}

#[async_trait]
impl FleetProvider for HetznerProvider {
    fn name(&self) -> &str {
        "hetzner"
    }

    async fn list_servers(&self) -> cloudbot_cloud::Result<Vec<ServerRecord>> {
        let servers = self.api.list_servers().await?;
        Ok(servers.into_iter().map(ServerRecord::from).collect())
    }

    async fn list_images(&self, image_type: ImageType) -> cloudbot_cloud::Result<Vec<ImageRecord>> {
        let images = self.api.list_images(image_type).await?;
        Ok(images.into_iter().map(ImageRecord::from).collect())
    }

    async fn get_server_by_name(&self, name: &str) -> cloudbot_cloud::Result<Option<ServerRecord>> {
        Ok(self.api.find_server(name).await?.map(ServerRecord::from))
    }

    async fn list_ssh_keys(&self) -> cloudbot_cloud::Result<Vec<SshKey>> {
        let keys = self.api.list_ssh_keys().await?;
        Ok(keys
            .into_iter()
            .map(|k| SshKey {
                id: k.id,
                name: k.name,
            })
            .collect())
    }

    async fn create_server(
        &self,
        request: &CreateServerRequest,
    ) -> cloudbot_cloud::Result<CreatedServer> {
        tracing::info!(
            "Creating server {} ({} in {}) from image {}",
            request.name,
            request.server_type,
            request.location,
            request.image_id
        );

        let resp = self.api.create_server(&CreateServerBody::from(request)).await?;
        let action = ActionHandle::from(resp.action);
        Ok(CreatedServer {
            server_id: resp.server.id,
            message: format!("{} (action {})", action.command, action.id),
            action,
        })
    }

    async fn shutdown_server(&self, server: &ServerRecord) -> cloudbot_cloud::Result<ActionHandle> {
        tracing::info!("Shutting down server {} ({})", server.name, server.id);
        Ok(self.api.shutdown_server(server.id).await?.into())
    }

    async fn create_image(
        &self,
        server: &ServerRecord,
        description: &str,
        image_type: ImageType,
    ) -> cloudbot_cloud::Result<CreatedImage> {
        tracing::info!(
            "Creating {} of server {} as '{}'",
            image_type,
            server.name,
            description
        );
        let body = CreateImageBody {
            description: description.to_string(),
            image_type: image_type.as_str().to_string(),
        };
        let resp = self.api.create_image(server.id, &body).await?;
        Ok(CreatedImage {
            image_id: resp.image.id,
            action: resp.action.into(),
        })
    }

    async fn delete_server(&self, server: &ServerRecord) -> cloudbot_cloud::Result<ActionHandle> {
        tracing::info!("Deleting server {} ({})", server.name, server.id);
        Ok(self.api.delete_server(server.id).await?.into())
    }

    async fn delete_image(
        &self,
        image: &ImageRecord,
    ) -> cloudbot_cloud::Result<Option<ActionHandle>> {
        tracing::info!("Deleting image {} ('{}')", image.id, image.description);
        Ok(self.api.delete_image(image.id).await?.map(ActionHandle::from))
    }

    async fn get_action(&self, id: u64) -> cloudbot_cloud::Result<ActionHandle> {
        Ok(self.api.get_action(id).await?.into())
    }
}
