use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::controllers::AdminPage;
use crate::domain::{default_statuses, Banner, Blog, Brand, Category, Order, Product, Status};
use crate::gateway::{Credentials, GatewayActor, GatewayClient, MemoryConfig, Record};
use crate::images::ImageUrls;
use crate::resource::{Resource, ResourceService, UserDirectory};
use crate::session::SessionContext;

/// The whole admin core, wired together.
///
/// Responsible for starting the gateway task, building one service per
/// resource type over it, and shutting it down again.
pub struct AdminSystem {
    pub session: SessionContext,
    pub orders: Arc<ResourceService<Order>>,
    pub products: Arc<ResourceService<Product>>,
    pub categories: Arc<ResourceService<Category>>,
    pub brands: Arc<ResourceService<Brand>>,
    pub blogs: Arc<ResourceService<Blog>>,
    pub banners: Arc<ResourceService<Banner>>,
    pub statuses: Arc<ResourceService<Status>>,
    pub users: Arc<UserDirectory>,
    gateway: GatewayClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl AdminSystem {
    pub fn start(config: &Config) -> Self {
        Self::with_memory(config, Self::memory_config(config))
    }

    /// Backend layout: the status lookup, the references between tables and
    /// the seeded admin account.
    pub fn memory_config(config: &Config) -> MemoryConfig {
        let statuses: Vec<Record> = default_statuses()
            .iter()
            .filter_map(|status| match serde_json::to_value(status) {
                Ok(Value::Object(row)) => Some(row),
                _ => None,
            })
            .collect();

        let mut memory = MemoryConfig::new()
            .buffer_size(config.gateway_buffer)
            .unique("status", "name")
            .foreign_key("products", "category_id", "categories")
            .foreign_key("products", "brand_id", "brands")
            .foreign_key("orders", "status_id", "status")
            .seed("status", statuses)
            .account(&config.admin_email, &config.admin_password, "Otocap Admin");
        if let Some(key) = &config.service_key {
            memory = memory.service_key(key.clone());
        }
        memory
    }

    pub fn with_memory(config: &Config, memory: MemoryConfig) -> Self {
        let (actor, gateway) = GatewayActor::new(memory);
        let handle = tokio::spawn(actor.run());

        let urls = ImageUrls::new(config.storage_url.clone());
        let shared = Arc::new(gateway.clone());
        let elevated = match &config.service_key {
            Some(key) => gateway.with_credentials(Credentials::ServiceRole(key.clone())),
            None => {
                warn!("No service key configured; listing users will be unauthorized");
                gateway.clone()
            }
        };

        info!("Admin system started");
        Self {
            session: SessionContext::new(shared.clone()),
            orders: Arc::new(ResourceService::new(shared.clone(), urls.clone())),
            products: Arc::new(ResourceService::new(shared.clone(), urls.clone())),
            categories: Arc::new(ResourceService::new(shared.clone(), urls.clone())),
            brands: Arc::new(ResourceService::new(shared.clone(), urls.clone())),
            blogs: Arc::new(ResourceService::new(shared.clone(), urls.clone())),
            banners: Arc::new(ResourceService::new(shared.clone(), urls.clone())),
            statuses: Arc::new(ResourceService::new(shared, urls)),
            users: Arc::new(UserDirectory::new(Arc::new(elevated))),
            gateway,
            handles: vec![handle],
        }
    }

    /// The raw gateway handle, e.g. for storage listings.
    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    /// A list+form page over one of this system's services.
    pub fn page<R: Resource>(&self, service: &Arc<ResourceService<R>>) -> AdminPage<R> {
        AdminPage::new(Arc::clone(service), &self.session)
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        // pages may still hold service handles, so dropping ours is not enough
        self.gateway.shutdown().await;

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Gateway task failed: {:?}", e);
                return Err(format!("Gateway task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
