use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use super::messages::{GatewayRequest, Response};
use super::{AuthUser, Credentials, Gateway, GatewayError, Record, SortOrder};

/// Handle to a running [`GatewayActor`](super::GatewayActor).
///
/// Thin wrapper around the actor's message channel. Cloning is cheap; the actor
/// stops once every handle has been dropped.
#[derive(Clone)]
pub struct GatewayClient {
    sender: mpsc::Sender<GatewayRequest>,
    credentials: Credentials,
}

impl GatewayClient {
    pub fn new(sender: mpsc::Sender<GatewayRequest>) -> Self {
        Self {
            sender,
            credentials: Credentials::Anonymous,
        }
    }

    /// A handle to the same backend carrying different credentials.
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            sender: self.sender.clone(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Asks the actor to stop. Requests sent afterwards fail with `Transport`.
    pub async fn shutdown(&self) {
        if self.sender.send(GatewayRequest::Shutdown).await.is_err() {
            debug!("Gateway already stopped");
        }
    }

    async fn request<T>(&self, build: impl FnOnce(Response<T>) -> GatewayRequest) -> Result<T, GatewayError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| GatewayError::Transport("gateway closed".to_string()))?;
        response
            .await
            .map_err(|_| GatewayError::Transport("gateway dropped the request".to_string()))?
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    #[instrument(skip(self))]
    async fn list(&self, collection: &str, order: SortOrder) -> Result<Vec<Record>, GatewayError> {
        self.request(|respond_to| GatewayRequest::List {
            collection: collection.to_string(),
            order,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn fetch(&self, collection: &str, id: i64) -> Result<Option<Record>, GatewayError> {
        self.request(|respond_to| GatewayRequest::Fetch {
            collection: collection.to_string(),
            id,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, record))]
    async fn insert(&self, collection: &str, record: Record) -> Result<Record, GatewayError> {
        self.request(|respond_to| GatewayRequest::Insert {
            collection: collection.to_string(),
            record,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, partial))]
    async fn update(&self, collection: &str, id: i64, partial: Record) -> Result<Record, GatewayError> {
        self.request(|respond_to| GatewayRequest::Update {
            collection: collection.to_string(),
            id,
            partial,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn remove(&self, collection: &str, id: i64) -> Result<(), GatewayError> {
        self.request(|respond_to| GatewayRequest::Remove {
            collection: collection.to_string(),
            id,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_object(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<String, GatewayError> {
        self.request(|respond_to| GatewayRequest::Upload {
            bucket: bucket.to_string(),
            name: name.to_string(),
            bytes,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<(), GatewayError> {
        self.request(|respond_to| GatewayRequest::RemoveObjects {
            bucket: bucket.to_string(),
            paths: paths.to_vec(),
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, GatewayError> {
        self.request(|respond_to| GatewayRequest::ListObjects {
            bucket: bucket.to_string(),
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError> {
        self.request(|respond_to| GatewayRequest::SignIn {
            email: email.to_string(),
            password: password.to_string(),
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_all_users(&self) -> Result<Vec<AuthUser>, GatewayError> {
        let credentials = self.credentials.clone();
        self.request(|respond_to| GatewayRequest::ListAllUsers { credentials, respond_to })
            .await
    }
}
