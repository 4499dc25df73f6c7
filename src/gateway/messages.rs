use tokio::sync::oneshot;

use super::{AuthUser, Credentials, GatewayError, Record, SortOrder};

pub type Response<T> = oneshot::Sender<Result<T, GatewayError>>;

/// Typed messages for the gateway actor. Each variant carries its parameters
/// and a oneshot channel for the response.
#[derive(Debug)]
pub enum GatewayRequest {
    List {
        collection: String,
        order: SortOrder,
        respond_to: Response<Vec<Record>>,
    },
    Fetch {
        collection: String,
        id: i64,
        respond_to: Response<Option<Record>>,
    },
    Insert {
        collection: String,
        record: Record,
        respond_to: Response<Record>,
    },
    Update {
        collection: String,
        id: i64,
        partial: Record,
        respond_to: Response<Record>,
    },
    Remove {
        collection: String,
        id: i64,
        respond_to: Response<()>,
    },
    Upload {
        bucket: String,
        name: String,
        bytes: Vec<u8>,
        respond_to: Response<String>,
    },
    RemoveObjects {
        bucket: String,
        paths: Vec<String>,
        respond_to: Response<()>,
    },
    ListObjects {
        bucket: String,
        respond_to: Response<Vec<String>>,
    },
    SignIn {
        email: String,
        password: String,
        respond_to: Response<AuthUser>,
    },
    ListAllUsers {
        credentials: Credentials,
        respond_to: Response<Vec<AuthUser>>,
    },
    /// Stop serving even if other handles are still alive.
    Shutdown,
}
