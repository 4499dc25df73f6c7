use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::messages::GatewayRequest;
use super::{AuthUser, Credentials, GatewayClient, GatewayError, Record, SortOrder};

/// A `collection.column` pair that must point at an existing row of `references`.
#[derive(Debug, Clone)]
struct ForeignKey {
    collection: String,
    column: String,
    references: String,
}

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
}

/// Builder for a [`GatewayActor`]: declared constraints, seed rows and accounts.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    buffer_size: usize,
    unique: Vec<(String, String)>,
    foreign_keys: Vec<ForeignKey>,
    seed: Vec<(String, Vec<Record>)>,
    accounts: Vec<Account>,
    service_key: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            unique: Vec::new(),
            foreign_keys: Vec::new(),
            seed: Vec::new(),
            accounts: Vec::new(),
            service_key: None,
        }
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn unique(mut self, collection: &str, column: &str) -> Self {
        self.unique.push((collection.to_string(), column.to_string()));
        self
    }

    pub fn foreign_key(mut self, collection: &str, column: &str, references: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            collection: collection.to_string(),
            column: column.to_string(),
            references: references.to_string(),
        });
        self
    }

    /// Rows inserted before the actor starts serving. Rows without an `id` get one.
    pub fn seed(mut self, collection: &str, rows: Vec<Record>) -> Self {
        self.seed.push((collection.to_string(), rows));
        self
    }

    pub fn account(mut self, email: &str, password: &str, full_name: &str) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let mut user_metadata = serde_json::Map::new();
        if !full_name.is_empty() {
            user_metadata.insert("full_name".into(), Value::String(full_name.to_string()));
        }
        self.accounts.push(Account {
            user: AuthUser {
                id,
                email: Some(email.to_string()),
                phone: None,
                user_metadata,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            password: password.to_string(),
        });
        self
    }

    /// Key accepted as service-role credentials.
    pub fn service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into());
        self
    }
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Record>,
    next_id: i64,
}

impl Table {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process backend: owns every table and bucket and serves
/// [`GatewayRequest`]s until all client handles are dropped.
pub struct GatewayActor {
    receiver: mpsc::Receiver<GatewayRequest>,
    tables: HashMap<String, Table>,
    buckets: HashMap<String, BTreeMap<String, Vec<u8>>>,
    unique: Vec<(String, String)>,
    foreign_keys: Vec<ForeignKey>,
    accounts: Vec<Account>,
    service_key: Option<String>,
}

impl GatewayActor {
    pub fn new(config: MemoryConfig) -> (Self, GatewayClient) {
        let (sender, receiver) = mpsc::channel(config.buffer_size);
        let mut actor = Self {
            receiver,
            tables: HashMap::new(),
            buckets: HashMap::new(),
            unique: config.unique,
            foreign_keys: config.foreign_keys,
            accounts: config.accounts,
            service_key: config.service_key,
        };
        for (collection, rows) in config.seed {
            for row in rows {
                if let Err(e) = actor.insert(&collection, row) {
                    warn!(collection = %collection, error = %e, "Dropping seed row");
                }
            }
        }
        (actor, GatewayClient::new(sender))
    }

    #[instrument(name = "gateway", skip(self))]
    pub async fn run(mut self) {
        info!("Gateway starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                GatewayRequest::List { collection, order, respond_to } => {
                    let _ = respond_to.send(Ok(self.list(&collection, order)));
                }
                GatewayRequest::Fetch { collection, id, respond_to } => {
                    let row = self.tables.get(&collection).and_then(|t| t.rows.get(&id)).cloned();
                    let _ = respond_to.send(Ok(row));
                }
                GatewayRequest::Insert { collection, record, respond_to } => {
                    let _ = respond_to.send(self.insert(&collection, record));
                }
                GatewayRequest::Update { collection, id, partial, respond_to } => {
                    let _ = respond_to.send(self.update(&collection, id, partial));
                }
                GatewayRequest::Remove { collection, id, respond_to } => {
                    let _ = respond_to.send(self.remove(&collection, id));
                }
                GatewayRequest::Upload { bucket, name, bytes, respond_to } => {
                    let _ = respond_to.send(self.upload(&bucket, name, bytes));
                }
                GatewayRequest::RemoveObjects { bucket, paths, respond_to } => {
                    if let Some(objects) = self.buckets.get_mut(&bucket) {
                        for path in &paths {
                            objects.remove(path);
                        }
                    }
                    debug!(bucket = %bucket, count = paths.len(), "Objects removed");
                    let _ = respond_to.send(Ok(()));
                }
                GatewayRequest::ListObjects { bucket, respond_to } => {
                    let names = self
                        .buckets
                        .get(&bucket)
                        .map(|objects| objects.keys().cloned().collect())
                        .unwrap_or_default();
                    let _ = respond_to.send(Ok(names));
                }
                GatewayRequest::SignIn { email, password, respond_to } => {
                    let _ = respond_to.send(self.sign_in(&email, &password));
                }
                GatewayRequest::ListAllUsers { credentials, respond_to } => {
                    let _ = respond_to.send(self.list_all_users(&credentials));
                }
                GatewayRequest::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }
        info!("Gateway stopped");
    }

    fn list(&self, collection: &str, order: SortOrder) -> Vec<Record> {
        let mut rows: Vec<Record> = self
            .tables
            .get(collection)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| compare_column(a.get(order.column), b.get(order.column), order.ascending));
        rows
    }

    fn insert(&mut self, collection: &str, mut record: Record) -> Result<Record, GatewayError> {
        self.check_unique(collection, &record, None)?;
        self.check_references(collection, &record)?;

        let table = self.tables.entry(collection.to_string()).or_default();
        let id = match record.get("id").and_then(Value::as_i64) {
            Some(id) if table.rows.contains_key(&id) => {
                return Err(GatewayError::Constraint(format!(
                    "duplicate key value violates unique constraint \"{}_pkey\"",
                    collection
                )));
            }
            Some(id) => {
                table.next_id = table.next_id.max(id);
                id
            }
            None => table.allocate_id(),
        };
        record.insert("id".into(), Value::from(id));
        if record.get("created_at").map_or(true, Value::is_null) {
            record.insert("created_at".into(), Value::String(chrono::Utc::now().to_rfc3339()));
        }
        table.rows.insert(id, record.clone());
        debug!(collection, id, "Row inserted");
        Ok(record)
    }

    fn update(&mut self, collection: &str, id: i64, partial: Record) -> Result<Record, GatewayError> {
        let mut merged = self
            .tables
            .get(collection)
            .and_then(|t| t.rows.get(&id))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("{}/{}", collection, id)))?;
        for (key, value) in partial {
            if key != "id" {
                merged.insert(key, value);
            }
        }
        self.check_unique(collection, &merged, Some(id))?;
        self.check_references(collection, &merged)?;

        if let Some(table) = self.tables.get_mut(collection) {
            table.rows.insert(id, merged.clone());
        }
        debug!(collection, id, "Row updated");
        Ok(merged)
    }

    fn remove(&mut self, collection: &str, id: i64) -> Result<(), GatewayError> {
        let exists = self.tables.get(collection).is_some_and(|t| t.rows.contains_key(&id));
        if !exists {
            return Err(GatewayError::NotFound(format!("{}/{}", collection, id)));
        }
        for fk in self.foreign_keys.iter().filter(|fk| fk.references == collection) {
            let referenced = self.tables.get(&fk.collection).is_some_and(|t| {
                t.rows.values().any(|row| row.get(&fk.column).and_then(as_id) == Some(id))
            });
            if referenced {
                return Err(GatewayError::Constraint(format!(
                    "{}/{} is still referenced from {}.{}",
                    collection, id, fk.collection, fk.column
                )));
            }
        }
        if let Some(table) = self.tables.get_mut(collection) {
            table.rows.remove(&id);
        }
        debug!(collection, id, "Row removed");
        Ok(())
    }

    fn check_unique(&self, collection: &str, record: &Record, own_id: Option<i64>) -> Result<(), GatewayError> {
        let Some(table) = self.tables.get(collection) else {
            return Ok(());
        };
        for (_, column) in self.unique.iter().filter(|(c, _)| c == collection) {
            let Some(value) = record.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = table
                .rows
                .iter()
                .any(|(id, row)| Some(*id) != own_id && row.get(column) == Some(value));
            if clash {
                return Err(GatewayError::Constraint(format!(
                    "duplicate value for {}.{}: {}",
                    collection, column, value
                )));
            }
        }
        Ok(())
    }

    fn check_references(&self, collection: &str, record: &Record) -> Result<(), GatewayError> {
        for fk in self.foreign_keys.iter().filter(|fk| fk.collection == collection) {
            let Some(value) = record.get(&fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let found = as_id(value).is_some_and(|target| {
                self.tables
                    .get(&fk.references)
                    .is_some_and(|t| t.rows.contains_key(&target))
            });
            if !found {
                return Err(GatewayError::Constraint(format!(
                    "{}.{} = {} does not reference an existing {} row",
                    collection, fk.column, value, fk.references
                )));
            }
        }
        Ok(())
    }

    fn upload(&mut self, bucket: &str, name: String, bytes: Vec<u8>) -> Result<String, GatewayError> {
        if name.is_empty() || name.starts_with('/') || name.contains("..") {
            return Err(GatewayError::Constraint(format!("invalid object key: {:?}", name)));
        }
        let objects = self.buckets.entry(bucket.to_string()).or_default();
        if objects.contains_key(&name) {
            return Err(GatewayError::Constraint(format!("object already exists: {}/{}", bucket, name)));
        }
        debug!(bucket, name = %name, size = bytes.len(), "Object stored");
        objects.insert(name.clone(), bytes);
        Ok(name)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError> {
        self.accounts
            .iter()
            .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| GatewayError::Unauthorized("invalid login credentials".to_string()))
    }

    fn list_all_users(&self, credentials: &Credentials) -> Result<Vec<AuthUser>, GatewayError> {
        match (credentials, &self.service_key) {
            (Credentials::ServiceRole(key), Some(expected)) if key == expected => {
                Ok(self.accounts.iter().map(|a| a.user.clone()).collect())
            }
            _ => Err(GatewayError::Unauthorized("listing users requires service-role credentials".to_string())),
        }
    }
}

fn as_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Column ordering used by `list`. Nulls (and missing columns) sort last in
/// either direction.
fn compare_column(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use serde_json::json;

    fn row(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    fn spawn(config: MemoryConfig) -> GatewayClient {
        let (actor, client) = GatewayActor::new(config);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_timestamps() {
        let gateway = spawn(MemoryConfig::new());

        let first = gateway.insert("categories", row(json!({"name": "Oils", "order": 2}))).await.unwrap();
        let second = gateway.insert("categories", row(json!({"name": "Filters", "order": 1}))).await.unwrap();

        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert!(first["created_at"].is_string());
    }

    #[tokio::test]
    async fn list_sorts_with_nulls_last() {
        let gateway = spawn(MemoryConfig::new());
        for (name, order) in [("b", json!(2)), ("none", Value::Null), ("a", json!(1))] {
            gateway
                .insert("brands", row(json!({"name": name, "order": order})))
                .await
                .unwrap();
        }

        let asc = gateway.list("brands", SortOrder::asc("order")).await.unwrap();
        let names: Vec<_> = asc.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "none"]);

        let desc = gateway.list("brands", SortOrder::desc("order")).await.unwrap();
        let names: Vec<_> = desc.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "a", "none"]);
    }

    #[tokio::test]
    async fn update_merges_partial_rows() {
        let gateway = spawn(MemoryConfig::new());
        let created = gateway
            .insert("categories", row(json!({"name": "Oils", "order": 2})))
            .await
            .unwrap();
        let id = created["id"].as_i64().unwrap();

        let updated = gateway
            .update("categories", id, row(json!({"order": 5, "id": 99})))
            .await
            .unwrap();

        assert_eq!(updated["name"], json!("Oils"));
        assert_eq!(updated["order"], json!(5));
        assert_eq!(updated["id"], json!(id));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let gateway = spawn(MemoryConfig::new());
        let err = gateway.update("categories", 4, Record::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn foreign_keys_guard_inserts_and_deletes() {
        let gateway = spawn(MemoryConfig::new().foreign_key("products", "category_id", "categories"));
        let category = gateway.insert("categories", row(json!({"name": "Oils"}))).await.unwrap();

        let dangling = gateway
            .insert("products", row(json!({"name": "X", "category_id": 42})))
            .await
            .unwrap_err();
        assert!(matches!(dangling, GatewayError::Constraint(_)));

        gateway
            .insert("products", row(json!({"name": "Y", "category_id": category["id"]})))
            .await
            .unwrap();
        let referenced = gateway
            .remove("categories", category["id"].as_i64().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(referenced, GatewayError::Constraint(msg) if msg.contains("products.category_id")));
    }

    #[tokio::test]
    async fn unique_columns_reject_duplicates() {
        let gateway = spawn(MemoryConfig::new().unique("brands", "name"));
        gateway.insert("brands", row(json!({"name": "Acme"}))).await.unwrap();
        let err = gateway.insert("brands", row(json!({"name": "Acme"}))).await.unwrap_err();
        assert!(matches!(err, GatewayError::Constraint(_)));
    }

    #[tokio::test]
    async fn objects_upload_list_and_remove() {
        let gateway = spawn(MemoryConfig::new());
        let path = gateway.upload_object("products-images", "a.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(path, "a.png");

        let again = gateway.upload_object("products-images", "a.png", vec![4]).await.unwrap_err();
        assert!(matches!(again, GatewayError::Constraint(_)));

        gateway
            .remove_objects("products-images", &["a.png".to_string(), "ghost.png".to_string()])
            .await
            .unwrap();
        assert!(gateway.list_objects("products-images").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_users_requires_service_role() {
        let gateway = spawn(
            MemoryConfig::new()
                .account("admin@otocap.test", "secret", "Admin")
                .service_key("service-key"),
        );

        let denied = gateway.list_all_users().await.unwrap_err();
        assert!(matches!(denied, GatewayError::Unauthorized(_)));

        let elevated = gateway.with_credentials(Credentials::ServiceRole("service-key".into()));
        let users = elevated.list_all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email.as_deref(), Some("admin@otocap.test"));
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let gateway = spawn(MemoryConfig::new().account("admin@otocap.test", "secret", ""));
        assert!(gateway.sign_in("admin@otocap.test", "secret").await.is_ok());
        let err = gateway.sign_in("admin@otocap.test", "wrong").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn closed_gateway_reports_transport_error() {
        let (actor, client) = GatewayActor::new(MemoryConfig::new());
        drop(actor);
        let err = client.list("orders", SortOrder::desc("created_at")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
