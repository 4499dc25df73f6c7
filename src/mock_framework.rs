//! # Mock Framework
//!
//! Utilities for testing services and controllers without a running gateway.
//!
//! Use [`create_mock_gateway`] to get a gateway handle and the receiver its
//! requests land on. Then use helpers like [`expect_insert`] or
//! [`expect_upload`] to assert each request and script the reply.

use tokio::sync::mpsc;

use crate::gateway::messages::Response;
use crate::gateway::{GatewayClient, GatewayRequest, Record, SortOrder};

/// Creates a gateway handle wired to a receiver owned by the test.
///
/// # Testing Strategy
/// Services only ever see the [`Gateway`](crate::gateway::Gateway) trait, so a
/// [`GatewayClient`] whose channel the test drains is indistinguishable from the
/// real backend. The test answers each request by hand, which makes failures,
/// partial failures and reordered replies deterministic.
pub fn create_mock_gateway(buffer_size: usize) -> (GatewayClient, mpsc::Receiver<GatewayRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (GatewayClient::new(sender), receiver)
}

/// Helper to verify that the next message is a List request
pub async fn expect_list(
    receiver: &mut mpsc::Receiver<GatewayRequest>,
) -> Option<(String, SortOrder, Response<Vec<Record>>)> {
    match receiver.recv().await {
        Some(GatewayRequest::List { collection, order, respond_to }) => Some((collection, order, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Fetch request
pub async fn expect_fetch(
    receiver: &mut mpsc::Receiver<GatewayRequest>,
) -> Option<(String, i64, Response<Option<Record>>)> {
    match receiver.recv().await {
        Some(GatewayRequest::Fetch { collection, id, respond_to }) => Some((collection, id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Insert request
pub async fn expect_insert(receiver: &mut mpsc::Receiver<GatewayRequest>) -> Option<(String, Record, Response<Record>)> {
    match receiver.recv().await {
        Some(GatewayRequest::Insert { collection, record, respond_to }) => Some((collection, record, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Update request
pub async fn expect_update(
    receiver: &mut mpsc::Receiver<GatewayRequest>,
) -> Option<(String, i64, Record, Response<Record>)> {
    match receiver.recv().await {
        Some(GatewayRequest::Update { collection, id, partial, respond_to }) => {
            Some((collection, id, partial, respond_to))
        }
        _ => None,
    }
}

/// Helper to verify that the next message is a Remove request
pub async fn expect_remove(receiver: &mut mpsc::Receiver<GatewayRequest>) -> Option<(String, i64, Response<()>)> {
    match receiver.recv().await {
        Some(GatewayRequest::Remove { collection, id, respond_to }) => Some((collection, id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Upload request.
/// Yields the bucket, the object name and the responder.
pub async fn expect_upload(receiver: &mut mpsc::Receiver<GatewayRequest>) -> Option<(String, String, Response<String>)> {
    match receiver.recv().await {
        Some(GatewayRequest::Upload { bucket, name, respond_to, .. }) => Some((bucket, name, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a RemoveObjects request
pub async fn expect_remove_objects(
    receiver: &mut mpsc::Receiver<GatewayRequest>,
) -> Option<(String, Vec<String>, Response<()>)> {
    match receiver.recv().await {
        Some(GatewayRequest::RemoveObjects { bucket, paths, respond_to }) => Some((bucket, paths, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Gateway, GatewayError};
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_gateway() {
        let (gateway, mut receiver) = create_mock_gateway(10);

        let insert_task = tokio::spawn(async move {
            let record = json!({"name": "Oils"}).as_object().cloned().unwrap();
            gateway.insert("categories", record).await
        });

        let (collection, record, responder) = expect_insert(&mut receiver).await.expect("Expected Insert request");
        assert_eq!(collection, "categories");
        assert_eq!(record["name"], json!("Oils"));

        let mut stored = record.clone();
        stored.insert("id".into(), json!(1));
        responder.send(Ok(stored.clone())).unwrap();

        let result = insert_task.await.unwrap();
        assert_eq!(result, Ok(stored));
    }

    #[tokio::test]
    async fn dropped_responder_is_a_transport_error() {
        let (gateway, mut receiver) = create_mock_gateway(10);

        let task = tokio::spawn(async move { gateway.remove("brands", 3).await });

        let (_, id, responder) = expect_remove(&mut receiver).await.expect("Expected Remove request");
        assert_eq!(id, 3);
        drop(responder);

        assert!(matches!(task.await.unwrap(), Err(GatewayError::Transport(_))));
    }
}
