//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_create`] or [`expect_action`] to take the
//! next request together with its responder, and answer it however the test
//! needs: success, refusal, or not at all yet.

use crate::actor_framework::{Entity, FrameworkError, ResourceClient, ResourceRequest};
use tokio::sync::{mpsc, oneshot};

pub type Responder<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Creates a mock client and a receiver for asserting requests.
///
/// The client is a real [`ResourceClient`] whose requests land on a channel
/// the test controls instead of a running actor, so the order, payload and
/// timing of every response is up to the test.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::CreateParams, Responder<T::Id>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, Responder<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Query, Responder<Vec<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { query, respond_to }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, T::Action, Responder<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a BulkAction request
pub async fn expect_bulk_action<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(Vec<T::Id>, T::Action, Responder<Vec<T::ActionResult>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::BulkAction { ids, action, respond_to }) => Some((ids, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QrCode, QrCodeCreate, QrCodeQuery};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<QrCode>(10);

        // Test Create
        let create_task = tokio::spawn(async move {
            client.create(QrCodeCreate::new("restaurant_1", "T4")).await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.table_number, "T4");
        responder.send(Ok("qr_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("qr_1".to_string()));
    }

    #[tokio::test]
    async fn test_wrong_request_kind_is_none() {
        let (client, mut receiver) = create_mock_client::<QrCode>(10);
        let list_task = tokio::spawn(async move { client.list(QrCodeQuery::default()).await });

        assert!(expect_get(&mut receiver).await.is_none());
        // The responder went with the unmatched request.
        assert_eq!(list_task.await.unwrap(), Err(FrameworkError::ActorDropped));
    }
}
