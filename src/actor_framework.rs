use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::fmt::{Debug, Display};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Queries, and Actions)
// =============================================================================

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Query: Send + Sync + Debug;

    // Bulk requests apply the same action to every target, hence Clone.
    type Action: Clone + Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;

    /// Get the ID of the entity
    fn id(&self) -> &Self::Id;

    /// Construct the full Entity from the ID and creation parameters
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, FrameworkError>;

    /// Whether this entity belongs in the result of a List request
    fn matches(&self, query: &Self::Query) -> bool;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), FrameworkError> { Ok(()) }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), FrameworkError>;
    fn on_delete(&self) -> Result<(), FrameworkError> { Ok(()) }

    // --- Action Handler ---

    /// Handle a custom domain-specific action
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, FrameworkError>;
}

/// Errors produced by the actor plumbing or returned by entity hooks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The entity refused the request; the message is shown to users as-is.
    #[error("{0}")]
    Rejected(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        query: T::Query,
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    /// Applies one action to several entities: either every target commits or none does.
    BulkAction {
        ids: Vec<T::Id>,
        action: T::Action,
        respond_to: Response<Vec<T::ActionResult>>,
    },
    Shutdown,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    pub async fn run(mut self) {
        let entity = std::any::type_name::<T>();
        info!(entity, "ResourceActor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let id = (self.next_id_fn)();
                    let result = T::from_create_params(id.clone(), params).and_then(|mut item| {
                        item.on_create()?;
                        self.store.insert(id.clone(), item);
                        Ok(id)
                    });
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::List { query, respond_to } => {
                    let items: Vec<T> = self.store.values()
                        .filter(|item| item.matches(&query))
                        .cloned()
                        .collect();
                    debug!(entity, count = items.len(), "Listed items");
                    let _ = respond_to.send(Ok(items));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let result = match self.store.get(&id) {
                        // Patch a copy so a rejected patch leaves the stored item intact.
                        Some(item) => {
                            let mut updated = item.clone();
                            updated.on_update(patch).map(|_| {
                                self.store.insert(id, updated.clone());
                                updated
                            })
                        }
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let result = match self.store.get(&id) {
                        Some(item) => item.on_delete().map(|_| {
                            self.store.remove(&id);
                        }),
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let result = match self.store.get(&id) {
                        Some(item) => {
                            let mut updated = item.clone();
                            updated.handle_action(action).map(|result| {
                                self.store.insert(id, updated);
                                result
                            })
                        }
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::BulkAction { ids, action, respond_to } => {
                    let result = self.apply_bulk(ids, action);
                    if let Err(e) = &result {
                        warn!(entity, error = %e, "Bulk action rolled back");
                    }
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Shutdown => {
                    info!(entity, "ResourceActor shutting down");
                    break;
                }
            }
        }
        info!(entity, "ResourceActor stopped");
    }

    /// Stages the action on copies of every target and commits only if all succeed.
    fn apply_bulk(&mut self, ids: Vec<T::Id>, action: T::Action) -> Result<Vec<T::ActionResult>, FrameworkError> {
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(ids.len());
        for id in ids.into_iter().filter(|id| seen.insert(id.clone())) {
            let mut item = self.store.get(&id)
                .cloned()
                .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;
            let result = item.handle_action(action.clone())?;
            staged.push((id, item, result));
        }

        let mut results = Vec::with_capacity(staged.len());
        for (id, item, result) in staged {
            self.store.insert(id, item);
            results.push(result);
        }
        Ok(results)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

// Manual impl: deriving would require `T: Clone` on top of the channel.
impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender.send(build(respond_to))
            .await.map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T::Id, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn list(&self, query: T::Query) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::List { query, respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }

    pub async fn perform_bulk_action(&self, ids: Vec<T::Id>, action: T::Action) -> Result<Vec<T::ActionResult>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::BulkAction { ids, action, respond_to }).await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.sender.send(ResourceRequest::Shutdown)
            .await.map_err(|_| FrameworkError::ActorClosed)
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    // --- Domain Definition ---

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: String,
        station: String,
        bumped: bool,
    }

    #[derive(Debug)]
    struct TicketCreate {
        station: String,
    }

    #[derive(Debug)]
    struct TicketPatch {
        station: Option<String>,
    }

    #[derive(Debug)]
    struct TicketQuery {
        station: String,
    }

    #[derive(Debug, Clone)]
    enum TicketAction {
        Bump,
    }

    impl Entity for Ticket {
        type Id = String;
        type CreateParams = TicketCreate;
        type Patch = TicketPatch;
        type Query = TicketQuery;
        type Action = TicketAction;
        type ActionResult = bool;

        fn id(&self) -> &String { &self.id }

        fn from_create_params(id: String, params: TicketCreate) -> Result<Self, FrameworkError> {
            if params.station.is_empty() {
                return Err(FrameworkError::Rejected("Station required".into()));
            }
            Ok(Self { id, station: params.station, bumped: false })
        }

        fn matches(&self, query: &TicketQuery) -> bool {
            self.station == query.station
        }

        fn on_update(&mut self, patch: TicketPatch) -> Result<(), FrameworkError> {
            if let Some(station) = patch.station {
                if station.is_empty() {
                    return Err(FrameworkError::Rejected("Station required".into()));
                }
                self.station = station;
            }
            Ok(())
        }

        fn handle_action(&mut self, action: TicketAction) -> Result<bool, FrameworkError> {
            match action {
                TicketAction::Bump => {
                    if self.bumped {
                        Err(FrameworkError::Rejected(format!("{} already bumped", self.id)))
                    } else {
                        self.bumped = true;
                        Ok(true)
                    }
                }
            }
        }
    }

    fn start() -> ResourceClient<Ticket> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("ticket_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::new(10, next_id);
        tokio::spawn(actor.run());
        client
    }

    fn grill() -> TicketCreate {
        TicketCreate { station: "grill".into() }
    }

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let client = start();

        let id = client.create(grill()).await.unwrap();
        assert_eq!(id, "ticket_1");

        let bumped = client.perform_action(id.clone(), TicketAction::Bump).await.unwrap();
        assert!(bumped);

        let ticket = client.get(id.clone()).await.unwrap().unwrap();
        assert!(ticket.bumped);

        let again = client.perform_action(id.clone(), TicketAction::Bump).await;
        assert_eq!(again, Err(FrameworkError::Rejected("ticket_1 already bumped".into())));
    }

    #[tokio::test]
    async fn test_create_rejected_by_entity() {
        let client = start();
        let result = client.create(TicketCreate { station: String::new() }).await;
        assert_eq!(result, Err(FrameworkError::Rejected("Station required".into())));
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_stored_item() {
        let client = start();
        let id = client.create(grill()).await.unwrap();

        let result = client.update(id.clone(), TicketPatch { station: Some(String::new()) }).await;
        assert!(result.is_err());

        let ticket = client.get(id).await.unwrap().unwrap();
        assert_eq!(ticket.station, "grill");
    }

    #[tokio::test]
    async fn test_list_filters_by_query() {
        let client = start();
        client.create(grill()).await.unwrap();
        client.create(TicketCreate { station: "fryer".into() }).await.unwrap();
        client.create(grill()).await.unwrap();

        let tickets = client.list(TicketQuery { station: "grill".into() }).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.station == "grill"));
    }

    #[tokio::test]
    async fn test_bulk_action_is_all_or_nothing() {
        let client = start();
        let a = client.create(grill()).await.unwrap();
        let b = client.create(grill()).await.unwrap();
        let c = client.create(grill()).await.unwrap();

        // b is already bumped, so bumping the whole set must fail and leave a and c untouched.
        client.perform_action(b.clone(), TicketAction::Bump).await.unwrap();
        let result = client.perform_bulk_action(vec![a.clone(), b.clone(), c.clone()], TicketAction::Bump).await;
        assert!(result.is_err());
        assert!(!client.get(a.clone()).await.unwrap().unwrap().bumped);
        assert!(!client.get(c.clone()).await.unwrap().unwrap().bumped);

        let results = client.perform_bulk_action(vec![a.clone(), c.clone(), a.clone()], TicketAction::Bump).await.unwrap();
        assert_eq!(results, vec![true, true]);
        assert!(client.get(a).await.unwrap().unwrap().bumped);
        assert!(client.get(c).await.unwrap().unwrap().bumped);
    }

    #[tokio::test]
    async fn test_bulk_action_unknown_id() {
        let client = start();
        let a = client.create(grill()).await.unwrap();

        let result = client.perform_bulk_action(vec![a.clone(), "ticket_99".into()], TicketAction::Bump).await;
        assert_eq!(result, Err(FrameworkError::NotFound("ticket_99".into())));
        assert!(!client.get(a).await.unwrap().unwrap().bumped);
    }

    #[tokio::test]
    async fn test_delete_and_shutdown() {
        let client = start();
        let id = client.create(grill()).await.unwrap();
        client.delete(id.clone()).await.unwrap();
        assert_eq!(client.get(id.clone()).await.unwrap(), None);
        assert_eq!(client.delete(id).await, Err(FrameworkError::NotFound("ticket_1".into())));

        client.shutdown().await.unwrap();
        tokio::task::yield_now().await;
        let result = client.get("ticket_1".into()).await;
        assert!(matches!(result, Err(FrameworkError::ActorClosed) | Err(FrameworkError::ActorDropped)));
    }
}
