use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("Cache service closed")]
    ServiceClosed,
    #[error("Cache service dropped the request")]
    ServiceDropped,
}

/// Failure of an optimistic mutation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimisticError<E> {
    /// The optimistic write never happened; the request was not sent.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The request failed and the optimistic write was rolled back.
    #[error("{0}")]
    Request(E),
}
