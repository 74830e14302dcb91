//! Hypothesis client - reliable bulk operations against an annotation store.
//!
//! Wraps the Hypothes.is HTTP API with retrying requests, paginated search
//! (parallel offset pages or a sequential cursor walk) and bulk creation that
//! verifies every write actually landed on the eventually-consistent backend.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod retry;
pub mod transport;

pub use client::{order_annotations, CreationMode, HypothesisClient};
pub use config::{ApiConfig, ClientConfig, CreateConfig, DeleteConfig, SearchConfig};
pub use error::{ClientError, Result};
pub use models::{
    Annotation, DeleteResponse, Group, GroupUpdate, NewGroup, Profile, SearchPage, SearchQuery,
    SortField, SortOrder, PAGE_SIZE, PUBLIC_GROUP,
};
pub use progress::{Progress, ProgressSnapshot};
pub use retry::RetryPolicy;
pub use transport::{
    HttpRequest, HttpResponse, InMemoryTransport, ReqwestTransport, Transport, TransportError,
};
