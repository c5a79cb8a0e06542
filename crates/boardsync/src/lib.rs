//! Synchronization layer for GitHub Projects (v2) boards.
//!
//! This crate reads and writes kanban boards, their items and the issues
//! behind them over the GitHub GraphQL API. It handles the parts that every
//! caller otherwise gets wrong: walking cursor-paginated connections, coercing
//! user-supplied strings into typed field values, collapsing many field
//! updates into one round trip, and retrying rate-limited requests.
//!
//! # Key Components
//!
//! - **Client**: [`Client`] exposes every board, field and issue operation
//! - **Pagination**: [`paginate`] walks a connection until exhausted or a limit is hit
//! - **Field values**: [`resolve`] turns a raw string into a [`ResolvedValue`] for a [`Field`]
//! - **Batching**: [`compile`] folds many [`ResolvedUpdate`]s into one mutation
//! - **Errors**: [`Error`] carries an [`ErrorKind`] through [`wrap_error`] context layers
//! - **Retry**: [`with_retry`] re-runs rate-limited operations on a [`RetryPolicy`]
//!
//! # Example
//!
//! ```ignore
//! use boardsync::{Client, ClientConfig, FieldUpdate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(&ClientConfig::from_env()?);
//! let project = client.get_project("octo-org", 3).await?;
//! let fields = client.get_project_fields(&project.id).await?;
//!
//! let updates = vec![
//!     FieldUpdate::new("PVTI_1", "Status", "Done"),
//!     FieldUpdate::new("PVTI_2", "Estimate", "5"),
//! ];
//! for result in client.batch_update_project_item_fields(&project.id, &updates, &fields).await? {
//!     println!("{} {}: {}", result.item_id, result.field_name, result.success);
//! }
//! # Ok(())
//! # }
//! ```

mod batch;
mod client;
mod config;
mod error;
mod fields;
mod model;
mod paginate;
mod queries;
mod retry;
mod transport;
mod types;

pub use batch::{BatchUpdateResult, CompiledBatch, FieldUpdate, ResolvedUpdate, compile, resolve_update};
pub use client::Client;
pub use config::{ClientConfig, ConfigError, DEFAULT_ENDPOINT, Feature};
pub use error::{Error, ErrorKind, classify, retry_after, wrap_error};
pub use fields::{
    Field, FieldDataType, FieldError, FieldOption, ProjectFieldValue, ResolvedValue, find_field,
    resolve,
};
pub use model::{
    FieldValue, Issue, IssueState, IssueStateFilter, Item, ItemFilter, Owner, OwnerKind, Project,
};
pub use paginate::{MAX_PAGE_SIZE, Page, PageInfo, page_size, paginate};
pub use retry::{DEFAULT_DELAYS, DEFAULT_MAX_RETRIES, DelaySchedule, RetryPolicy, with_retry};
pub use transport::{
    FEATURES_HEADER, GraphqlError, GraphqlRequest, HttpTransport, Transport, TransportError,
};
