//! Storage abstraction consumed by the dispatcher. Backends implement this
//! trait; the crate never talks to a database directly.

use crate::context::RequestContext;
use crate::error::AppError;
use crate::model::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Query-string filter parameters. Semantics belong to the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Persistence contract. The handle is shared across all concurrent requests;
/// isolation is the backend's concern.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn add(&self, ctx: &RequestContext, record: Record) -> Result<(), AppError>;

    async fn get_one(
        &self,
        ctx: &RequestContext,
        record: Record,
        filter: &Filter,
    ) -> Result<Record, AppError>;

    async fn get_many(
        &self,
        ctx: &RequestContext,
        record: Record,
        filter: &Filter,
    ) -> Result<Vec<Record>, AppError>;

    /// Load the current row by `id` and apply `update`; the dispatcher does
    /// not fetch-then-merge itself.
    async fn update(
        &self,
        ctx: &RequestContext,
        update: Record,
        current: Record,
        id: i64,
    ) -> Result<(), AppError>;

    async fn delete(&self, ctx: &RequestContext, record: Record, id: i64) -> Result<(), AppError>;

    /// Runs once at startup, before the listener binds. Failure is fatal.
    async fn migrate(&self) -> Result<(), AppError>;
}
