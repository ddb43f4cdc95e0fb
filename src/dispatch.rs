//! Generic dispatch: resolve model and operation kind, clone the record
//! prototype, run the hook pipeline around the storage call.

use crate::context::RequestContext;
use crate::error::AppError;
use crate::hooks::run_hooks;
use crate::model::{overlay, HookPhase, OperationKind, Record};
use crate::registry::ModelRegistry;
use crate::storage::{Filter, Storage};
use axum::extract::Request;
use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;

/// Stateless per call; holds the shared registry and storage handle.
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    storage: Arc<dyn Storage>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ModelRegistry>, storage: Arc<dyn Storage>) -> Self {
        Dispatcher { registry, storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn resolve(&self, name: &str, kind: OperationKind) -> Result<RequestContext, AppError> {
        let model = self
            .registry
            .lookup(name)
            .cloned()
            .ok_or_else(|| AppError::BadRequest(format!("wrong path - unknown model '{name}'")))?;
        Ok(RequestContext::new(model, kind))
    }

    pub async fn get_one(&self, name: &str, filter: &Filter) -> Result<Record, AppError> {
        let ctx = self.resolve(name, OperationKind::GetOne)?;
        let record = ctx.model.blank_record();
        let record = run_hooks(&ctx, HookPhase::BeforeStorage, record, self.storage.as_ref()).await?;
        let resp = self
            .storage
            .get_one(&ctx, record.clone(), filter)
            .await
            .map_err(|e| {
                e.wrap(format!(
                    "storage get-one model '{name}' by {:?} value {:?}",
                    filter.by, filter.value
                ))
            })?;
        run_hooks(&ctx, HookPhase::AfterStorage, record, self.storage.as_ref()).await?;
        Ok(resp)
    }

    pub async fn get_many(&self, name: &str, filter: &Filter) -> Result<Vec<Record>, AppError> {
        let ctx = self.resolve(name, OperationKind::GetMany)?;
        let record = ctx.model.blank_record();
        let record = run_hooks(&ctx, HookPhase::BeforeStorage, record, self.storage.as_ref()).await?;
        let resp = self
            .storage
            .get_many(&ctx, record.clone(), filter)
            .await
            .map_err(|e| {
                e.wrap(format!(
                    "storage get-many model '{name}' by {:?} value {:?}",
                    filter.by, filter.value
                ))
            })?;
        run_hooks(&ctx, HookPhase::AfterStorage, record, self.storage.as_ref()).await?;
        Ok(resp)
    }

    pub async fn add_one(&self, name: &str, body: &[u8]) -> Result<(), AppError> {
        let ctx = self.resolve(name, OperationKind::AddOne)?;
        let record = ctx.model.decode_record(body)?;
        let record = run_hooks(&ctx, HookPhase::BeforeStorage, record, self.storage.as_ref()).await?;
        self.storage
            .add(&ctx, record.clone())
            .await
            .map_err(|e| e.wrap(format!("storage add model '{name}'")))?;
        run_hooks(&ctx, HookPhase::AfterStorage, record, self.storage.as_ref()).await?;
        Ok(())
    }

    /// Body is a JSON array; every element is decoded into its own fresh
    /// clone and the whole batch goes to storage in a single `add` call.
    pub async fn add_many(&self, name: &str, body: &[u8]) -> Result<(), AppError> {
        let ctx = self.resolve(name, OperationKind::AddMany)?;
        let decoded: Value =
            serde_json::from_slice(body).map_err(|e| AppError::internal("decode request body", e))?;
        let Value::Array(items) = decoded else {
            return Err(AppError::Internal(
                "decode request body: expected a JSON array".into(),
            ));
        };
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            records.push(overlay(ctx.model.blank_record(), item)?);
        }
        let record = Value::Array(records);
        let record = run_hooks(&ctx, HookPhase::BeforeStorage, record, self.storage.as_ref()).await?;
        self.storage
            .add(&ctx, record.clone())
            .await
            .map_err(|e| e.wrap(format!("storage add model '{name}'")))?;
        run_hooks(&ctx, HookPhase::AfterStorage, record, self.storage.as_ref()).await?;
        Ok(())
    }

    /// Two independent clones: one carries the decoded update payload, one is
    /// the blank current record the storage layer loads into by `id`.
    pub async fn update(&self, name: &str, id: i64, body: &[u8]) -> Result<(), AppError> {
        let ctx = self.resolve(name, OperationKind::Update)?;
        let update = ctx.model.decode_record(body)?;
        let current = ctx.model.blank_record();
        let current = run_hooks(&ctx, HookPhase::BeforeStorage, current, self.storage.as_ref()).await?;
        self.storage
            .update(&ctx, update, current.clone(), id)
            .await
            .map_err(|e| e.wrap(format!("storage update model '{name}' id {id}")))?;
        run_hooks(&ctx, HookPhase::AfterStorage, current, self.storage.as_ref()).await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str, kind: OperationKind, id: i64) -> Result<(), AppError> {
        debug_assert!(matches!(
            kind,
            OperationKind::DeleteOne | OperationKind::DeleteMany
        ));
        let ctx = self.resolve(name, kind)?;
        let record = ctx.model.blank_record();
        let record = run_hooks(&ctx, HookPhase::BeforeStorage, record, self.storage.as_ref()).await?;
        self.storage
            .delete(&ctx, record.clone(), id)
            .await
            .map_err(|e| e.wrap(format!("storage delete model '{name}' id {id}")))?;
        run_hooks(&ctx, HookPhase::AfterStorage, record, self.storage.as_ref()).await?;
        Ok(())
    }

    /// Custom-route dispatch: exact (method, pattern) lookup, then the
    /// handler runs with the raw request; hooks and generic storage calls are
    /// bypassed.
    pub async fn own(
        &self,
        name: &str,
        method: Method,
        pattern: &str,
        req: Request,
    ) -> Result<Record, AppError> {
        let ctx = self.resolve(name, OperationKind::Own)?.with_pattern(pattern);
        let route = ctx.model.custom_route(&method, pattern).ok_or_else(|| {
            AppError::NotFound(format!(
                "no custom route {method} '{pattern}' on model '{name}'"
            ))
        })?;
        let handler = route.handler.clone();
        handler(ctx, req, self.storage.clone())
            .await
            .map_err(|e| e.wrap(format!("custom route {method} '{pattern}' model '{name}'")))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("models", &self.registry.len())
            .finish_non_exhaustive()
    }
}
