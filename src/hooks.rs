//! Hook pipeline: per-model callbacks gating the storage call.

use crate::context::RequestContext;
use crate::error::AppError;
use crate::model::{HookPhase, OperationKind, Record};
use crate::storage::Storage;

/// Run the hooks registered for the request's operation kind in the given
/// phase. Evaluation order is deterministic: the catch-all `All` hook first
/// (its output replaces the candidate), then the kind-specific hook with the
/// current candidate. Any hook error aborts the pipeline; the caller must not
/// proceed to the storage call.
pub async fn run_hooks(
    ctx: &RequestContext,
    phase: HookPhase,
    candidate: Record,
    storage: &dyn Storage,
) -> Result<Record, AppError> {
    let mut candidate = candidate;

    if let Some(all) = ctx.model.hook_for(OperationKind::All) {
        if all.phase == phase {
            candidate = (all.f)(ctx, &candidate, storage)
                .await
                .map_err(|e| e.wrap("catch-all hook"))?;
        }
    }

    if ctx.kind != OperationKind::All {
        if let Some(hook) = ctx.model.hook_for(ctx.kind) {
            if hook.phase == phase {
                candidate = (hook.f)(ctx, &candidate, storage)
                    .await
                    .map_err(|e| e.wrap(format!("{} hook", ctx.kind)))?;
            }
        }
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HookFn, Model};
    use crate::storage::Filter;
    use async_trait::async_trait;
    use serde::Serialize;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Serialize)]
    struct Item {
        tag: String,
    }

    struct NullStorage;

    #[async_trait]
    impl Storage for NullStorage {
        async fn add(&self, _: &RequestContext, _: Record) -> Result<(), AppError> {
            Ok(())
        }
        async fn get_one(&self, _: &RequestContext, r: Record, _: &Filter) -> Result<Record, AppError> {
            Ok(r)
        }
        async fn get_many(
            &self,
            _: &RequestContext,
            _: Record,
            _: &Filter,
        ) -> Result<Vec<Record>, AppError> {
            Ok(Vec::new())
        }
        async fn update(&self, _: &RequestContext, _: Record, _: Record, _: i64) -> Result<(), AppError> {
            Ok(())
        }
        async fn delete(&self, _: &RequestContext, _: Record, _: i64) -> Result<(), AppError> {
            Ok(())
        }
        async fn migrate(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn tagging_hook(log: Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> HookFn {
        Arc::new(move |_ctx, candidate, _storage| {
            let log = log.clone();
            let mut next = candidate.clone();
            Box::pin(async move {
                log.lock().unwrap().push(label);
                let tag = format!("{}+{}", next["tag"].as_str().unwrap_or(""), label);
                next["tag"] = json!(tag);
                Ok(next)
            })
        })
    }

    #[tokio::test]
    async fn catch_all_runs_before_specific_and_chains_candidate() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let model = Model::of::<Item>("item")
            .hook(
                OperationKind::All,
                HookPhase::BeforeStorage,
                tagging_hook(log.clone(), "all"),
            )
            .hook(
                OperationKind::GetOne,
                HookPhase::BeforeStorage,
                tagging_hook(log.clone(), "get-one"),
            );
        let ctx = RequestContext::new(Arc::new(model), OperationKind::GetOne);
        let out = run_hooks(
            &ctx,
            HookPhase::BeforeStorage,
            ctx.model.blank_record(),
            &NullStorage,
        )
        .await
        .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["all", "get-one"]);
        assert_eq!(out["tag"], json!("+all+get-one"));
    }

    #[tokio::test]
    async fn phase_mismatch_leaves_candidate_untouched() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let model = Model::of::<Item>("item").hook(
            OperationKind::GetOne,
            HookPhase::AfterStorage,
            tagging_hook(log.clone(), "after"),
        );
        let ctx = RequestContext::new(Arc::new(model), OperationKind::GetOne);
        let blank = ctx.model.blank_record();
        let out = run_hooks(&ctx, HookPhase::BeforeStorage, blank.clone(), &NullStorage)
            .await
            .unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(out, blank);
    }

    #[tokio::test]
    async fn catch_all_failure_skips_specific_hook() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing: HookFn = Arc::new(|_ctx, _candidate, _storage| {
            Box::pin(async { Err(AppError::Forbidden("denied".into())) })
        });
        let model = Model::of::<Item>("item")
            .hook(OperationKind::All, HookPhase::BeforeStorage, failing)
            .hook(
                OperationKind::GetOne,
                HookPhase::BeforeStorage,
                tagging_hook(log.clone(), "get-one"),
            );
        let ctx = RequestContext::new(Arc::new(model), OperationKind::GetOne);
        let err = run_hooks(
            &ctx,
            HookPhase::BeforeStorage,
            ctx.model.blank_record(),
            &NullStorage,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
        assert!(log.lock().unwrap().is_empty());
    }
}
