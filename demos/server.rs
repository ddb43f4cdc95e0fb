//! Example server: two registered models, one hook, one custom route, all
//! backed by an in-memory storage implementation.

use async_trait::async_trait;
use axum::http::Method;
use modelgate::{
    App, AppConfig, AppError, Filter, HookFn, HookPhase, Model, OperationKind, Record,
    RequestContext, RouteFn, Storage,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Default, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

#[derive(Default, Serialize, Deserialize)]
struct Book {
    id: i64,
    title: String,
}

/// Toy storage: rows per model name, id-keyed updates and deletes.
#[derive(Default)]
struct MemStorage {
    rows: Mutex<HashMap<String, Vec<Record>>>,
}

fn matches_filter(row: &Record, filter: &Filter) -> bool {
    let (Some(by), Some(value)) = (&filter.by, &filter.value) else {
        return true;
    };
    match row.get(by) {
        Some(Value::String(s)) => s == value,
        Some(other) => other.to_string() == *value,
        None => false,
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn add(&self, ctx: &RequestContext, record: Record) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let table = rows.entry(ctx.model.name().to_string()).or_default();
        match record {
            Value::Array(batch) => table.extend(batch),
            one => table.push(one),
        }
        Ok(())
    }

    async fn get_one(
        &self,
        ctx: &RequestContext,
        _record: Record,
        filter: &Filter,
    ) -> Result<Record, AppError> {
        let rows = self.rows.lock().unwrap();
        rows.get(ctx.model.name())
            .and_then(|table| table.iter().find(|row| matches_filter(row, filter)))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no matching {} row", ctx.model.name())))
    }

    async fn get_many(
        &self,
        ctx: &RequestContext,
        _record: Record,
        filter: &Filter,
    ) -> Result<Vec<Record>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(ctx.model.name())
            .map(|table| {
                table
                    .iter()
                    .filter(|row| matches_filter(row, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        update: Record,
        _current: Record,
        id: i64,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let table = rows.entry(ctx.model.name().to_string()).or_default();
        for row in table.iter_mut() {
            if row.get("id").and_then(Value::as_i64) == Some(id) {
                let mut next = update.clone();
                next["id"] = json!(id);
                *row = next;
                return Ok(());
            }
        }
        Err(AppError::NotFound(format!(
            "{} id {id} not found",
            ctx.model.name()
        )))
    }

    async fn delete(&self, ctx: &RequestContext, _record: Record, id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(table) = rows.get_mut(ctx.model.name()) {
            table.retain(|row| row.get("id").and_then(Value::as_i64) != Some(id));
        }
        Ok(())
    }

    async fn migrate(&self) -> Result<(), AppError> {
        tracing::info!("in-memory storage ready");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("modelgate=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;

    // Custom route: GET /api/user/own/hi fetches the user with id 1.
    let hi: RouteFn = Arc::new(|ctx, _req, storage| {
        Box::pin(async move {
            let filter = Filter {
                by: Some("id".into()),
                value: Some("1".into()),
                ..Filter::default()
            };
            let record = ctx.model.blank_record();
            storage.get_one(&ctx, record, &filter).await
        })
    });
    let user = Model::of::<User>("user").route(Method::GET, "hi", OperationKind::Own, hi);

    // Hook: untitled books get a placeholder before they hit storage.
    let default_title: HookFn = Arc::new(|_ctx, candidate, _storage| {
        let mut next = candidate.clone();
        Box::pin(async move {
            if next.get("title").and_then(Value::as_str) == Some("") {
                next["title"] = json!("untitled");
            }
            Ok(next)
        })
    });
    let book = Model::of::<Book>("book").hook(
        OperationKind::AddOne,
        HookPhase::BeforeStorage,
        default_title,
    );

    App::new(config)
        .with_storage(Arc::new(MemStorage::default()))
        .register_model(user)
        .register_model(book)
        .run()
        .await?;
    Ok(())
}
