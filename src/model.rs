//! Models: named record shapes plus their hook table and custom-route table.

use crate::context::RequestContext;
use crate::error::AppError;
use crate::storage::Storage;
use axum::extract::Request;
use axum::http::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A record in flight. Models describe their shape with a zero-value
/// prototype; every request works on its own clone.
pub type Record = Value;

/// What a request intends to do. `Wrong` is the classification failure value
/// and must never reach a storage call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OperationKind {
    #[default]
    Wrong,
    Own,
    All,
    GetOne,
    GetMany,
    AddOne,
    AddMany,
    Update,
    DeleteOne,
    DeleteMany,
}

impl OperationKind {
    /// Classify an operation token from the request path. An empty token is
    /// `Wrong`; an unrecognized nonempty token names a custom route (`Own`).
    pub fn classify(token: &str) -> OperationKind {
        match token {
            "" | "wrong" => OperationKind::Wrong,
            "own" => OperationKind::Own,
            "all" => OperationKind::All,
            "get-one" => OperationKind::GetOne,
            "get-many" => OperationKind::GetMany,
            "add-one" => OperationKind::AddOne,
            "add-many" => OperationKind::AddMany,
            "update" => OperationKind::Update,
            "delete-one" => OperationKind::DeleteOne,
            "delete-many" => OperationKind::DeleteMany,
            _ => OperationKind::Own,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Wrong => "wrong",
            OperationKind::Own => "own",
            OperationKind::All => "all",
            OperationKind::GetOne => "get-one",
            OperationKind::GetMany => "get-many",
            OperationKind::AddOne => "add-one",
            OperationKind::AddMany => "add-many",
            OperationKind::Update => "update",
            OperationKind::DeleteOne => "delete-one",
            OperationKind::DeleteMany => "delete-many",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a hook runs relative to the storage call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HookPhase {
    #[default]
    Unspecified,
    BeforeStorage,
    AfterStorage,
}

pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<Record, AppError>> + Send + 'a>>;

/// Hook callback: receives the request context, the current candidate record,
/// and the shared storage handle; returns the next candidate or aborts.
pub type HookFn =
    Arc<dyn for<'a> Fn(&'a RequestContext, &'a Record, &'a dyn Storage) -> HookFuture<'a> + Send + Sync>;

pub struct Hook {
    pub phase: HookPhase,
    pub kind: OperationKind,
    pub f: HookFn,
}

pub type RouteFuture = Pin<Box<dyn Future<Output = Result<Record, AppError>> + Send>>;

/// Custom-route handler: gets the context, the raw request, and the storage
/// handle; the generic hook/storage pipeline is bypassed entirely.
pub type RouteFn =
    Arc<dyn Fn(RequestContext, Request, Arc<dyn Storage>) -> RouteFuture + Send + Sync>;

pub struct CustomRoute {
    /// Informational; custom routes always dispatch as `Own`.
    pub kind: OperationKind,
    pub method: Method,
    pub pattern: String,
    pub handler: RouteFn,
}

/// Zero-value constructor for a model's record shape. Stored per model so
/// fresh instances never alias the prototype (or each other).
pub type RecordFactory = Arc<dyn Fn() -> Record + Send + Sync>;

/// A named, registered record shape plus its hooks and custom routes.
/// Built during configuration, immutable once the registry starts serving.
pub struct Model {
    name: String,
    factory: RecordFactory,
    hooks: HashMap<OperationKind, Hook>,
    routes: HashMap<Method, HashMap<String, CustomRoute>>,
}

impl Model {
    /// Model whose record shape is the zero value of `T`.
    pub fn of<T: Default + Serialize + 'static>(name: impl Into<String>) -> Self {
        Self::with_factory(
            name,
            Arc::new(|| serde_json::to_value(T::default()).unwrap_or(Value::Null)),
        )
    }

    pub fn with_factory(name: impl Into<String>, factory: RecordFactory) -> Self {
        let name = name.into();
        tracing::info!(model = %name, "model created");
        Model {
            name,
            factory,
            hooks: HashMap::new(),
            routes: HashMap::new(),
        }
    }

    /// Register a hook for an operation kind. At most one hook per kind; a
    /// later registration for the same kind replaces the earlier one.
    pub fn hook(mut self, kind: OperationKind, phase: HookPhase, f: HookFn) -> Self {
        tracing::info!(model = %self.name, kind = %kind, phase = ?phase, "hook registered");
        self.hooks.insert(kind, Hook { phase, kind, f });
        self
    }

    /// Register a custom route, reachable through the `own` operation kind.
    /// One handler per (method, pattern).
    pub fn route(
        mut self,
        method: Method,
        pattern: impl Into<String>,
        kind: OperationKind,
        handler: RouteFn,
    ) -> Self {
        let pattern = pattern.into();
        tracing::info!(model = %self.name, method = %method, pattern = %pattern, "custom route registered");
        self.routes.entry(method.clone()).or_default().insert(
            pattern.clone(),
            CustomRoute {
                kind,
                method,
                pattern,
                handler,
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fresh, independently owned zero-value instance of this model's shape.
    pub fn blank_record(&self) -> Record {
        (self.factory)()
    }

    pub fn hook_for(&self, kind: OperationKind) -> Option<&Hook> {
        self.hooks.get(&kind)
    }

    /// Exact-match lookup; pattern templating is the router's job.
    pub fn custom_route(&self, method: &Method, pattern: &str) -> Option<&CustomRoute> {
        self.routes.get(method).and_then(|m| m.get(pattern))
    }

    /// Decode a JSON body into a fresh clone of this model's shape.
    pub fn decode_record(&self, body: &[u8]) -> Result<Record, AppError> {
        let decoded: Value =
            serde_json::from_slice(body).map_err(|e| AppError::internal("decode request body", e))?;
        overlay(self.blank_record(), decoded)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Overlay a decoded body onto a blank prototype. Object shapes keep their
/// keys: known keys take the body's value, unknown body keys are dropped,
/// missing keys keep their zero value. Non-object shapes take the body as-is.
pub(crate) fn overlay(prototype: Record, body: Value) -> Result<Record, AppError> {
    match prototype {
        Value::Object(mut shape) => {
            let Value::Object(body) = body else {
                return Err(AppError::Internal(
                    "decode request body: expected a JSON object".into(),
                ));
            };
            for (key, value) in body {
                if let Some(slot) = shape.get_mut(&key) {
                    *slot = value;
                }
            }
            Ok(Value::Object(shape))
        }
        _ => Ok(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Default, Serialize, Deserialize)]
    struct Book {
        title: String,
        pages: u32,
    }

    #[test]
    fn classify_totality() {
        assert_eq!(OperationKind::classify(""), OperationKind::Wrong);
        assert_eq!(OperationKind::classify("wrong"), OperationKind::Wrong);
        assert_eq!(OperationKind::classify("get-one"), OperationKind::GetOne);
        assert_eq!(OperationKind::classify("get-many"), OperationKind::GetMany);
        assert_eq!(OperationKind::classify("add-one"), OperationKind::AddOne);
        assert_eq!(OperationKind::classify("add-many"), OperationKind::AddMany);
        assert_eq!(OperationKind::classify("update"), OperationKind::Update);
        assert_eq!(OperationKind::classify("delete-one"), OperationKind::DeleteOne);
        assert_eq!(OperationKind::classify("delete-many"), OperationKind::DeleteMany);
        assert_eq!(OperationKind::classify("all"), OperationKind::All);
        assert_eq!(OperationKind::classify("own"), OperationKind::Own);
        assert_eq!(
            OperationKind::classify("anything-unrecognized"),
            OperationKind::Own
        );
    }

    #[test]
    fn classify_round_trips_tokens() {
        for kind in [
            OperationKind::Own,
            OperationKind::All,
            OperationKind::GetOne,
            OperationKind::GetMany,
            OperationKind::AddOne,
            OperationKind::AddMany,
            OperationKind::Update,
            OperationKind::DeleteOne,
            OperationKind::DeleteMany,
        ] {
            assert_eq!(OperationKind::classify(kind.as_str()), kind);
        }
    }

    #[test]
    fn blank_records_do_not_alias() {
        let model = Model::of::<Book>("book");
        let mut a = model.blank_record();
        let b = model.blank_record();
        a["title"] = json!("changed");
        assert_eq!(b["title"], json!(""));
        assert_eq!(model.blank_record()["title"], json!(""));
    }

    #[test]
    fn decode_overlays_known_keys_only() {
        let model = Model::of::<Book>("book");
        let record = model
            .decode_record(br#"{"title":"X","author":"dropped"}"#)
            .unwrap();
        assert_eq!(record, json!({"title": "X", "pages": 0}));
    }

    #[test]
    fn decode_rejects_non_object_body_for_object_shape() {
        let model = Model::of::<Book>("book");
        let err = model.decode_record(b"[1,2]").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
