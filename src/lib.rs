//! Modelgate: model-registry-driven REST dispatch library.
//!
//! Register models (record shapes) once at startup and get CRUD-style routes
//! over an abstract storage backend, with per-model hook pipelines and fully
//! custom routes.

pub mod app;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod model;
pub mod queue;
pub mod registry;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;

pub use app::App;
pub use config::{AppConfig, BrokerConfig, CorsConfig, HttpConfig};
pub use context::RequestContext;
pub use dispatch::Dispatcher;
pub use error::{AppError, ConfigError};
pub use hooks::run_hooks;
pub use model::{
    CustomRoute, Hook, HookFn, HookPhase, Model, OperationKind, Record, RecordFactory, RouteFn,
};
pub use queue::{MessageBroker, Messaging, PublishFn, SubscribeFn};
pub use registry::ModelRegistry;
pub use routes::{api_routes, common_routes, cors_layer};
pub use state::AppState;
pub use storage::{Filter, Storage};
