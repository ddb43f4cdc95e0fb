//! Request-scoped values, passed explicitly through the dispatch call chain
//! rather than through ambient task-local state.

use crate::model::{Model, OperationKind};
use std::sync::Arc;

/// One per inbound request: the resolved model, the classified operation
/// kind, and the custom-route pattern (empty unless the kind is `Own`).
/// Created at the start of dispatch, dropped at the end; never persisted.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub model: Arc<Model>,
    pub kind: OperationKind,
    pub pattern: String,
}

impl RequestContext {
    pub fn new(model: Arc<Model>, kind: OperationKind) -> Self {
        RequestContext {
            model,
            kind,
            pattern: String::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}
