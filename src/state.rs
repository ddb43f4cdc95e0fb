//! Shared application state for all routes.

use crate::dispatch::Dispatcher;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}
