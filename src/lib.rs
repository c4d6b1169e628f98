pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use {domain::notify::StatusNotifier, std::sync::Arc};

#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub notifier: Arc<dyn StatusNotifier>,
    pub webhook_secret: Arc<str>,
}
