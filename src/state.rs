use std::sync::Arc;

use secrecy::SecretString;

use crate::db::Store;
use crate::enrich::Enricher;
use crate::riot::UpstreamProxy;

/// Shared handles injected into every handler as `web::Data<AppState>`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub proxy: Arc<UpstreamProxy>,
    pub enricher: Arc<Enricher>,
    /// HS256 secret for verifying session tokens.
    pub jwt_secret: Option<SecretString>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, proxy: Arc<UpstreamProxy>, enricher: Arc<Enricher>) -> Self {
        Self {
            store,
            proxy,
            enricher,
            jwt_secret: None,
        }
    }

    pub fn with_jwt_secret(mut self, secret: Option<SecretString>) -> Self {
        self.jwt_secret = secret;
        self
    }
}
