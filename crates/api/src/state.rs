//! Application state shared across handlers.

use std::sync::Arc;

use crate::ai::ListingAssistant;
use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::auth::TokenSigner;
use crate::services::images::ImageStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// store, the token signer, the image store and the optional AI assistant.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    tokens: TokenSigner,
    images: ImageStore,
    assistant: Option<Arc<dyn ListingAssistant>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The token signer and image store are built from `config`. Pass
    /// `None` as the assistant to run without AI features.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn Store>,
        assistant: Option<Arc<dyn ListingAssistant>>,
    ) -> Self {
        let tokens = TokenSigner::new(&config.jwt_secret);
        let images = ImageStore::new(config.upload_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                images,
                assistant,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence layer.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the JWT signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Get a reference to the listing photo store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// The AI assistant, if one is configured.
    #[must_use]
    pub fn assistant(&self) -> Option<&dyn ListingAssistant> {
        self.inner.assistant.as_deref()
    }
}
