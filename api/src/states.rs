use crate::{
    config::Config,
    repository::MemoryStore,
    services::{Accounts, Content, Likes, SocialGraph},
};
use std::sync::Arc;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Every service shares one `MemoryStore`; handlers only see the services.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub accounts: Arc<Accounts>,
    pub graph: Arc<SocialGraph>,
    pub content: Arc<Content>,
    pub likes: Arc<Likes>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());

        Self {
            accounts: Arc::new(Accounts::new(store.clone(), &config)),
            graph: Arc::new(SocialGraph::new(store.clone(), store.clone())),
            content: Arc::new(Content::new(
                store.clone(),
                store.clone(),
                config.post_max_length,
            )),
            likes: Arc::new(Likes::new(store.clone(), store)),
            config: Arc::new(config),
        }
    }
}
