//! Shared application state, threaded through every route as a plain
//! `AppState { db: Arc<Database>, ... }` handed to each router's
//! `.with_state`.

use std::sync::Arc;

use ptero_clients::{ForkClient, PetriClient, WebhookClient};
use ptero_storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub petri: PetriClient,
    pub fork: ForkClient,
    pub webhook: WebhookClient,
    /// This service's own externally reachable base URL, embedded in every
    /// notify callback URL the translator generates.
    pub self_base_url: String,
}
