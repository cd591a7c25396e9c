use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::Review;
use crate::transport::ReviewApi;

#[derive(Debug, Clone, PartialEq)]
pub enum ProductState {
    Loading,
    /// Backend had no rows for the id
    Empty,
    Ready(Vec<Review>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Fetched,
    /// Same id as the last completed load; no request made
    Unchanged,
    Failed,
}

/// Detail page for one clothing id
pub struct ProductView {
    api: Arc<dyn ReviewApi>,
    id: Option<u32>,
    state: ProductState,
}

impl ProductView {
    pub fn new(api: Arc<dyn ReviewApi>) -> Self {
        Self {
            api,
            id: None,
            state: ProductState::Loading,
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn state(&self) -> &ProductState {
        &self.state
    }

    /// Fetch rows for `id` once per identifier change. Failures are logged
    /// and leave the current state in place.
    pub async fn load(&mut self, id: u32) -> LoadOutcome {
        if self.id == Some(id) && self.state != ProductState::Loading {
            return LoadOutcome::Unchanged;
        }

        self.id = Some(id);
        self.state = ProductState::Loading;

        match self.api.get_by_id(id).await {
            Ok(rows) if rows.is_empty() => {
                warn!("No data found for product {}", id);
                self.state = ProductState::Empty;
                LoadOutcome::Fetched
            }
            Ok(rows) => {
                info!("Fetched {} review rows for product {}", rows.len(), id);
                self.state = ProductState::Ready(rows);
                LoadOutcome::Fetched
            }
            Err(e) => {
                error!("Error fetching product {}: {}", id, e);
                LoadOutcome::Failed
            }
        }
    }
}
