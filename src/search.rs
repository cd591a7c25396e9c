use std::sync::Arc;
use tracing::{error, info};

use crate::display::truncate;
use crate::error::Result;
use crate::models::Review;
use crate::transport::ReviewApi;

/// Review text preview length in the results table
pub const TABLE_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Updated(usize),
    /// Error was logged; previous results are still on screen
    Failed,
}

/// One line of the dashboard table
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub clothing_id: u32,
    pub title: String,
    pub preview: String,
    pub rating: f32,
    pub division: String,
    pub department: String,
    pub class: String,
}

impl From<&Review> for ReviewRow {
    fn from(review: &Review) -> Self {
        Self {
            clothing_id: review.clothing_id,
            title: review.title.clone(),
            preview: truncate(&review.review_text, TABLE_PREVIEW_CHARS),
            rating: review.rating,
            division: review.division_name.clone(),
            department: review.department_name.clone(),
            class: review.class_name.clone(),
        }
    }
}

/// Search dashboard state: one query, one result list
pub struct SearchView {
    api: Arc<dyn ReviewApi>,
    query: String,
    results: Vec<Review>,
    loading: bool,
}

impl SearchView {
    pub fn new(api: Arc<dyn ReviewApi>) -> Self {
        Self {
            api,
            query: String::new(),
            results: Vec::new(),
            loading: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Review] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Run a search and replace the result list wholesale on success
    pub async fn search(&mut self, query: &str) -> SearchOutcome {
        self.begin(query);
        let result = self.api.search(query).await;
        self.finish(result)
    }

    fn begin(&mut self, query: &str) {
        self.query = query.to_string();
        self.loading = true;
    }

    fn finish(&mut self, result: Result<Vec<Review>>) -> SearchOutcome {
        self.loading = false;
        match result {
            Ok(reviews) => {
                info!(
                    "Search for {:?} returned {} reviews",
                    self.query,
                    reviews.len()
                );
                self.results = reviews;
                SearchOutcome::Updated(self.results.len())
            }
            Err(e) => {
                error!("Failed to fetch reviews for {:?}: {}", self.query, e);
                SearchOutcome::Failed
            }
        }
    }

    pub fn rows(&self) -> Vec<ReviewRow> {
        self.results.iter().map(ReviewRow::from).collect()
    }

    /// Result count banner, shown once a search has produced rows
    pub fn summary(&self) -> Option<String> {
        if self.loading || self.results.is_empty() {
            return None;
        }
        Some(format!("Found {} review(s).", self.results.len()))
    }
}
