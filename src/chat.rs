use std::sync::Arc;
use tracing::{error, info};

use crate::models::{ERROR_TEXT, Message, NO_RESULTS_TEXT, RESULTS_TEXT};
use crate::session::ChatSession;
use crate::transport::ReviewApi;

/// Product cards appended per answer
pub const MAX_PRODUCTS_SHOWN: usize = 5;

/// How a `send` call ended. Carries no error: failures are already in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank query, nothing happened
    Ignored,
    NoResults,
    Results { shown: usize, total: usize },
    Failed,
}

/// Turns user queries into transcript mutations
pub struct ChatController {
    api: Arc<dyn ReviewApi>,
    session: ChatSession,
}

impl ChatController {
    pub fn new(api: Arc<dyn ReviewApi>, session: ChatSession) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Echo the query, show a typing placeholder, then replace it with results
    /// or an apology. `&mut self` keeps a second send from starting while the
    /// placeholder is outstanding.
    pub async fn send(&mut self, query: &str) -> SendOutcome {
        if query.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        self.session.push(Message::user(query)).await;
        self.session.push(Message::loading()).await;

        let result = self.api.search(query).await;
        self.session.remove_loading().await;

        let reviews = match result {
            Ok(reviews) => reviews,
            Err(e) => {
                error!("Chat search for {:?} failed: {}", query, e);
                self.session.push(Message::system(ERROR_TEXT)).await;
                return SendOutcome::Failed;
            }
        };

        if reviews.is_empty() {
            info!("Chat search for {:?} returned no results", query);
            self.session.push(Message::system(NO_RESULTS_TEXT)).await;
            return SendOutcome::NoResults;
        }

        self.session.push(Message::system(RESULTS_TEXT)).await;
        let shown = reviews.len().min(MAX_PRODUCTS_SHOWN);
        for review in reviews.iter().take(shown) {
            self.session.push(Message::product(review)).await;
        }

        info!(
            "Chat search for {:?} returned {} reviews, showing {}",
            query,
            reviews.len(),
            shown
        );
        SendOutcome::Results {
            shown,
            total: reviews.len(),
        }
    }

    /// Reset the transcript to the welcome message
    pub async fn clear(&mut self) {
        self.session.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SeekSenseError};
    use crate::models::{MessageKind, Review, WELCOME_TEXT};
    use crate::session::{MemoryTranscriptStore, TranscriptStore};
    use crate::transport::MockReviewApi;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn review(id: u32) -> Review {
        Review {
            clothing_id: id,
            title: format!("Title {id}"),
            review_text: format!("Review text {id}"),
            rating: 4.0,
            division_name: "General".to_string(),
            department_name: "Dresses".to_string(),
            class_name: "Dresses".to_string(),
            age: Some(30),
            recommended: Some(true),
            positive_feedback_count: Some(2),
        }
    }

    async fn controller_with(api: MockReviewApi) -> (ChatController, Arc<MemoryTranscriptStore>) {
        let store = Arc::new(MemoryTranscriptStore::new());
        let session = ChatSession::open(store.clone(), "chatMessages").await;
        (ChatController::new(Arc::new(api), session), store)
    }

    /// Records every saved transcript so intermediate states can be checked
    #[derive(Default)]
    struct RecordingStore {
        seed: Option<Vec<Message>>,
        snapshots: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl TranscriptStore for RecordingStore {
        async fn load(&self, _key: &str) -> Result<Option<Vec<Message>>> {
            Ok(self.seed.clone())
        }

        async fn save(&self, _key: &str, messages: &[Message]) -> Result<()> {
            self.snapshots
                .lock()
                .expect("Recording store mutex should not be poisoned")
                .push(messages.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_blank_queries_are_ignored() {
        let mut api = MockReviewApi::new();
        api.expect_search().times(0);
        let (mut chat, _) = controller_with(api).await;

        assert_eq!(chat.send("").await, SendOutcome::Ignored);
        assert_eq!(chat.send("   ").await, SendOutcome::Ignored);
        assert_eq!(chat.send("\t\n").await, SendOutcome::Ignored);
        assert_eq!(chat.session().messages(), &[Message::welcome()]);
    }

    #[tokio::test]
    async fn test_seven_results_are_capped_at_five_cards() {
        let mut api = MockReviewApi::new();
        api.expect_search()
            .withf(|q| q == "blue dress")
            .times(1)
            .returning(|_| Ok((1..=7).map(review).collect()));
        let (mut chat, _) = controller_with(api).await;

        let outcome = chat.send("blue dress").await;
        assert_eq!(outcome, SendOutcome::Results { shown: 5, total: 7 });

        let messages = chat.session().messages();
        // welcome, user, results, 5 cards
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[1], Message::user("blue dress"));
        assert_eq!(messages[2], Message::system(RESULTS_TEXT));
        let ids: Vec<u32> = messages[3..]
            .iter()
            .map(|m| match &m.kind {
                MessageKind::Product { clothing_id, .. } => *clothing_id,
                MessageKind::Plain => panic!("expected product card"),
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(messages[3].text, "Review text 1");
        assert!(messages.iter().all(|m| !m.loading));
    }

    #[tokio::test]
    async fn test_fewer_results_than_cap_are_all_shown() {
        let mut api = MockReviewApi::new();
        api.expect_search()
            .returning(|_| Ok(vec![review(10), review(20)]));
        let (mut chat, _) = controller_with(api).await;

        assert_eq!(
            chat.send("linen").await,
            SendOutcome::Results { shown: 2, total: 2 }
        );
        let products = chat
            .session()
            .messages()
            .iter()
            .filter(|m| m.is_product())
            .count();
        assert_eq!(products, 2);
    }

    #[tokio::test]
    async fn test_empty_response_adds_single_no_results_message() {
        let mut api = MockReviewApi::new();
        api.expect_search().returning(|_| Ok(Vec::new()));
        let (mut chat, _) = controller_with(api).await;

        assert_eq!(chat.send("zzz-no-match").await, SendOutcome::NoResults);
        let messages = chat.session().messages();
        assert_eq!(
            messages,
            &[
                Message::welcome(),
                Message::user("zzz-no-match"),
                Message::system(NO_RESULTS_TEXT),
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_adds_single_apology() {
        let mut api = MockReviewApi::new();
        api.expect_search().returning(|_| {
            Err(SeekSenseError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        });
        let (mut chat, _) = controller_with(api).await;

        assert_eq!(chat.send("blue").await, SendOutcome::Failed);
        let messages = chat.session().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], Message::system(ERROR_TEXT));
        assert!(!chat.session().has_pending());
    }

    #[tokio::test]
    async fn test_controller_stays_usable_after_failure() {
        let mut api = MockReviewApi::new();
        let mut calls = 0;
        api.expect_search().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(SeekSenseError::Internal("timeout".to_string()))
            } else {
                Ok(vec![review(1)])
            }
        });
        let (mut chat, _) = controller_with(api).await;

        assert_eq!(chat.send("first").await, SendOutcome::Failed);
        assert_eq!(
            chat.send("second").await,
            SendOutcome::Results { shown: 1, total: 1 }
        );
    }

    #[tokio::test]
    async fn test_placeholder_removed_before_any_reply() {
        let mut api = MockReviewApi::new();
        api.expect_search().returning(|_| Ok(vec![review(1), review(2)]));
        let store = Arc::new(RecordingStore::default());
        let session = ChatSession::open(store.clone(), "k").await;
        let mut chat = ChatController::new(Arc::new(api), session);

        chat.send("dress").await;

        let snapshots = store
            .snapshots
            .lock()
            .expect("Recording store mutex should not be poisoned")
            .clone();
        // user echo is the first save and carries no placeholder
        assert_eq!(snapshots[0].last(), Some(&Message::user("dress")));
        assert!(snapshots[0].iter().all(|m| !m.loading));
        // then the placeholder appears exactly once
        assert_eq!(snapshots[1].iter().filter(|m| m.loading).count(), 1);
        // and is gone in every later snapshot, before any reply is appended
        for snapshot in &snapshots[2..] {
            assert!(snapshot.iter().all(|m| !m.loading));
        }
        assert_eq!(snapshots[2].len(), snapshots[1].len() - 1);
    }

    #[tokio::test]
    async fn test_send_after_interrupted_request_keeps_one_placeholder() {
        let mut api = MockReviewApi::new();
        api.expect_search().returning(|_| Ok(Vec::new()));
        let store = Arc::new(RecordingStore {
            seed: Some(vec![
                Message::welcome(),
                Message::user("old"),
                Message::loading(),
            ]),
            ..Default::default()
        });
        let session = ChatSession::open(store.clone(), "k").await;
        let mut chat = ChatController::new(Arc::new(api), session);

        assert_eq!(chat.send("new").await, SendOutcome::NoResults);

        let snapshots = store
            .snapshots
            .lock()
            .expect("Recording store mutex should not be poisoned")
            .clone();
        for snapshot in &snapshots {
            assert!(snapshot.iter().filter(|m| m.loading).count() <= 1);
        }
        assert_eq!(
            chat.session().messages(),
            &[
                Message::welcome(),
                Message::user("old"),
                Message::user("new"),
                Message::system(NO_RESULTS_TEXT),
            ]
        );
        assert_eq!(
            chat.session().last_reply(),
            &[Message::system(NO_RESULTS_TEXT)]
        );
    }

    #[tokio::test]
    async fn test_clear_after_conversation() {
        let mut api = MockReviewApi::new();
        api.expect_search().returning(|_| Ok(vec![review(1)]));
        let (mut chat, store) = controller_with(api).await;

        chat.send("dress").await;
        assert!(chat.session().len() > 1);

        chat.clear().await;
        assert_eq!(chat.session().len(), 1);
        assert_eq!(chat.session().messages()[0].text, WELCOME_TEXT);

        let saved = store
            .load("chatMessages")
            .await
            .expect("load")
            .expect("saved");
        assert_eq!(saved, vec![Message::welcome()]);
    }

    #[tokio::test]
    async fn test_transcript_survives_reload() {
        let mut api = MockReviewApi::new();
        api.expect_search().returning(|_| Ok(vec![review(3)]));
        let (mut chat, store) = controller_with(api).await;
        chat.send("wool coat").await;
        let before = chat.session().messages().to_vec();

        let reopened = ChatSession::open(store, "chatMessages").await;
        assert_eq!(reopened.messages(), before.as_slice());
    }
}
