use chrono::{DateTime, Utc};
use log::{error, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::Notice;
use crate::db::PollRepository;
use crate::error::{PollError, Result};
use crate::lifecycle::PollManager;
use crate::models::{option_by_label, Poll, PollId, PollOption, Response, ResponseInput};

/// What the voter screen offers for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VotingControls<'a> {
    /// Closed polls show a notice instead of controls.
    Expired,
    /// One button per vocabulary label, in vocabulary order.
    Choices(Vec<&'a PollOption>),
    TextEntry,
    /// Options have not arrived (or are incomplete) yet.
    Unavailable,
}

/// Voter screen: active polls, their options, and submission.
pub struct VoterView {
    manager: PollManager,
    polls: Vec<Poll>,
    options: HashMap<PollId, Vec<PollOption>>,
    notices: Vec<Notice>,
}

impl VoterView {
    pub fn new(repo: Arc<dyn PollRepository>) -> Self {
        Self {
            manager: PollManager::new(repo),
            polls: Vec::new(),
            options: HashMap::new(),
            notices: Vec::new(),
        }
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn options(&self, poll_id: PollId) -> Option<&[PollOption]> {
        self.options.get(&poll_id).map(Vec::as_slice)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Fetches the poll list, then every option poll's options at once.
    /// Options are stored as they arrive, in whatever order that is.
    pub async fn refresh(&mut self) {
        let repo = Arc::clone(self.manager.repository());

        self.polls = match repo.list_polls().await {
            Ok(polls) => polls,
            Err(e) => {
                warn!("Failed to fetch polls: {}", e);
                self.notices.push(Notice::new("Failed to fetch polls", e));
                Vec::new()
            }
        };
        self.options.clear();

        let mut pending = JoinSet::new();
        for poll in self.polls.iter().filter(|p| p.poll_type.is_choice()) {
            let repo = Arc::clone(&repo);
            let poll_id = poll.id;
            pending.spawn(async move { (poll_id, repo.get_options(poll_id).await) });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((poll_id, Ok(options))) => {
                    self.options.insert(poll_id, options);
                }
                Ok((poll_id, Err(e))) => {
                    warn!("Failed to fetch options for poll {}: {}", poll_id, e);
                    self.notices
                        .push(Notice::new(format!("Failed to fetch options for poll {}", poll_id), e));
                }
                Err(e) => error!("Options fetch task failed: {}", e),
            }
        }
    }

    pub fn controls(&self, poll: &Poll, now: DateTime<Utc>) -> VotingControls<'_> {
        if poll.is_expired(now) {
            return VotingControls::Expired;
        }

        match poll.poll_type.input() {
            ResponseInput::Text => VotingControls::TextEntry,
            ResponseInput::Choice => {
                let Some(options) = self.options.get(&poll.id) else {
                    return VotingControls::Unavailable;
                };
                let buttons: Option<Vec<&PollOption>> = poll
                    .poll_type
                    .vocabulary()
                    .iter()
                    .map(|label| option_by_label(options, label))
                    .collect();
                buttons.map_or(VotingControls::Unavailable, VotingControls::Choices)
            }
        }
    }

    pub async fn vote(&mut self, poll_id: PollId, label: &str) -> Result<Response> {
        let poll = self.poll(poll_id)?.clone();
        if !self.options.contains_key(&poll_id) {
            let options = self.manager.repository().get_options(poll_id).await?;
            self.options.insert(poll_id, options);
        }
        let options = self.options.get(&poll_id).map(Vec::as_slice).unwrap_or_default();

        self.manager.submit_choice(&poll, options, label).await
    }

    pub async fn answer(&mut self, poll_id: PollId, text: &str) -> Result<Response> {
        let poll = self.poll(poll_id)?;
        self.manager.submit_text(poll, text).await
    }

    fn poll(&self, poll_id: PollId) -> Result<&Poll> {
        self.polls
            .iter()
            .find(|p| p.id == poll_id)
            .ok_or(PollError::NotFound(poll_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryRepository, Op};
    use crate::db::Database;
    use crate::models::{ExpirationPolicy, PollType};
    use chrono::Duration;

    async fn seeded() -> (Arc<Database>, Vec<Poll>) {
        let db = Arc::new(Database::connect("sqlite::memory:").await.unwrap());
        let manager = PollManager::new(db.clone());
        let polls = vec![
            manager.create_poll("Approve budget?", PollType::Binary, ExpirationPolicy::Days(7)).await.unwrap(),
            manager.create_poll("New park?", PollType::Ternary, ExpirationPolicy::Never).await.unwrap(),
            manager.create_poll("Concerns?", PollType::FreeText, ExpirationPolicy::Never).await.unwrap(),
        ];
        (db, polls)
    }

    #[tokio::test]
    async fn refresh_loads_options_for_choice_polls() {
        let (db, polls) = seeded().await;
        let mut view = VoterView::new(db);
        view.refresh().await;

        assert_eq!(view.polls().len(), 3);
        assert_eq!(view.options(polls[0].id).map(|o| o.len()), Some(2));
        assert_eq!(view.options(polls[1].id).map(|o| o.len()), Some(3));
        assert_eq!(view.options(polls[2].id), None);
        assert!(view.take_notices().is_empty());
    }

    #[tokio::test]
    async fn controls_follow_type_and_expiry() {
        let (db, polls) = seeded().await;
        let mut view = VoterView::new(db);
        view.refresh().await;
        let now = Utc::now();

        match view.controls(&polls[1], now) {
            VotingControls::Choices(buttons) => {
                let labels: Vec<&str> = buttons.iter().map(|o| o.text.as_str()).collect();
                assert_eq!(labels, vec!["Yes", "No", "Maybe"]);
            }
            other => panic!("expected choices, got {:?}", other),
        }
        assert_eq!(view.controls(&polls[2], now), VotingControls::TextEntry);
        assert_eq!(view.controls(&polls[0], now + Duration::days(8)), VotingControls::Expired);
    }

    #[tokio::test]
    async fn vote_and_answer_submit_through_backend() {
        let (db, polls) = seeded().await;
        let mut view = VoterView::new(db.clone());
        view.refresh().await;

        view.vote(polls[0].id, "Yes").await.unwrap();
        view.answer(polls[2].id, "more bike lanes").await.unwrap();

        assert_eq!(db.get_responses(polls[0].id).await.unwrap().len(), 1);
        assert_eq!(
            db.get_responses(polls[2].id).await.unwrap()[0].text_response.as_deref(),
            Some("more bike lanes")
        );
        assert!(view.answer(polls[2].id, "  ").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn expired_poll_accepts_no_votes() {
        let (db, polls) = seeded().await;
        db.expire_poll(polls[0].id, Utc::now() - Duration::minutes(1)).await.unwrap();

        let mut view = VoterView::new(db.clone());
        view.refresh().await;
        let closed = view.polls().iter().find(|p| p.id == polls[0].id).unwrap();
        assert_eq!(view.controls(closed, Utc::now()), VotingControls::Expired);

        let err = view.vote(polls[0].id, "Yes").await.unwrap_err();
        assert!(err.is_validation());
        assert!(db.get_responses(polls[0].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_past_expiry_shows_expired_controls() {
        let repo = Arc::new(MemoryRepository::new());
        let now = Utc::now();
        repo.insert_poll(Poll {
            id: 1,
            title: "Old".into(),
            poll_type: PollType::Binary,
            created_at: now - Duration::days(10),
            expires_at: Some(now - Duration::days(3)),
        });

        let mut view = VoterView::new(repo.clone());
        view.refresh().await;
        assert_eq!(view.controls(&view.polls()[0].clone(), now), VotingControls::Expired);
        assert!(view.vote(1, "Yes").await.is_err());
        assert_eq!(repo.calls(Op::SubmitResponse), 0);
    }

    #[tokio::test]
    async fn missing_options_make_controls_unavailable() {
        let repo = Arc::new(MemoryRepository::new());
        let poll = PollManager::new(repo.clone())
            .create_poll("A", PollType::Binary, ExpirationPolicy::Never)
            .await
            .unwrap();
        repo.fail(Op::GetOptions, PollError::Network("offline".into()));

        let mut view = VoterView::new(repo.clone());
        view.refresh().await;

        assert_eq!(view.controls(&poll, Utc::now()), VotingControls::Unavailable);
        assert_eq!(view.take_notices().len(), 1);
        assert!(view.vote(poll.id, "Yes").await.is_err());
        assert_eq!(repo.response_count(), 0);
    }
}
