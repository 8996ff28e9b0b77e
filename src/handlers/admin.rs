use log::{info, warn};
use std::sync::Arc;

use super::Notice;
use crate::config::ViewSettings;
use crate::db::PollRepository;
use crate::error::{PollError, Result};
use crate::lifecycle::PollManager;
use crate::models::{ExpirationPolicy, Poll, PollId, PollType};
use crate::presentation::{PanelContent, ResponseWindow, ResultsPanel, Selection};
use crate::tally::summarize_fetched;

/// Admin screen: poll list, create/expire/delete, and a single results panel.
pub struct AdminView {
    manager: PollManager,
    settings: ViewSettings,
    polls: Vec<Poll>,
    panel: ResultsPanel,
    notices: Vec<Notice>,
}

impl AdminView {
    pub fn new(repo: Arc<dyn PollRepository>, settings: ViewSettings) -> Self {
        Self {
            manager: PollManager::new(repo),
            settings,
            polls: Vec::new(),
            panel: ResultsPanel::Closed,
            notices: Vec::new(),
        }
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn panel(&self) -> &ResultsPanel {
        &self.panel
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Re-fetches the canonical poll list. A failed fetch leaves an empty
    /// list and a notice.
    pub async fn refresh(&mut self) {
        match self.manager.repository().list_polls().await {
            Ok(polls) => self.polls = polls,
            Err(e) => {
                warn!("Failed to fetch polls: {}", e);
                self.polls.clear();
                self.notices.push(Notice::new("Failed to fetch polls", e));
            }
        }

        if let Some(selected) = self.panel.selected() {
            if !self.polls.iter().any(|p| p.id == selected) {
                self.panel.clear_if(selected);
            }
        }
    }

    pub async fn create_poll(
        &mut self,
        title: &str,
        poll_type: PollType,
        expiration: ExpirationPolicy,
    ) -> Result<Poll> {
        let poll = self.manager.create_poll(title, poll_type, expiration).await?;
        self.refresh().await;
        Ok(poll)
    }

    pub async fn expire_poll(&mut self, poll_id: PollId) -> Result<Poll> {
        let poll = self.manager.expire_poll(poll_id).await?;
        self.refresh().await;
        Ok(poll)
    }

    pub async fn delete_poll(&mut self, poll_id: PollId) -> Result<()> {
        self.manager.delete_poll(poll_id, &mut self.panel).await?;
        self.refresh().await;
        Ok(())
    }

    /// Shows `poll_id`'s results, or hides them if they are already shown.
    pub async fn toggle_results(&mut self, poll_id: PollId) -> Option<&PanelContent> {
        match self.panel.select(poll_id) {
            Selection::Closed => None,
            Selection::Load(poll_id) => {
                self.load_results(poll_id).await;
                self.panel.content()
            }
        }
    }

    /// Switches the open panel between the preview and all responses.
    pub fn toggle_show_more(&mut self) -> bool {
        match self.panel.content_mut() {
            Some(content) => {
                content.responses.toggle();
                content.responses.is_expanded()
            }
            None => false,
        }
    }

    async fn load_results(&mut self, poll_id: PollId) {
        let Some(poll_type) = self.polls.iter().find(|p| p.id == poll_id).map(|p| p.poll_type) else {
            self.panel.clear_if(poll_id);
            self.notices.push(Notice::new("Failed to fetch poll results", PollError::NotFound(poll_id)));
            return;
        };

        let repo = self.manager.repository();
        let options = if poll_type.is_choice() {
            match repo.get_options(poll_id).await {
                Ok(options) => options,
                Err(e) => {
                    warn!("Failed to fetch options for poll {}: {}", poll_id, e);
                    self.notices.push(Notice::new("Failed to fetch poll options", e));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let fetched = repo.get_responses(poll_id).await;
        let (summary, notice) =
            summarize_fetched(poll_type, fetched.as_deref(), &options, &self.settings.thresholds);
        let responses = fetched.unwrap_or_default();
        info!("Loaded {} responses for poll {}", responses.len(), poll_id);

        if let Some(e) = &notice {
            self.notices.push(Notice::new("Failed to fetch poll results", e.clone()));
        }

        self.panel.fill(PanelContent {
            poll_id,
            summary,
            responses: ResponseWindow::new(responses, self.settings.preview),
            options,
            notice,
        });
    }
}
