use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;

use crate::db::PollRepository;
use crate::error::{PollError, Result};
use crate::models::{
    option_by_label, ExpirationPolicy, NewPoll, Poll, PollId, PollOption, PollType, Response,
    ResponsePayload,
};
use crate::presentation::ResultsPanel;

/// Whether `poll` is past its expiration right now. Expired polls must not
/// offer voting controls.
pub fn is_expired(poll: &Poll) -> bool {
    poll.is_expired(Utc::now())
}

/// Creation, closing, deletion and submission rules for polls. Destructive
/// operations only touch local state after the backend confirms them.
#[derive(Clone)]
pub struct PollManager {
    repo: Arc<dyn PollRepository>,
}

impl PollManager {
    pub fn new(repo: Arc<dyn PollRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn PollRepository> {
        &self.repo
    }

    pub async fn create_poll(
        &self,
        title: &str,
        poll_type: PollType,
        expiration: ExpirationPolicy,
    ) -> Result<Poll> {
        let new_poll = NewPoll::new(title, poll_type, expiration, Utc::now())?;
        let poll = self.repo.create_poll(&new_poll).await?;

        // The poll is stored at this point; a failed read-back must not
        // make the caller retry the write.
        match self.repo.get_options(poll.id).await {
            Ok(options) => {
                if let Err(e) = check_vocabulary(&poll, &options) {
                    warn!("Created poll {} with incomplete options: {}", poll.id, e);
                }
            }
            Err(e) => warn!("Created poll {} but could not read back its options: {}", poll.id, e),
        }

        info!(
            "Created {} poll {} '{}' ({})",
            poll.poll_type.display_name(),
            poll.id,
            poll.title,
            expiration
        );
        Ok(poll)
    }

    /// Closes the poll as of now. Always sent to the backend, even when the
    /// poll already looks expired locally; the backend keeps the earlier
    /// instant if there is one.
    pub async fn expire_poll(&self, poll_id: PollId) -> Result<Poll> {
        let poll = self.repo.expire_poll(poll_id, Utc::now()).await?;
        info!("Expired poll {}", poll_id);
        Ok(poll)
    }

    /// Deletes the poll with its options and responses, then closes `panel`
    /// if it was showing that poll.
    pub async fn delete_poll(&self, poll_id: PollId, panel: &mut ResultsPanel) -> Result<()> {
        self.repo.delete_poll(poll_id).await?;
        if panel.clear_if(poll_id) {
            info!("Closed results panel for deleted poll {}", poll_id);
        }
        info!("Deleted poll {}", poll_id);
        Ok(())
    }

    /// Votes for the option whose label is exactly `label`.
    pub async fn submit_choice(&self, poll: &Poll, options: &[PollOption], label: &str) -> Result<Response> {
        ensure_open(poll)?;
        if !poll.poll_type.is_choice() {
            return Err(PollError::validation("This poll takes a written answer"));
        }
        let option = option_by_label(options, label)
            .ok_or_else(|| PollError::validation(format!("No option labelled '{}'", label)))?;

        self.repo
            .submit_response(poll.id, &ResponsePayload::Choice(option.id))
            .await
    }

    pub async fn submit_text(&self, poll: &Poll, text: &str) -> Result<Response> {
        ensure_open(poll)?;
        if poll.poll_type != PollType::FreeText {
            return Err(PollError::validation("This poll takes a selected option"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(PollError::validation("Please enter a response"));
        }

        self.repo
            .submit_response(poll.id, &ResponsePayload::Text(text.to_string()))
            .await
    }
}

fn ensure_open(poll: &Poll) -> Result<()> {
    if is_expired(poll) {
        return Err(PollError::validation("This poll has expired"));
    }
    Ok(())
}

/// Every label of the poll type's vocabulary must be present among `options`.
pub fn check_vocabulary(poll: &Poll, options: &[PollOption]) -> Result<()> {
    let missing: Vec<&str> = poll
        .poll_type
        .vocabulary()
        .iter()
        .copied()
        .filter(|label| option_by_label(options, label).is_none())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        error!("Poll {} is missing options: {}", poll.id, missing.join(", "));
        Err(PollError::InvalidFormat(format!(
            "Poll {} is missing options: {}",
            poll.id,
            missing.join(", ")
        )))
    }
}
