use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::sync::Arc;

use crate::config::ViewSettings;
use crate::db::PollRepository;
use crate::error::{PollError, Result};
use crate::handlers::{AdminView, Notice, VoterView};
use crate::models::{ExpirationPolicy, Poll, PollId, PollType};
use crate::presentation::{expiry_status, response_card, PanelContent};

const SUBMITTED: &str = "Your poll response has been submitted.\n";

#[derive(Debug, Parser)]
#[command(name = "civic-polls", version, about = "Create, close and tally community polls")]
pub struct Cli {
    #[command(subcommand)]
    pub command: PollCommand,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum PollCommand {
    /// List all polls
    List,
    /// Create a new poll
    Create {
        /// The poll question
        #[arg(long)]
        title: String,
        /// yes_no, yes_no_maybe or short_answer
        #[arg(long = "type", default_value = "yes_no")]
        poll_type: PollType,
        /// Days until the poll closes (3, 7, 14, 30...) or "none"
        #[arg(long, default_value = "none")]
        days: ExpirationPolicy,
    },
    /// Close a poll now
    Expire { poll_id: PollId },
    /// Delete a poll with all its responses
    Delete { poll_id: PollId },
    /// Show a poll's results
    Results {
        poll_id: PollId,
        /// List every response instead of the newest few
        #[arg(long)]
        all: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Vote on a yes/no or yes/no/maybe poll
    Vote { poll_id: PollId, label: String },
    /// Answer a short-answer poll
    Answer { poll_id: PollId, text: String },
}

pub(super) fn render_poll_list(polls: &[Poll], now: DateTime<Utc>) -> String {
    if polls.is_empty() {
        return "No polls available at the moment.".to_string();
    }

    let mut out = String::new();
    for poll in polls {
        let _ = write!(
            out,
            "#{} {} [{}] Created: {}",
            poll.id,
            poll.title,
            poll.poll_type.display_name(),
            poll.created_at.format("%Y-%m-%d")
        );
        if let Some(status) = expiry_status(poll, now) {
            let _ = write!(out, " {}", status);
        }
        out.push('\n');
    }
    out
}

pub(super) fn render_results(content: &PanelContent) -> String {
    let mut out = String::new();
    let poll_type = content.summary.poll_type();

    let _ = writeln!(out, "{}\n", content.responses.header());
    let _ = writeln!(out, "{}", content.summary);

    if let Some(tally) = content.summary.tally() {
        match tally.chart() {
            Some(slices) => {
                let _ = writeln!(out, "\nChart:");
                for slice in slices {
                    let _ = writeln!(out, "  {} {} ({})", slice.label, slice.value, slice.color);
                }
            }
            None => {
                let _ = writeln!(out, "\nToo many distinct answers to chart; table only.");
            }
        }
    }

    if !content.responses.is_empty() {
        let heading = if poll_type.is_choice() { "Individual Responses" } else { "All Responses" };
        let _ = writeln!(out, "\n{}:", heading);
        for response in content.responses.visible() {
            let card = response_card(poll_type, response, &content.options);
            match card.badge {
                Some(badge) => {
                    let _ = writeln!(out, "- {} [{}]", card.text, badge);
                }
                None => {
                    let _ = writeln!(out, "- {}", card.text);
                }
            }
        }
        if let Some(label) = content.responses.toggle_label() {
            let _ = writeln!(out, "{}", label);
        }
    }

    out
}

pub(super) fn render_notices(notices: &[Notice]) -> String {
    notices.iter().map(|n| format!("warning: {}\n", n)).collect()
}

/// Runs one command against `repo`. Write commands go through the admin
/// view, votes through the voter view; each view fetches its own state.
pub async fn handle_poll_command(
    repo: Arc<dyn PollRepository>,
    settings: ViewSettings,
    command: PollCommand,
) -> Result<String> {
    match command {
        PollCommand::Vote { poll_id, label } => {
            let mut view = VoterView::new(repo);
            view.refresh().await;
            view.vote(poll_id, &label).await?;
            Ok(render_notices(&view.take_notices()) + SUBMITTED)
        }
        PollCommand::Answer { poll_id, text } => {
            let mut view = VoterView::new(repo);
            view.refresh().await;
            view.answer(poll_id, &text).await?;
            Ok(render_notices(&view.take_notices()) + SUBMITTED)
        }
        PollCommand::List => {
            let mut view = AdminView::new(repo, settings);
            view.refresh().await;
            let out = render_poll_list(view.polls(), Utc::now());
            Ok(render_notices(&view.take_notices()) + &out)
        }
        PollCommand::Create { title, poll_type, days } => {
            let mut view = AdminView::new(repo, settings);
            let poll = view.create_poll(&title, poll_type, days).await?;
            Ok(render_notices(&view.take_notices()) + &format!("Poll created successfully! (#{})\n", poll.id))
        }
        PollCommand::Expire { poll_id } => {
            let mut view = AdminView::new(repo, settings);
            view.expire_poll(poll_id).await?;
            Ok(render_notices(&view.take_notices()) + "Poll set to expired.\n")
        }
        PollCommand::Delete { poll_id } => {
            let mut view = AdminView::new(repo, settings);
            view.delete_poll(poll_id).await?;
            Ok(render_notices(&view.take_notices()) + "Poll deleted successfully.\n")
        }
        PollCommand::Results { poll_id, all, json } => {
            let mut view = AdminView::new(repo, settings);
            view.refresh().await;
            if view.toggle_results(poll_id).await.is_some() && all {
                view.toggle_show_more();
            }
            let out = match view.panel().content() {
                Some(content) if json => serde_json::to_string_pretty(&content.summary)
                    .map_err(|e| PollError::InvalidFormat(e.to_string()))?,
                Some(content) => render_results(content),
                None => return Err(PollError::NotFound(poll_id)),
            };
            Ok(render_notices(&view.take_notices()) + &out)
        }
    }
}
