pub mod panel;

pub use panel::{PanelContent, ResultsPanel, Selection};

use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::{Poll, PollOption, PollType, Response};
use crate::tally::{answer_label, NO_ANSWER};

/// Responses listed before the "show more" control.
pub const DEFAULT_PREVIEW: usize = 5;

/// Newest first; responses sharing a timestamp keep submission order,
/// latest submission first.
pub fn sort_newest_first(responses: &mut [Response]) {
    responses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Individual responses with a collapsible tail.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseWindow {
    responses: Vec<Response>,
    preview: usize,
    expanded: bool,
}

impl ResponseWindow {
    pub fn new(mut responses: Vec<Response>, preview: usize) -> Self {
        sort_newest_first(&mut responses);
        Self {
            responses,
            preview,
            expanded: false,
        }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn visible(&self) -> &[Response] {
        if self.expanded {
            &self.responses
        } else {
            &self.responses[..self.responses.len().min(self.preview)]
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.responses.len() - self.visible().len()
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    /// Label for the show more/less control, absent when everything fits.
    pub fn toggle_label(&self) -> Option<String> {
        if self.responses.len() <= self.preview {
            return None;
        }
        if self.expanded {
            Some("Show Less".to_string())
        } else {
            Some(format!("Show More ({} more)", self.responses.len() - self.preview))
        }
    }

    pub fn header(&self) -> String {
        format!("Poll Results ({} responses)", self.responses.len())
    }
}

/// How a single response is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCard {
    pub text: String,
    /// Category tag shown beside free text when it differs from the text.
    pub badge: Option<String>,
}

pub fn response_card(poll_type: PollType, response: &Response, options: &[PollOption]) -> ResponseCard {
    if poll_type.is_choice() {
        return ResponseCard {
            text: answer_label(poll_type, response, options),
            badge: None,
        };
    }

    let body = response.text_response.as_deref().filter(|t| !t.trim().is_empty());
    let category = response.answer.as_deref().filter(|a| !a.is_empty());

    match (body, category) {
        (Some(body), Some(category)) if body != category => ResponseCard {
            text: body.to_string(),
            badge: Some(category.to_string()),
        },
        (Some(body), _) => ResponseCard {
            text: body.to_string(),
            badge: None,
        },
        (None, Some(category)) => ResponseCard {
            text: category.to_string(),
            badge: None,
        },
        (None, None) => ResponseCard {
            text: NO_ANSWER.to_string(),
            badge: None,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Expires(DateTime<Utc>),
    Expired(DateTime<Utc>),
}

pub fn expiry_status(poll: &Poll, now: DateTime<Utc>) -> Option<ExpiryStatus> {
    let at = poll.expires_at?;
    Some(if poll.is_expired(now) {
        ExpiryStatus::Expired(at)
    } else {
        ExpiryStatus::Expires(at)
    })
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryStatus::Expires(at) => write!(f, "Expires: {}", at.format("%Y-%m-%d")),
            ExpiryStatus::Expired(at) => write!(f, "Expired: {}", at.format("%Y-%m-%d")),
        }
    }
}
