mod poll_type;

pub use poll_type::{PollType, ResponseInput, TypeSpec};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PollError;

pub type PollId = i64;
pub type OptionId = i64;
pub type ResponseId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub poll_type: PollType,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Poll {
    /// A poll is expired once its expiration instant lies strictly in the past.
    /// Polls without an expiration never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }
}

/// A validated poll that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub title: String,
    pub poll_type: PollType,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewPoll {
    /// Validates the title and fixes the expiration instant relative to `now`.
    /// The instant is computed once here and never recomputed.
    pub fn new(
        title: &str,
        poll_type: PollType,
        expiration: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, PollError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PollError::validation("Poll title is required"));
        }

        Ok(Self {
            title: title.to_string(),
            poll_type,
            created_at: now,
            expires_at: expiration.expires_at(now)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub text: String,
    pub order: i64,
}

/// Finds an option by its exact label. Backends do not guarantee option
/// ordering, so position is never used for lookup.
pub fn option_by_label<'a>(options: &'a [PollOption], label: &str) -> Option<&'a PollOption> {
    options.iter().find(|option| option.text == label)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub poll_id: PollId,
    pub selected_option_id: Option<OptionId>,
    pub text_response: Option<String>,
    /// Categorical tag. For option polls a backend may fill this with the
    /// resolved option label; for free-text polls it is set by an external
    /// classifier, if any.
    pub answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a voter submits. Exactly one payload kind per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Choice(OptionId),
    Text(String),
}

impl ResponsePayload {
    pub fn selected_option_id(&self) -> Option<OptionId> {
        match self {
            ResponsePayload::Choice(id) => Some(*id),
            ResponsePayload::Text(_) => None,
        }
    }

    pub fn text_response(&self) -> Option<&str> {
        match self {
            ResponsePayload::Choice(_) => None,
            ResponsePayload::Text(text) => Some(text),
        }
    }
}

/// Days until a new poll closes, or no expiration at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpirationPolicy {
    #[default]
    Never,
    Days(u32),
}

/// Latest year a stored timestamp can carry and still read back as RFC 3339.
pub const MAX_EXPIRATION_YEAR: i32 = 9999;

impl ExpirationPolicy {
    /// The expiration instant for a poll created at `now`. Instants that
    /// overflow or fall after year 9999 are rejected.
    pub fn expires_at(self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, PollError> {
        match self {
            ExpirationPolicy::Never => Ok(None),
            ExpirationPolicy::Days(days) => now
                .checked_add_signed(Duration::days(i64::from(days)))
                .filter(|at| at.year() <= MAX_EXPIRATION_YEAR)
                .map(Some)
                .ok_or_else(|| PollError::validation("Invalid expiration")),
        }
    }
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpirationPolicy::Never => f.write_str("none"),
            ExpirationPolicy::Days(days) => write!(f, "{}d", days),
        }
    }
}

impl FromStr for ExpirationPolicy {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(ExpirationPolicy::Never);
        }

        let digits = s.strip_suffix('d').unwrap_or(s);
        digits
            .parse::<u32>()
            .map(ExpirationPolicy::Days)
            .map_err(|_| PollError::validation(format!("Invalid expiration: {}", s)))
    }
}
