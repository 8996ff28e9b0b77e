//! Scripted in-process repository for exercising view and lifecycle code
//! without a database, including failure injection per operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::PollRepository;
use crate::error::{PollError, Result};
use crate::models::{NewPoll, Poll, PollId, PollOption, Response, ResponsePayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListPolls,
    GetOptions,
    GetResponses,
    CreatePoll,
    ExpirePoll,
    DeletePoll,
    SubmitResponse,
}

#[derive(Default)]
struct State {
    polls: Vec<Poll>,
    options: Vec<PollOption>,
    responses: Vec<Response>,
    next_id: i64,
    failures: HashMap<Op, PollError>,
    calls: Vec<Op>,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to `op` fails with `err` until `heal` is called.
    pub fn fail(&self, op: Op, err: PollError) {
        self.state.lock().unwrap().failures.insert(op, err);
    }

    pub fn heal(&self, op: Op) {
        self.state.lock().unwrap().failures.remove(&op);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| **c == op).count()
    }

    pub fn insert_poll(&self, poll: Poll) {
        self.state.lock().unwrap().polls.push(poll);
    }

    pub fn insert_option(&self, option: PollOption) {
        self.state.lock().unwrap().options.push(option);
    }

    pub fn insert_response(&self, response: Response) {
        self.state.lock().unwrap().responses.push(response);
    }

    pub fn response_count(&self) -> usize {
        self.state.lock().unwrap().responses.len()
    }

    fn enter(&self, op: Op) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if let Some(err) = state.failures.get(&op).cloned() {
            return Err(err);
        }
        Ok(state)
    }
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn poll(&self, poll_id: PollId) -> Result<&Poll> {
        self.polls
            .iter()
            .find(|p| p.id == poll_id)
            .ok_or(PollError::NotFound(poll_id))
    }
}

#[async_trait]
impl PollRepository for MemoryRepository {
    async fn list_polls(&self) -> Result<Vec<Poll>> {
        let state = self.enter(Op::ListPolls)?;
        Ok(state.polls.clone())
    }

    async fn get_options(&self, poll_id: PollId) -> Result<Vec<PollOption>> {
        let state = self.enter(Op::GetOptions)?;
        state.poll(poll_id)?;
        Ok(state.options.iter().filter(|o| o.poll_id == poll_id).cloned().collect())
    }

    async fn get_responses(&self, poll_id: PollId) -> Result<Vec<Response>> {
        let state = self.enter(Op::GetResponses)?;
        state.poll(poll_id)?;
        let mut responses: Vec<Response> = state
            .responses
            .iter()
            .filter(|r| r.poll_id == poll_id)
            .cloned()
            .collect();
        responses.reverse();
        Ok(responses)
    }

    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll> {
        let mut state = self.enter(Op::CreatePoll)?;
        if poll.title.trim().is_empty() {
            return Err(PollError::validation("Poll title is required"));
        }
        let id = state.next_id();
        for (i, label) in poll.poll_type.vocabulary().iter().enumerate() {
            let option_id = state.next_id();
            state.options.push(PollOption {
                id: option_id,
                poll_id: id,
                text: label.to_string(),
                order: i as i64 + 1,
            });
        }
        let created = Poll {
            id,
            title: poll.title.clone(),
            poll_type: poll.poll_type,
            created_at: poll.created_at,
            expires_at: poll.expires_at,
        };
        state.polls.insert(0, created.clone());
        Ok(created)
    }

    async fn expire_poll(&self, poll_id: PollId, now: DateTime<Utc>) -> Result<Poll> {
        let mut state = self.enter(Op::ExpirePoll)?;
        let poll = state
            .polls
            .iter_mut()
            .find(|p| p.id == poll_id)
            .ok_or(PollError::NotFound(poll_id))?;
        if poll.expires_at.is_none_or(|at| at > now) {
            poll.expires_at = Some(now);
        }
        Ok(poll.clone())
    }

    async fn delete_poll(&self, poll_id: PollId) -> Result<()> {
        let mut state = self.enter(Op::DeletePoll)?;
        state.poll(poll_id)?;
        state.polls.retain(|p| p.id != poll_id);
        state.options.retain(|o| o.poll_id != poll_id);
        state.responses.retain(|r| r.poll_id != poll_id);
        Ok(())
    }

    async fn submit_response(&self, poll_id: PollId, payload: &ResponsePayload) -> Result<Response> {
        let mut state = self.enter(Op::SubmitResponse)?;
        state.poll(poll_id)?;
        let answer = payload.selected_option_id().and_then(|id| {
            state.options.iter().find(|o| o.id == id).map(|o| o.text.clone())
        });
        let response = Response {
            id: state.next_id(),
            poll_id,
            selected_option_id: payload.selected_option_id(),
            text_response: payload.text_response().map(str::to_string),
            answer,
            created_at: Utc::now(),
        };
        state.responses.push(response.clone());
        Ok(response)
    }
}
