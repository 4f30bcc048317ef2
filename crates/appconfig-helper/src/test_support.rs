//! Scripted service client shared by the unit tests.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ClientError, ConfigurationDataClient, LatestConfiguration, StartSessionRequest};

/// Builds a poll response.
pub(crate) fn latest(
    payload: &str,
    content_type: &str,
    next_token: &str,
    interval_secs: u64,
) -> LatestConfiguration {
    LatestConfiguration {
        next_poll_token: next_token.to_string(),
        next_poll_interval: Duration::from_secs(interval_secs),
        content_type: content_type.to_string(),
        payload: payload.as_bytes().to_vec(),
        version_label: Some("v1".to_string()),
    }
}

/// Replays queued responses and records every call it receives.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    sessions: Mutex<VecDeque<Result<String, ClientError>>>,
    polls: Mutex<VecDeque<Result<LatestConfiguration, ClientError>>>,
    session_requests: Mutex<Vec<StartSessionRequest>>,
    poll_tokens: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn push_session(&self, result: Result<String, ClientError>) {
        self.sessions.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_poll(&self, result: Result<LatestConfiguration, ClientError>) {
        self.polls.lock().unwrap().push_back(result);
    }

    pub(crate) fn session_requests(&self) -> Vec<StartSessionRequest> {
        self.session_requests.lock().unwrap().clone()
    }

    pub(crate) fn poll_tokens(&self) -> Vec<String> {
        self.poll_tokens.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.session_requests.lock().unwrap().len() + self.poll_tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl ConfigurationDataClient for ScriptedClient {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<String, ClientError> {
        self.session_requests.lock().unwrap().push(request.clone());
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected start_session call")
    }

    async fn get_latest_configuration(
        &self,
        token: &str,
    ) -> Result<LatestConfiguration, ClientError> {
        self.poll_tokens.lock().unwrap().push(token.to_string());
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected get_latest_configuration call")
    }
}
