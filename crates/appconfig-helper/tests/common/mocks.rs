//! In-memory stand-in for the configuration data service.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use appconfig_helper::{ClientError, ConfigurationDataClient, LatestConfiguration, StartSessionRequest};

/// Builds a poll response without a version label.
pub fn response(payload: &[u8], content_type: &str, next_token: &str, interval_secs: u64) -> LatestConfiguration {
    LatestConfiguration {
        next_poll_token: next_token.to_string(),
        next_poll_interval: Duration::from_secs(interval_secs),
        content_type: content_type.to_string(),
        payload: payload.to_vec(),
        version_label: None,
    }
}

/// Mock service replaying queued responses; records each call.
#[derive(Default)]
pub struct MockService {
    session_tokens: Mutex<VecDeque<String>>,
    responses: Mutex<VecDeque<LatestConfiguration>>,
    sessions_started: Mutex<Vec<StartSessionRequest>>,
    polled_tokens: Mutex<Vec<String>>,
}

impl MockService {
    pub fn with_session(token: &str) -> Self {
        let service = Self::default();
        service.session_tokens.lock().unwrap().push_back(token.to_string());
        service
    }

    pub fn respond(&self, response: LatestConfiguration) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn sessions_started(&self) -> Vec<StartSessionRequest> {
        self.sessions_started.lock().unwrap().clone()
    }

    pub fn polled_tokens(&self) -> Vec<String> {
        self.polled_tokens.lock().unwrap().clone()
    }

    pub fn network_calls(&self) -> usize {
        self.sessions_started.lock().unwrap().len() + self.polled_tokens.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ConfigurationDataClient for MockService {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<String, ClientError> {
        self.sessions_started.lock().unwrap().push(request.clone());
        self.session_tokens
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::BadRequest("no session scripted".to_string()))
    }

    async fn get_latest_configuration(
        &self,
        token: &str,
    ) -> Result<LatestConfiguration, ClientError> {
        self.polled_tokens.lock().unwrap().push(token.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::BadRequest("no response scripted".to_string()))
    }
}
