//! Usage event recorder.
//!
//! Telemetry never changes control flow: recording is infallible and a
//! disabled recorder silently drops events.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{config::Config, session::Session};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failure,
}

impl CommandOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub session_id: Option<String>,
    pub client_name: Option<String>,
    pub outcome: CommandOutcome,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub struct Telemetry {
    enabled: bool,
    capacity: usize,
    session: Arc<Session>,
    events: Mutex<VecDeque<TelemetryEvent>>,
}

impl Telemetry {
    pub fn create(session: Arc<Session>, config: &Config) -> Arc<Self> {
        Arc::new(Self::new(session, config.telemetry_enabled(), DEFAULT_CAPACITY))
    }

    pub fn new(session: Arc<Session>, enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity: capacity.max(1),
            session,
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn emit(
        &self,
        command: &str,
        session_id: Option<&str>,
        outcome: CommandOutcome,
        duration: Duration,
    ) {
        if !self.enabled {
            return;
        }

        let event = TelemetryEvent {
            timestamp: Utc::now(),
            command: command.to_string(),
            session_id: session_id.map(str::to_string),
            client_name: self.session.client_info().await.map(|client| client.name),
            outcome,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        };

        debug!(
            command = %event.command,
            session_id = event.session_id.as_deref().unwrap_or("-"),
            outcome = event.outcome.as_str(),
            duration_ms = event.duration_ms,
            "telemetry event recorded"
        );

        let mut events = self.events.lock().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub async fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::session::ClientInfo;

    use super::*;

    fn session() -> Arc<Session> {
        Arc::new(Session::new("https://api.example.com/", None))
    }

    #[tokio::test]
    async fn disabled_recorder_drops_events() {
        let telemetry = Telemetry::new(session(), false, 8);
        assert!(!telemetry.is_enabled());
        telemetry
            .emit("ping", Some("abc"), CommandOutcome::Success, Duration::ZERO)
            .await;

        assert!(telemetry.events().await.is_empty());
    }

    #[tokio::test]
    async fn buffer_drops_oldest_when_full() {
        let telemetry = Telemetry::new(session(), true, 2);
        for command in ["initialize", "ping", "tools/list"] {
            telemetry
                .emit(command, None, CommandOutcome::Success, Duration::ZERO)
                .await;
        }

        let commands: Vec<String> = telemetry
            .events()
            .await
            .into_iter()
            .map(|event| event.command)
            .collect();
        assert_eq!(commands, vec!["ping", "tools/list"]);
    }

    #[tokio::test]
    async fn events_carry_client_name() {
        let session = session();
        session
            .set_client_info(ClientInfo {
                name: "inspector".to_string(),
                version: "1.0.0".to_string(),
            })
            .await;
        let telemetry = Telemetry::new(session, true, 8);

        telemetry
            .emit(
                "ping",
                Some("abc"),
                CommandOutcome::Failure,
                Duration::from_millis(3),
            )
            .await;

        let events = telemetry.events().await;
        assert_eq!(events[0].client_name.as_deref(), Some("inspector"));
        assert_eq!(events[0].session_id.as_deref(), Some("abc"));
        assert_eq!(events[0].outcome, CommandOutcome::Failure);
        assert_eq!(events[0].duration_ms, 3);
    }
}
