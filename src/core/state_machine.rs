//! State machine for tracking a publish run
//!
//! Runs are not resumable, so state lives in memory only. Every transition is
//! checked against the publish flow; an illegal one is an internal error.

use crate::core::error::{PublishError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Publishing state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    Init,
    Authenticated,
    Probed,
    ExistingPackagePath,
    NewPackagePath,
    VersionSet,
    Exported,
    DependenciesInstalled,
    MetadataWritten,
    Published,
    Failed,
    Cleaned,
}

impl PublishState {
    /// States that may directly follow this one
    pub fn successors(&self) -> &'static [PublishState] {
        use PublishState::*;

        match self {
            Init => &[Authenticated, Failed],
            Authenticated => &[Probed, Failed],
            Probed => &[ExistingPackagePath, NewPackagePath, Failed],
            ExistingPackagePath | NewPackagePath => &[VersionSet, Failed],
            VersionSet => &[Exported, Failed],
            Exported => &[DependenciesInstalled, Failed],
            DependenciesInstalled => &[MetadataWritten, Failed],
            MetadataWritten => &[Published, Failed],
            Published | Failed => &[Cleaned],
            Cleaned => &[],
        }
    }

    pub fn can_transition_to(&self, to: PublishState) -> bool {
        self.successors().contains(&to)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: PublishState,

    /// To state
    pub to: PublishState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// State machine for tracking the publish workflow
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    transitions: Vec<StateTransition>,
    started_at: DateTime<Utc>,
    error: Option<String>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: PublishState::Init,
            transitions: Vec::new(),
            started_at: Utc::now(),
            error: None,
        }
    }

    /// Transition to a new state
    pub fn transition(
        &mut self,
        to: PublishState,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<()> {
        if !self.current_state.can_transition_to(to) {
            return Err(PublishError::internal(format!(
                "illegal state transition {:?} → {:?}",
                self.current_state, to
            )));
        }

        log::info!("{:?} → {:?}", self.current_state, to);

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
            metadata,
        });
        self.current_state = to;

        Ok(())
    }

    /// Enter `Failed`, remembering the error message
    ///
    /// Does nothing when the run already failed or finished.
    pub fn fail(&mut self, error: &PublishError) {
        if !self.current_state.can_transition_to(PublishState::Failed) {
            return;
        }

        let message = error.to_string();
        let mut metadata = HashMap::new();
        metadata.insert("code".to_string(), serde_json::json!(error.code()));
        metadata.insert("error".to_string(), serde_json::json!(message));

        // Failed is a successor of every non-terminal step, checked above
        let _ = self.transition(PublishState::Failed, Some(metadata));
        self.error = Some(message);
    }

    /// Get current state
    pub fn get_state(&self) -> PublishState {
        self.current_state
    }

    /// Get last error
    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Milliseconds from creation to the last transition
    pub fn get_elapsed_time(&self) -> i64 {
        let end = self
            .transitions
            .last()
            .map(|t| t.timestamp)
            .unwrap_or(self.started_at);

        (end - self.started_at).num_milliseconds()
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let meta = if let Some(metadata) = &t.metadata {
                    format!(" ({})", serde_json::to_string(metadata).unwrap_or_default())
                } else {
                    String::new()
                };
                format!("{}: {:?} → {:?}{}", time, t.from, t.to, meta)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
