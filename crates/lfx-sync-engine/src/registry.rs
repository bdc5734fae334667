//! Handler registry: key prefix → handler.
//!
//! Adding a record kind is one entry here plus one mapper.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handlers::{
    HandlerDeps, RecordHandler,
    committees::CommitteeHandler,
    meetings::{MeetingCommitteeHandler, MeetingHandler},
    members::CommitteeMemberHandler,
    past_meetings::{ParticipantHandler, PastMeetingHandler, RecordingHandler, SummaryHandler},
    projects::ProjectHandler,
    registrants::{MeetingRegistrantHandler, MeetingRsvpHandler},
    surveys::{SurveyHandler, SurveyResponseHandler},
    votes::{VoteHandler, VoteResponseHandler},
};

/// Routes events to handlers by the key's kind prefix.
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn RecordHandler>>,
}

impl HandlerRegistry {
    /// An empty registry, for assembling custom sets in tests.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The full production set: every record kind the worker syncs.
    pub fn standard(deps: &Arc<HandlerDeps>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ProjectHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(CommitteeHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(CommitteeMemberHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(MeetingHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(MeetingCommitteeHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(MeetingRegistrantHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(MeetingRsvpHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(PastMeetingHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(ParticipantHandler::invitees(Arc::clone(deps))));
        registry.register(Arc::new(ParticipantHandler::attendees(Arc::clone(deps))));
        registry.register(Arc::new(RecordingHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(SummaryHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(VoteHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(VoteResponseHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(SurveyHandler::new(Arc::clone(deps))));
        registry.register(Arc::new(SurveyResponseHandler::new(Arc::clone(deps))));
        registry
    }

    /// Registers a handler under its kind's prefix, replacing any
    /// previous entry.
    pub fn register(&mut self, handler: Arc<dyn RecordHandler>) {
        self.handlers.insert(handler.kind().prefix(), handler);
    }

    pub fn get(&self, prefix: &str) -> Option<&Arc<dyn RecordHandler>> {
        self.handlers.get(prefix)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
