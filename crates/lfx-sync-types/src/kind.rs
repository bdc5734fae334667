//! Record kinds and their bucket key prefixes.
//!
//! Every key in the `v1-objects` bucket starts with a collection prefix
//! (`projects.sfid.P001`). The dispatcher routes on that prefix; the mapping
//! store keys use the singular kind name (`project.sfid.P001`).

use std::fmt::{self, Display};

/// The record kinds the worker synchronizes, enumerated and authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Project,
    Committee,
    CommitteeMember,
    Meeting,
    /// Meeting↔committee join records; mapping values are compound JSON.
    MeetingCommittee,
    MeetingRegistrant,
    /// Invite responses (RSVPs) to upcoming meetings.
    MeetingRsvp,
    PastMeeting,
    PastMeetingInvitee,
    PastMeetingAttendee,
    PastMeetingRecording,
    PastMeetingSummary,
    Vote,
    VoteResponse,
    Survey,
    SurveyResponse,
}

impl RecordKind {
    /// All kinds, in dispatch-registry order.
    pub const ALL: [RecordKind; 16] = [
        RecordKind::Project,
        RecordKind::Committee,
        RecordKind::CommitteeMember,
        RecordKind::Meeting,
        RecordKind::MeetingCommittee,
        RecordKind::MeetingRegistrant,
        RecordKind::MeetingRsvp,
        RecordKind::PastMeeting,
        RecordKind::PastMeetingInvitee,
        RecordKind::PastMeetingAttendee,
        RecordKind::PastMeetingRecording,
        RecordKind::PastMeetingSummary,
        RecordKind::Vote,
        RecordKind::VoteResponse,
        RecordKind::Survey,
        RecordKind::SurveyResponse,
    ];

    /// The collection prefix this kind occupies in the `v1-objects` bucket.
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Project => "projects",
            RecordKind::Committee => "committees",
            RecordKind::CommitteeMember => "committee_members",
            RecordKind::Meeting => "meetings",
            RecordKind::MeetingCommittee => "meeting_committees",
            RecordKind::MeetingRegistrant => "meeting_registrants",
            RecordKind::MeetingRsvp => "meeting_rsvps",
            RecordKind::PastMeeting => "past_meetings",
            RecordKind::PastMeetingInvitee => "past_meeting_invitees",
            RecordKind::PastMeetingAttendee => "past_meeting_attendees",
            RecordKind::PastMeetingRecording => "past_meeting_recordings",
            RecordKind::PastMeetingSummary => "past_meeting_summaries",
            RecordKind::Vote => "votes",
            RecordKind::VoteResponse => "vote_responses",
            RecordKind::Survey => "surveys",
            RecordKind::SurveyResponse => "survey_responses",
        }
    }

    /// The singular kind name used in mapping-store keys.
    pub fn mapping_kind(self) -> &'static str {
        match self {
            RecordKind::Project => "project",
            RecordKind::Committee => "committee",
            RecordKind::CommitteeMember => "committee_member",
            RecordKind::Meeting => "meeting",
            RecordKind::MeetingCommittee => "meeting_committees",
            RecordKind::MeetingRegistrant => "meeting_registrant",
            RecordKind::MeetingRsvp => "meeting_rsvp",
            RecordKind::PastMeeting => "past_meeting",
            RecordKind::PastMeetingInvitee => "past_meeting_invitee",
            RecordKind::PastMeetingAttendee => "past_meeting_attendee",
            RecordKind::PastMeetingRecording => "past_meeting_recording",
            RecordKind::PastMeetingSummary => "past_meeting_summary",
            RecordKind::Vote => "vote",
            RecordKind::VoteResponse => "vote_response",
            RecordKind::Survey => "survey",
            RecordKind::SurveyResponse => "survey_response",
        }
    }

    /// Resolves a bucket key prefix back to its kind.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.prefix() == prefix)
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mapping_kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_prefix(kind.prefix()), Some(kind));
        }
    }

    #[test]
    fn unknown_prefix_is_none() {
        assert_eq!(RecordKind::from_prefix("gadgets"), None);
        assert_eq!(RecordKind::from_prefix(""), None);
    }

    #[test]
    fn prefixes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for kind in RecordKind::ALL {
            assert!(seen.insert(kind.prefix()), "duplicate prefix {}", kind.prefix());
        }
    }

    #[test]
    fn display_uses_mapping_kind() {
        assert_eq!(RecordKind::Project.to_string(), "project");
        assert_eq!(RecordKind::PastMeetingAttendee.to_string(), "past_meeting_attendee");
    }
}
