//! The fixed publish subject table, grouped by record kind.

pub const INDEX_MEETING: &str = "lfx.index.v1_meeting";
pub const UPDATE_ACCESS_MEETING: &str = "lfx.update_access.v1_meeting";
pub const DELETE_ALL_ACCESS_MEETING: &str = "lfx.delete_all_access.v1_meeting";

pub const INDEX_MEETING_REGISTRANT: &str = "lfx.index.v1_meeting_registrant";
pub const PUT_REGISTRANT_MEETING: &str = "lfx.put_registrant.v1_meeting";
pub const REMOVE_REGISTRANT_MEETING: &str = "lfx.remove_registrant.v1_meeting";

pub const INDEX_MEETING_RSVP: &str = "lfx.index.v1_meeting_rsvp";

pub const INDEX_PAST_MEETING: &str = "lfx.index.v1_past_meeting";
pub const UPDATE_ACCESS_PAST_MEETING: &str = "lfx.update_access.v1_past_meeting";
pub const DELETE_ALL_ACCESS_PAST_MEETING: &str = "lfx.delete_all_access.v1_past_meeting";

pub const INDEX_PAST_MEETING_PARTICIPANT: &str = "lfx.index.v1_past_meeting_participant";
pub const PUT_PARTICIPANT_PAST_MEETING: &str = "lfx.put_participant.v1_past_meeting";

pub const INDEX_PAST_MEETING_RECORDING: &str = "lfx.index.v1_past_meeting_recording";
pub const UPDATE_ACCESS_PAST_MEETING_RECORDING: &str = "lfx.update_access.v1_past_meeting_recording";

pub const INDEX_PAST_MEETING_TRANSCRIPT: &str = "lfx.index.v1_past_meeting_transcript";
pub const UPDATE_ACCESS_PAST_MEETING_TRANSCRIPT: &str =
    "lfx.update_access.v1_past_meeting_transcript";

pub const INDEX_PAST_MEETING_SUMMARY: &str = "lfx.index.v1_past_meeting_summary";
pub const UPDATE_ACCESS_PAST_MEETING_SUMMARY: &str = "lfx.update_access.v1_past_meeting_summary";

pub const INDEX_VOTE: &str = "lfx.index.vote";
pub const INDEX_VOTE_RESPONSE: &str = "lfx.index.vote_response";

pub const INDEX_SURVEY: &str = "lfx.index.survey";
pub const INDEX_SURVEY_RESPONSE: &str = "lfx.index.survey_response";

pub const FGA_SYNC_UPDATE_ACCESS: &str = "lfx.fga-sync.update_access";
