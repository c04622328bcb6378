//! API request and response types
//!
//! Requests arrive loosely typed (every field optional, enums as strings) and
//! are validated here into engine commands. The engine never sees a raw
//! payload.

use crate::db::{Attendance, CommitteeStatus, EntryStatus, Motion, MotionState, SpeakerListEntry};
use crate::floor::{
    CreateMotion, Direction, EntryEdit, FloorError, MotionTarget, MotionType, QueueEntry,
    RecordedMotion, SpeakerListSnapshot, SwitchList, Timing, VoteFlags,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

fn required<T>(value: Option<T>, field: &str) -> Result<T, FloorError> {
    value.ok_or_else(|| FloorError::validation(format!("{field} is required")))
}

fn parse_enum<T: FromStr>(value: &str, field: &str) -> Result<T, FloorError> {
    value
        .parse()
        .map_err(|_| FloorError::validation(format!("invalid {field}: {value}")))
}

// ==================== Requests ====================

/// Body of `POST /api/motions`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMotionRequest {
    pub committee_id: Option<i64>,
    pub committee_session_id: Option<i64>,
    pub motion_type: Option<String>,
    pub proposer_id: Option<i64>,
    pub unit_time_seconds: Option<u32>,
    pub total_time_seconds: Option<u32>,
    pub vote_required: Option<bool>,
    pub veto_applicable: Option<bool>,
    pub state: Option<String>,
    pub vote_result: Option<Value>,
    pub description: Option<String>,
}

impl CreateMotionRequest {
    pub fn into_command(self) -> Result<CreateMotion, FloorError> {
        let motion_type: MotionType =
            parse_enum(&required(self.motion_type, "motionType")?, "motionType")?;

        // An explicit session wins over the committee
        let target = match (self.committee_session_id, self.committee_id) {
            (Some(session_id), _) => MotionTarget::Session(session_id),
            (None, Some(committee_id)) => MotionTarget::Committee(committee_id),
            (None, None) => {
                return Err(FloorError::validation(
                    "committeeSessionId or committeeId is required",
                ))
            }
        };

        let state = match self.state.as_deref() {
            Some(state) => parse_enum(state, "state")?,
            None => MotionState::default(),
        };

        Ok(CreateMotion {
            target,
            motion_type,
            proposer_id: self.proposer_id,
            timing: Timing {
                unit_time_seconds: self.unit_time_seconds,
                total_time_seconds: self.total_time_seconds,
            },
            flags: VoteFlags {
                vote_required: self.vote_required.unwrap_or(false),
                veto_applicable: self.veto_applicable.unwrap_or(false),
            },
            state,
            vote_result: self.vote_result,
            description: self.description,
        })
    }
}

/// One entry edit inside `POST /api/motions/:motion_id/:list_id`
#[derive(Debug, Default, Deserialize)]
pub struct EntryEditPayload {
    pub id: Option<i64>,
    pub position: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSpeakerListRequest {
    pub entries: Option<Vec<EntryEditPayload>>,
}

impl UpdateSpeakerListRequest {
    pub fn into_edits(self) -> Result<Vec<EntryEdit>, FloorError> {
        required(self.entries, "entries")?
            .into_iter()
            .map(|payload| {
                let id = required(payload.id, "entries[].id")?;
                if let Some(position) = payload.position.filter(|&p| p < 1) {
                    return Err(FloorError::validation(format!(
                        "invalid entries[].position: {position}"
                    )));
                }
                let status = payload
                    .status
                    .as_deref()
                    .map(|s| parse_enum::<EntryStatus>(s, "entries[].status"))
                    .transpose()?;
                Ok(EntryEdit {
                    id,
                    position: payload.position,
                    status,
                })
            })
            .collect()
    }
}

/// `?committeeId=` on display reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeQuery {
    pub committee_id: Option<i64>,
}

/// Body of every display action that targets a committee
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeRequest {
    pub committee_id: Option<i64>,
}

/// Body of every display action that targets one speaker list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerListRequest {
    pub speaker_list_id: Option<i64>,
}

impl SpeakerListRequest {
    pub fn list_id(&self) -> Result<i64, FloorError> {
        required(self.speaker_list_id, "speakerListId")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSpeakerRequest {
    pub speaker_list_id: Option<i64>,
    pub delegate_id: Option<i64>,
}

impl AddSpeakerRequest {
    pub fn ids(&self) -> Result<(i64, i64), FloorError> {
        match (self.speaker_list_id, self.delegate_id) {
            (Some(list_id), Some(delegate_id)) => Ok((list_id, delegate_id)),
            _ => Err(FloorError::validation(
                "speakerListId and delegateId are required",
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSpeakerListRequest {
    pub committee_id: Option<i64>,
    pub direction: Option<String>,
    #[serde(alias = "deleteEmptyList")]
    pub delete_empty_list_id: Option<i64>,
}

impl SwitchSpeakerListRequest {
    pub fn into_command(self) -> Result<SwitchList, FloorError> {
        let committee_id = required(self.committee_id, "committeeId")?;
        let direction = match required(self.direction, "direction")?.as_str() {
            "prev" => Direction::Prev,
            "next" => Direction::Next,
            other => {
                return Err(FloorError::validation(format!(
                    "invalid direction: {other} (expected prev or next)"
                )))
            }
        };
        Ok(SwitchList {
            committee_id,
            direction,
            delete_empty_list_id: self.delete_empty_list_id,
        })
    }
}

/// Body of `POST /api/display/roll-call`: `{ delegateId: "present" | "absent" }`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollCallRequest {
    pub committee_id: Option<i64>,
    #[serde(default)]
    pub attendance: HashMap<String, String>,
}

impl RollCallRequest {
    /// Entries whose key is not an id or whose value is not an attendance
    /// status are dropped.
    pub fn into_parts(self) -> Result<(i64, HashMap<i64, Attendance>), FloorError> {
        let committee_id = required(self.committee_id, "committeeId")?;
        let attendance: HashMap<i64, Attendance> = self
            .attendance
            .into_iter()
            .filter_map(|(delegate_id, status)| {
                Some((delegate_id.parse().ok()?, status.parse().ok()?))
            })
            .collect();
        Ok((committee_id, attendance))
    }
}

// ==================== Responses ====================

#[derive(Debug, Serialize)]
pub struct MotionResponse {
    pub motion: Motion,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerListResponse {
    pub speaker_list: SpeakerListSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MotionHistoryResponse {
    pub items: Vec<RecordedMotion>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub entry: QueueEntry,
}

#[derive(Debug, Serialize)]
pub struct CommitteeStatusSummary {
    pub id: i64,
    pub status: CommitteeStatus,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub committee: CommitteeStatusSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSpeakerListResponse {
    pub success: bool,
    pub speaker_list_id: i64,
    pub current_index: usize,
    pub total_lists: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_speaker: Option<SpeakerListEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextSpeakerResponse {
    pub success: bool,
    pub speaker_queue: Vec<QueueEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
