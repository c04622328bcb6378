//! Motion type classification
//!
//! Every per-type fact lives in one table. Adding a type is one enum variant
//! plus one row.

use crate::db::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Procedural motion types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    OpenMainList,
    ModerateCaucus,
    UnmoderatedCaucus,
    UnmoderatedDebate,
    RightOfQuery,
    BeginSpecialState,
    EndSpecialState,
    AdjournMeeting,
    DocumentReading,
    PersonalSpeech,
    Vote,
    RightOfReply,
}

struct Classification {
    kind: MotionType,
    name: &'static str,
    label: &'static str,
    spawns_list: bool,
}

/// Indexed by discriminant; rows must stay in declaration order.
const CLASSIFICATION: [Classification; 12] = [
    Classification {
        kind: MotionType::OpenMainList,
        name: "open_main_list",
        label: "Open Main Speakers List",
        spawns_list: true,
    },
    Classification {
        kind: MotionType::ModerateCaucus,
        name: "moderate_caucus",
        label: "Moderated Caucus",
        spawns_list: true,
    },
    Classification {
        kind: MotionType::UnmoderatedCaucus,
        name: "unmoderated_caucus",
        label: "Unmoderated Caucus",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::UnmoderatedDebate,
        name: "unmoderated_debate",
        label: "Unmoderated Debate",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::RightOfQuery,
        name: "right_of_query",
        label: "Right of Query",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::BeginSpecialState,
        name: "begin_special_state",
        label: "Begin Special State",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::EndSpecialState,
        name: "end_special_state",
        label: "End Special State",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::AdjournMeeting,
        name: "adjourn_meeting",
        label: "Adjourn Meeting",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::DocumentReading,
        name: "document_reading",
        label: "Document Reading",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::PersonalSpeech,
        name: "personal_speech",
        label: "Personal Speech",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::Vote,
        name: "vote",
        label: "Vote on Document",
        spawns_list: false,
    },
    Classification {
        kind: MotionType::RightOfReply,
        name: "right_of_reply",
        label: "Right of Reply",
        spawns_list: false,
    },
];

impl MotionType {
    fn classification(self) -> &'static Classification {
        &CLASSIFICATION[self as usize]
    }

    /// Wire and storage name
    pub fn as_str(self) -> &'static str {
        self.classification().name
    }

    /// Human-readable name for the board
    pub fn label(self) -> &'static str {
        self.classification().label
    }

    /// Whether passing this motion opens a fresh speaker list
    pub fn spawns_list(self) -> bool {
        self.classification().spawns_list
    }
}

impl FromStr for MotionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CLASSIFICATION
            .iter()
            .find(|c| c.name == s)
            .map(|c| c.kind)
            .ok_or_else(|| ParseEnumError::new("motion type", s))
    }
}
