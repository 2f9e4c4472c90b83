use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// Reply phrases treated as offering a diagnosis.
///
/// This is a lexical heuristic, not a judgement about medical content.
pub const DIAGNOSIS_CUES: [&str; 5] = [
    "diagnosis",
    "you may have",
    "it appears",
    "likely cause",
    "seems like",
];

/// Returns `true` if `reply` contains any of [`DIAGNOSIS_CUES`], ignoring
/// case.
pub fn mentions_diagnosis(reply: &str) -> bool {
    let reply = reply.to_lowercase();
    DIAGNOSIS_CUES.iter().any(|cue| reply.contains(cue))
}

/// One patient message and the doctor reply to it, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub patient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
}

impl Turn {
    pub fn new(patient: impl Into<String>) -> Self {
        Self {
            patient: patient.into(),
            doctor: None,
        }
    }
}

/// The turn log of one conversation and its diagnosis latch.
///
/// The latch starts unset and, once set, stays set for the lifetime of the
/// session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    turns: Vec<Turn>,
    diagnosis_suggested: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from turns supplied by a caller.
    ///
    /// The latch is replayed over the doctor replies already in `turns`.
    pub fn from_history(turns: Vec<Turn>) -> Self {
        let diagnosis_suggested = turns
            .iter()
            .filter_map(|t| t.doctor.as_deref())
            .any(mentions_diagnosis);
        Self {
            turns,
            diagnosis_suggested,
        }
    }

    /// Appends a turn for `message` that has no reply yet.
    pub fn begin_turn(&mut self, message: &str) {
        self.turns.push(Turn::new(message));
    }

    /// Drops the last turn if it is still waiting for a reply.
    pub(crate) fn abandon_turn(&mut self) {
        if self.turns.last().is_some_and(|t| t.doctor.is_none()) {
            self.turns.pop();
        }
    }

    /// Attaches `reply` to the pending turn and updates the diagnosis latch.
    ///
    /// Returns `true` only when this reply is the first one in the session
    /// to suggest a diagnosis.
    pub fn attach_reply(&mut self, reply: &str) -> bool {
        match self.turns.last_mut() {
            Some(turn) if turn.doctor.is_none() => turn.doctor = Some(reply.to_string()),
            _ => self.turns.push(Turn {
                patient: String::new(),
                doctor: Some(reply.to_string()),
            }),
        }

        if self.diagnosis_suggested || !mentions_diagnosis(reply) {
            return false;
        }
        self.diagnosis_suggested = true;
        true
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The `limit` most recent turns, or all turns when `limit` is `0`.
    pub fn recent_turns(&self, limit: usize) -> &[Turn] {
        if limit == 0 || self.turns.len() <= limit {
            &self.turns
        } else {
            &self.turns[self.turns.len() - limit..]
        }
    }

    pub fn diagnosis_suggested(&self) -> bool {
        self.diagnosis_suggested
    }

    /// Renders the whole conversation for display.
    pub fn transcript(&self, patient_label: &str, doctor_label: &str) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            let _ = writeln!(out, "{patient_label}: {}", turn.patient);
            if let Some(doctor) = &turn.doctor {
                let _ = writeln!(out, "{doctor_label}: {doctor}");
                out.push('\n');
            }
        }
        out
    }
}
