//! Domain documents.

use crate::orm::Entity;
use crate::store::RecordRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generated piece of copy, optionally attributed to a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordRef>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<RecordRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyntheticText {
    pub fn new(text: impl Into<String>, persona: Option<RecordRef>) -> SyntheticText {
        let now = Utc::now();
        SyntheticText {
            id: None,
            text: text.into(),
            persona,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the document modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for SyntheticText {
    const TABLE: &'static str = "synthetictexts";
    const FIELDS: &'static [&'static str] = &["text", "persona", "created_at", "updated_at"];
    const REF_FIELDS: &'static [&'static str] = &["persona"];

    fn id(&self) -> Option<&RecordRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordRef) {
        self.id = Some(id);
    }
}

/// A writing voice: a tone plus standing instructions for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordRef>,
    pub name: String,
    pub tone: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        tone: impl Into<String>,
        description: impl Into<String>,
    ) -> Persona {
        Persona {
            id: None,
            name: name.into(),
            tone: tone.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for Persona {
    const TABLE: &'static str = "personas";
    const FIELDS: &'static [&'static str] = &["name", "tone", "description", "created_at"];

    fn id(&self) -> Option<&RecordRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordRef) {
        self.id = Some(id);
    }
}
