use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

/// Well-known key under which the in-progress draft is persisted
pub const DRAFT_KEY: &str = "leadflow.draft";

/// The single client-local draft record: every field the two-step form
/// collects, plus the submission id once step one has succeeded.
/// Overwritten on every field change, cleared on successful completion.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadDraft {
    pub email: String,
    pub revenue: String,
    pub budget: String,
    pub website: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub referral_source: String,
    pub submission_id: Option<Uuid>,
}

/// Resumable draft persistence, independent of the storage medium backing it
pub trait DraftStore {
    fn save(&self, draft: &LeadDraft) -> anyhow::Result<()>;
    fn load(&self) -> anyhow::Result<Option<LeadDraft>>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Draft store over a shared in-memory key-value map.
/// Clones share the same slots, so a re-opened form sees the prior draft.
#[derive(Debug, Default, Clone)]
pub struct MemoryDraftStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, draft: &LeadDraft) -> anyhow::Result<()> {
        let json = serde_json::to_string(draft)?;
        self.slots
            .lock()
            .expect("draft store lock poisoned")
            .insert(DRAFT_KEY.to_string(), json);

        Ok(())
    }

    fn load(&self) -> anyhow::Result<Option<LeadDraft>> {
        let slots = self.slots.lock().expect("draft store lock poisoned");

        match slots.get(DRAFT_KEY) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.slots
            .lock()
            .expect("draft store lock poisoned")
            .remove(DRAFT_KEY);

        Ok(())
    }
}
