//! # Endpoint Protocol
//!
//! Request and response shapes of the spreadsheet endpoint.
//!
//! ## Exchanges
//! ```text
//! ┌──────────┐                                         ┌──────────────┐
//! │  POS     │  GET  ?action=getMedicines               │  endpoint    │
//! │          │ ───────────────────────────────────────► │              │
//! │          │ ◄─────────────────────────────────────── │              │
//! │          │  { ok: true, data: [...] }               │              │
//! │          │                                         │              │
//! │          │  POST { action: "addMedicine", data }    │              │
//! │          │ ───────────────────────────────────────► │              │
//! │          │ ◄─────────────────────────────────────── │              │
//! │          │  { ok: true, id: "row-17" }              │              │
//! └──────────┘                                         └──────────────┘
//! ```
//!
//! Either direction may answer `{ ok: false, error: "..." }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::wire::{WireBill, WireMedicine, WireSettings};

// =============================================================================
// Reads
// =============================================================================

/// Collections the endpoint serves over GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadAction {
    GetMedicines,
    GetBills,
    GetSettings,
}

impl ReadAction {
    /// Value of the `action` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadAction::GetMedicines => "getMedicines",
            ReadAction::GetBills => "getBills",
            ReadAction::GetSettings => "getSettings",
        }
    }
}

impl std::fmt::Display for ReadAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Writes
// =============================================================================

/// A POST body. The `action` tag selects the operation.
///
/// ```json
/// { "action": "updateMedicine", "id": "m1", "data": { "id": "m1", ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WriteRequest {
    AddMedicine { data: WireMedicine },
    /// Always carries the whole medicine, not just the changed fields.
    UpdateMedicine { id: String, data: WireMedicine },
    DeleteMedicine { id: String },
    SaveBill { data: WireBill },
    SaveSettings { data: WireSettings },
}

impl WriteRequest {
    pub fn action(&self) -> &'static str {
        match self {
            WriteRequest::AddMedicine { .. } => "addMedicine",
            WriteRequest::UpdateMedicine { .. } => "updateMedicine",
            WriteRequest::DeleteMedicine { .. } => "deleteMedicine",
            WriteRequest::SaveBill { .. } => "saveBill",
            WriteRequest::SaveSettings { .. } => "saveSettings",
        }
    }

    /// Id of the record the request is about, if it has one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            WriteRequest::AddMedicine { data } => Some(&data.id),
            WriteRequest::UpdateMedicine { id, .. } | WriteRequest::DeleteMedicine { id } => {
                Some(id)
            }
            WriteRequest::SaveBill { data } => Some(&data.id),
            WriteRequest::SaveSettings { .. } => None,
        }
    }

    /// Rewrites medicine ids that the endpoint has since replaced.
    ///
    /// Used while replaying queued writes: an `addMedicine` earlier in the
    /// queue may have come back with the endpoint's own id.
    pub fn rename_medicine_ids(&mut self, renamed: &HashMap<String, String>) {
        let swap = |id: &mut String| {
            if let Some(new_id) = renamed.get(id.as_str()) {
                *id = new_id.clone();
            }
        };
        match self {
            WriteRequest::AddMedicine { data } => swap(&mut data.id),
            WriteRequest::UpdateMedicine { id, data } => {
                swap(id);
                swap(&mut data.id);
            }
            WriteRequest::DeleteMedicine { id } => swap(id),
            WriteRequest::SaveBill { data } => {
                for item in &mut data.items {
                    swap(&mut item.medicine_id);
                }
            }
            WriteRequest::SaveSettings { .. } => {}
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// The envelope every endpoint response is wrapped in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, deserialize_with = "crate::wire::lenient::opt_text")]
    pub id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of a successful POST.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResponse {
    /// Id the endpoint assigned, when it reports one.
    pub id: Option<String>,
}
