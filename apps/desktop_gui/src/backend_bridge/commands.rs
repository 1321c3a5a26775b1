//! Backend commands queued from UI to backend worker.

use shared::domain::{FormField, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Refresh,
    SetField { field: FormField, value: String },
    BeginEdit { id: UserId },
    CancelEdit,
    Submit,
    /// Sent only after the user accepted the confirmation dialog.
    DeleteConfirmed { id: UserId },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::SetField { .. } => "set_field",
            Self::BeginEdit { .. } => "begin_edit",
            Self::CancelEdit => "cancel_edit",
            Self::Submit => "submit",
            Self::DeleteConfirmed { .. } => "delete_confirmed",
        }
    }
}
