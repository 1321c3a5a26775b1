//! Display copy and per-frame view model shared by the console and GUI front ends.

use shared::domain::{UserId, UserRecord};

use crate::controller::ControllerSnapshot;

pub const GREETING: &str = "Welcome to the front-end application";
pub const LIST_HEADING: &str = "User List";
pub const LOADING_COPY: &str = "Loading...";
pub const EMPTY_COPY: &str = "No users found.";
pub const NAME_LABEL: &str = "Name";
pub const EMAIL_LABEL: &str = "Email";
pub const CANCEL_LABEL: &str = "Cancel";
pub const EDIT_LABEL: &str = "Edit";
pub const DELETE_LABEL: &str = "Delete";

const CREATE_HEADING: &str = "Register User";
const EDIT_HEADING: &str = "Edit User";
const CREATE_SUBMIT: &str = "Register";
const UPDATE_SUBMIT: &str = "Update";
const BUSY_SUBMIT: &str = "Processing...";

pub fn delete_prompt(record: &UserRecord) -> String {
    format!("Delete {}?", record.name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    pub cancel_visible: bool,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub badge: String,
}

impl RecordRow {
    pub fn summary(&self) -> String {
        format!("{} ({})", self.name, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub total_line: String,
    pub form: FormView,
    pub loading_line: Option<&'static str>,
    pub empty_line: Option<&'static str>,
    pub rows: Vec<RecordRow>,
}

impl ViewModel {
    pub fn from_snapshot(snapshot: &ControllerSnapshot) -> Self {
        let editing = snapshot.edit_target.is_some();
        let form = FormView {
            heading: if editing { EDIT_HEADING } else { CREATE_HEADING },
            submit_label: match (snapshot.loading, editing) {
                (true, _) => BUSY_SUBMIT,
                (false, true) => UPDATE_SUBMIT,
                (false, false) => CREATE_SUBMIT,
            },
            submit_enabled: !snapshot.loading,
            cancel_visible: editing,
            name: snapshot.form.name.clone(),
            email: snapshot.form.email.clone(),
        };

        let rows = snapshot
            .records
            .iter()
            .map(|record| RecordRow {
                id: record.id,
                name: record.name.clone(),
                email: record.email.clone(),
                badge: format!("ID: {}", record.id),
            })
            .collect::<Vec<_>>();

        Self {
            total_line: format!("Total users: {}", snapshot.records.len()),
            form,
            loading_line: snapshot.loading.then_some(LOADING_COPY),
            empty_line: (rows.is_empty() && !snapshot.loading).then_some(EMPTY_COPY),
            rows,
        }
    }
}
