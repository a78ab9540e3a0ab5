use tracing::debug;

use crate::contract::model::{User, UserDraft, UserId};
use crate::domain::coordinator::MutationCoordinator;
use crate::domain::error::SyncError;
use crate::domain::pending::MutationKind;
use crate::domain::validation::{validate, Field, ValidationErrors};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this user?";

/// Dialog state. Drafts live here only; the cache sees a submitted copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Closed,
    Adding {
        draft: UserDraft,
        errors: ValidationErrors,
    },
    Editing {
        id: UserId,
        draft: UserDraft,
        errors: ValidationErrors,
    },
    ConfirmingDelete {
        id: UserId,
        name: String,
    },
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            EditorState::Closed => "closed",
            EditorState::Adding { .. } => "adding",
            EditorState::Editing { .. } => "editing",
            EditorState::ConfirmingDelete { .. } => "confirming delete",
        }
    }
}

/// Validated intent handed from the editor to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(UserDraft),
    Update { id: UserId, draft: UserDraft },
    Delete { id: UserId },
}

impl Submission {
    pub fn kind(&self) -> MutationKind {
        match self {
            Submission::Create(_) => MutationKind::Create,
            Submission::Update { .. } => MutationKind::Update,
            Submission::Delete { .. } => MutationKind::Delete,
        }
    }
}

/// Add/edit dialog and delete confirmation.
#[derive(Debug, Clone, Default)]
pub struct RecordEditor {
    state: EditorState,
}

impl RecordEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != EditorState::Closed
    }

    /// `None` opens an empty draft for adding; `Some(user)` clones it for editing.
    pub fn open(&mut self, target: Option<&User>) -> Result<(), SyncError> {
        self.ensure_closed("open the editor")?;
        self.state = match target {
            None => EditorState::Adding {
                draft: UserDraft::default(),
                errors: ValidationErrors::default(),
            },
            Some(user) => EditorState::Editing {
                id: user.id,
                draft: UserDraft::from(user),
                errors: ValidationErrors::default(),
            },
        };
        debug!(state = self.state.name(), "Editor opened");
        Ok(())
    }

    pub fn request_delete(&mut self, user: &User) -> Result<(), SyncError> {
        self.ensure_closed("request a delete")?;
        self.state = EditorState::ConfirmingDelete {
            id: user.id,
            name: user.name.clone(),
        };
        Ok(())
    }

    /// Update one draft field and clear that field's error.
    pub fn change_field(&mut self, field: Field, value: impl Into<String>) -> Result<(), SyncError> {
        let (draft, errors) = self.form_mut("change a field")?;
        let value = value.into();
        match field {
            Field::Name => draft.name = value,
            Field::Email => draft.email = value,
            Field::Company => draft.company.name = value,
        }
        errors.clear_field(field);
        Ok(())
    }

    pub fn draft(&self) -> Option<&UserDraft> {
        match &self.state {
            EditorState::Adding { draft, .. } | EditorState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        match &self.state {
            EditorState::Adding { errors, .. } | EditorState::Editing { errors, .. } => {
                Some(errors)
            }
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&'static str> {
        match self.state {
            EditorState::Adding { .. } => Some("Add New User"),
            EditorState::Editing { .. } => Some("Edit User"),
            EditorState::ConfirmingDelete { .. } => Some("Delete User"),
            EditorState::Closed => None,
        }
    }

    pub fn submit_label(&self) -> Option<&'static str> {
        match self.state {
            EditorState::Adding { .. } => Some("Create"),
            EditorState::Editing { .. } => Some("Update"),
            EditorState::ConfirmingDelete { .. } => Some("Delete"),
            EditorState::Closed => None,
        }
    }

    /// Validate and, on success, close and hand back the submission.
    /// On failure the editor stays open with errors populated.
    pub fn submit(&mut self) -> Result<Submission, SyncError> {
        let (draft, errors) = self.form_mut("submit")?;

        let found = validate(draft);
        if !found.is_empty() {
            *errors = found.clone();
            debug!(errors = %found, "Editor submission blocked");
            return Err(SyncError::validation_failed(found));
        }

        match std::mem::take(&mut self.state) {
            EditorState::Adding { draft, .. } => Ok(Submission::Create(draft)),
            EditorState::Editing { id, draft, .. } => Ok(Submission::Update { id, draft }),
            other => {
                let state = other.name();
                self.state = other;
                Err(SyncError::invalid_transition("submit", state))
            }
        }
    }

    pub fn confirmation_prompt(&self) -> Option<&'static str> {
        match self.state {
            EditorState::ConfirmingDelete { .. } => Some(DELETE_PROMPT),
            _ => None,
        }
    }

    pub fn confirm_delete(&mut self) -> Result<Submission, SyncError> {
        match self.state {
            EditorState::ConfirmingDelete { id, .. } => {
                self.state = EditorState::Closed;
                Ok(Submission::Delete { id })
            }
            _ => Err(SyncError::invalid_transition(
                "confirm a delete",
                self.state.name(),
            )),
        }
    }

    /// Close unconditionally, discarding any draft.
    pub fn cancel(&mut self) {
        if self.is_open() {
            debug!(state = self.state.name(), "Editor cancelled");
        }
        self.state = EditorState::Closed;
    }

    /// `submit` followed by the coordinator call. The editor is already
    /// closed while the mutation is in flight.
    pub async fn submit_with(
        &mut self,
        coordinator: &MutationCoordinator,
    ) -> Result<User, SyncError> {
        let submission = self.submit()?;
        coordinator.submit(submission).await
    }

    pub async fn confirm_delete_with(
        &mut self,
        coordinator: &MutationCoordinator,
    ) -> Result<User, SyncError> {
        let submission = self.confirm_delete()?;
        coordinator.submit(submission).await
    }

    fn ensure_closed(&self, action: &'static str) -> Result<(), SyncError> {
        if self.is_open() {
            return Err(SyncError::invalid_transition(action, self.state.name()));
        }
        Ok(())
    }

    fn form_mut(
        &mut self,
        action: &'static str,
    ) -> Result<(&mut UserDraft, &mut ValidationErrors), SyncError> {
        match &mut self.state {
            EditorState::Adding { draft, errors } | EditorState::Editing { draft, errors, .. } => {
                Ok((draft, errors))
            }
            other => Err(SyncError::invalid_transition(action, other.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> User {
        UserDraft::new("Ann", "a@x.com", "Acme").into_user(UserId(1))
    }

    #[test]
    fn open_add_starts_with_empty_draft() {
        let mut editor = RecordEditor::new();
        editor.open(None).unwrap();

        assert_eq!(editor.state().name(), "adding");
        assert_eq!(editor.draft(), Some(&UserDraft::default()));
        assert_eq!(editor.title(), Some("Add New User"));
        assert_eq!(editor.submit_label(), Some("Create"));
    }

    #[test]
    fn open_edit_clones_target() {
        let mut editor = RecordEditor::new();
        let user = ann();
        editor.open(Some(&user)).unwrap();

        assert_eq!(editor.draft(), Some(&UserDraft::from(&user)));
        assert_eq!(editor.title(), Some("Edit User"));
        assert_eq!(editor.submit_label(), Some("Update"));
    }

    #[test]
    fn failed_submit_stays_open_with_errors() {
        let mut editor = RecordEditor::new();
        editor.open(None).unwrap();
        editor.change_field(Field::Email, "nope").unwrap();

        let err = editor.submit().unwrap_err();
        assert!(matches!(err, SyncError::ValidationFailed { .. }));
        assert_eq!(editor.state().name(), "adding");

        let errors = editor.errors().unwrap();
        assert_eq!(errors.get(Field::Name), Some("Name is required"));
        assert_eq!(errors.get(Field::Email), Some("Invalid email format"));
        assert_eq!(errors.get(Field::Company), Some("Company is required"));
    }

    #[test]
    fn changing_a_field_clears_only_its_error() {
        let mut editor = RecordEditor::new();
        editor.open(None).unwrap();
        let _ = editor.submit();

        editor.change_field(Field::Company, "Co").unwrap();
        let errors = editor.errors().unwrap();
        assert_eq!(errors.get(Field::Company), None);
        assert!(errors.get(Field::Name).is_some());
        assert_eq!(editor.draft().unwrap().company.name, "Co");
    }

    #[test]
    fn successful_submit_closes_and_yields_submission() {
        let mut editor = RecordEditor::new();
        editor.open(Some(&ann())).unwrap();
        editor.change_field(Field::Name, "Annie").unwrap();

        let submission = editor.submit().unwrap();
        assert_eq!(
            submission,
            Submission::Update {
                id: UserId(1),
                draft: UserDraft::new("Annie", "a@x.com", "Acme"),
            }
        );
        assert!(!editor.is_open());
        assert!(editor.draft().is_none());
    }

    #[test]
    fn cancel_discards_draft() {
        let mut editor = RecordEditor::new();
        editor.open(None).unwrap();
        editor.change_field(Field::Name, "Half typed").unwrap();
        editor.cancel();

        assert_eq!(editor.state(), &EditorState::Closed);
        editor.open(None).unwrap();
        assert_eq!(editor.draft(), Some(&UserDraft::default()));
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut editor = RecordEditor::new();
        editor.request_delete(&ann()).unwrap();
        assert_eq!(editor.confirmation_prompt(), Some(DELETE_PROMPT));
        assert!(editor.change_field(Field::Name, "x").is_err());

        assert_eq!(
            editor.confirm_delete().unwrap(),
            Submission::Delete { id: UserId(1) }
        );
        assert!(!editor.is_open());
    }

    #[test]
    fn cancelled_delete_yields_nothing() {
        let mut editor = RecordEditor::new();
        editor.request_delete(&ann()).unwrap();
        editor.cancel();
        assert_eq!(
            editor.confirm_delete().unwrap_err(),
            SyncError::invalid_transition("confirm a delete", "closed")
        );
    }

    #[test]
    fn misuse_is_rejected_without_state_change() {
        let mut editor = RecordEditor::new();
        assert_eq!(
            editor.submit().unwrap_err(),
            SyncError::invalid_transition("submit", "closed")
        );

        editor.open(None).unwrap();
        assert_eq!(
            editor.open(Some(&ann())).unwrap_err(),
            SyncError::invalid_transition("open the editor", "adding")
        );
        assert_eq!(editor.state().name(), "adding");
    }
}
