//! Interaction state over the task list: context menu, multi-select, edit
//! dialog and delete confirmation. Each axis changes independently.

use uuid::Uuid;

use crate::api::TaskApi;
use crate::store::{BulkOutcome, StoreResult, TaskStore};
use crate::types::{Task, TaskPatch};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MenuAnchor {
    /// Label of the row or control the menu was opened from.
    Element(String),
    Point { x: i32, y: i32 },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContextMenu {
    pub task_id: Uuid,
    pub anchor: MenuAnchor,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeleteTarget {
    Single(Uuid),
    Bulk(Vec<Uuid>),
}

impl DeleteTarget {
    pub fn ids(&self) -> &[Uuid] {
        match self {
            DeleteTarget::Single(id) => std::slice::from_ref(id),
            DeleteTarget::Bulk(ids) => ids,
        }
    }
}

#[derive(Debug, Clone)]
struct EditSession {
    snapshot: Task,
    draft: Task,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    menu: Option<ContextMenu>,
    selected: Vec<Uuid>,
    edit: Option<EditSession>,
    delete: Option<DeleteTarget>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    /// Replaces any menu already open.
    pub fn open_menu(&mut self, task_id: Uuid, anchor: MenuAnchor) {
        self.menu = Some(ContextMenu { task_id, anchor });
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    pub fn selected(&self) -> &[Uuid] {
        &self.selected
    }

    pub fn is_selected(&self, id: Uuid) -> bool {
        self.selected.contains(&id)
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle_selected(&mut self, id: Uuid) -> bool {
        if let Some(index) = self.selected.iter().position(|selected| *selected == id) {
            self.selected.remove(index);
            false
        } else {
            self.selected.push(id);
            true
        }
    }

    /// Adds the menu's task to the selection and closes the menu. No-op
    /// without an open menu.
    pub fn select_from_menu(&mut self) -> Option<Uuid> {
        let menu = self.menu.take()?;
        if !self.is_selected(menu.task_id) {
            self.selected.push(menu.task_id);
        }
        Some(menu.task_id)
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Drops selected ids that no longer exist.
    pub fn prune_selection(&mut self, known: &[Uuid]) {
        self.selected.retain(|id| known.contains(id));
        if self
            .menu
            .as_ref()
            .is_some_and(|menu| !known.contains(&menu.task_id))
        {
            self.menu = None;
        }
    }

    pub fn open_edit(&mut self, task: &Task) {
        self.menu = None;
        self.edit = Some(EditSession {
            snapshot: task.clone(),
            draft: task.clone(),
        });
    }

    pub fn editing(&self) -> Option<&Task> {
        self.edit.as_ref().map(|session| &session.draft)
    }

    pub fn edit_draft_mut(&mut self) -> Option<&mut Task> {
        self.edit.as_mut().map(|session| &mut session.draft)
    }

    pub fn is_dirty(&self) -> bool {
        self.edit
            .as_ref()
            .is_some_and(|session| !diff(&session.snapshot, &session.draft).is_empty())
    }

    pub fn should_warn_before_leave(&self) -> bool {
        self.is_dirty()
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Fields the open dialog changed, keyed by the task being edited.
    pub fn edit_patch(&self) -> Option<(Uuid, TaskPatch)> {
        let session = self.edit.as_ref()?;
        Some((session.snapshot.id, diff(&session.snapshot, &session.draft)))
    }

    /// Sends the dialog's changes. The dialog stays open when the store
    /// rejects them so the edits are not lost.
    pub async fn save_edit<C>(&mut self, store: &mut TaskStore<C>) -> StoreResult<Option<Task>>
    where
        C: TaskApi + 'static,
    {
        let Some((id, patch)) = self.edit_patch() else {
            return Ok(None);
        };
        if patch.is_empty() {
            self.edit = None;
            return Ok(None);
        }

        let saved = store.update(id, patch).await?;
        self.edit = None;
        Ok(Some(saved))
    }

    pub fn pending_delete(&self) -> Option<&DeleteTarget> {
        self.delete.as_ref()
    }

    /// Asks to delete the menu's task; closes the menu.
    pub fn request_delete(&mut self) -> Option<Uuid> {
        let menu = self.menu.take()?;
        self.delete = Some(DeleteTarget::Single(menu.task_id));
        Some(menu.task_id)
    }

    /// Asks to delete every selected task. Returns false with nothing
    /// selected.
    pub fn request_bulk_delete(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        self.delete = Some(DeleteTarget::Bulk(self.selected.clone()));
        true
    }

    pub fn cancel_delete(&mut self) {
        self.delete = None;
    }

    /// Runs the pending deletion and closes the dialog. A bulk deletion
    /// clears the selection afterwards.
    pub async fn confirm_delete<C>(&mut self, store: &mut TaskStore<C>) -> Option<BulkOutcome>
    where
        C: TaskApi + 'static,
    {
        let target = self.delete.take()?;
        let outcome = match target {
            DeleteTarget::Single(id) => {
                let mut outcome = BulkOutcome::default();
                match store.remove(id).await {
                    Ok(()) => {
                        self.selected.retain(|selected| *selected != id);
                        outcome.succeeded.push(id);
                    }
                    Err(err) => outcome.failed.push((id, err)),
                }
                outcome
            }
            DeleteTarget::Bulk(ids) => {
                let outcome = store.remove_many(&ids).await;
                self.selected.clear();
                outcome
            }
        };
        Some(outcome)
    }
}

fn diff(before: &Task, after: &Task) -> TaskPatch {
    TaskPatch {
        name: (before.name != after.name).then(|| after.name.clone()),
        description: (before.description != after.description)
            .then(|| after.description.clone()),
        done: (before.done != after.done).then_some(after.done),
        color: (before.color != after.color).then(|| after.color.clone()),
        emoji: (before.emoji != after.emoji).then(|| after.emoji.clone()),
        deadline: (before.deadline != after.deadline).then_some(after.deadline),
        categories: (before.categories != after.categories).then(|| after.categories.clone()),
    }
}
