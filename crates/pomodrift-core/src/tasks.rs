//! Task list kept alongside the timer.
//!
//! Plain list operations; the only rule is that `selected_task_id`, when set,
//! names a task that exists.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub selected_task_id: Option<String>,
}

impl TaskState {
    /// Drop a selection that points at a missing task.
    #[must_use]
    pub fn normalize(self) -> Self {
        let selected_task_id = self
            .selected_task_id
            .filter(|id| self.tasks.iter().any(|task| &task.id == id));
        Self {
            tasks: self.tasks,
            selected_task_id,
        }
    }

    /// Append a task. An id that is already taken leaves the list unchanged.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.contains(&id) {
            self.tasks.push(Task {
                id,
                name: name.into(),
            });
        }
        self
    }

    /// Append a task under a fresh v4 UUID, returning the new id.
    #[must_use]
    pub fn add_with_generated_id(self, name: impl Into<String>) -> (Self, String) {
        let id = Uuid::new_v4().to_string();
        (self.add(name, id.clone()), id)
    }

    #[must_use]
    pub fn edit(mut self, id: &str, name: impl Into<String>) -> Self {
        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
            task.name = name.into();
        }
        self
    }

    #[must_use]
    pub fn delete(mut self, id: &str) -> Self {
        self.tasks.retain(|task| task.id != id);
        if self.selected_task_id.as_deref() == Some(id) {
            self.selected_task_id = None;
        }
        self
    }

    /// Select a task by id; `None` or an unknown id clears the selection.
    #[must_use]
    pub fn select(self, id: Option<&str>) -> Self {
        let selected_task_id = id
            .filter(|id| self.contains(id))
            .map(str::to_string);
        Self {
            tasks: self.tasks,
            selected_task_id,
        }
    }

    /// Replace the whole list, keeping the selection only if it still exists.
    #[must_use]
    pub fn set_tasks(self, tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            selected_task_id: self.selected_task_id,
        }
        .normalize()
    }

    pub fn selected(&self) -> Option<&Task> {
        let id = self.selected_task_id.as_deref()?;
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tasks() -> TaskState {
        TaskState::default()
            .add("First", "task-1")
            .add("Second", "task-2")
    }

    #[test]
    fn adds_and_edits_tasks() {
        let state = two_tasks();
        assert_eq!(state.tasks.len(), 2);
        assert_eq!(
            state.tasks[0],
            Task {
                id: "task-1".into(),
                name: "First".into()
            }
        );
        let state = state.edit("task-1", "Updated");
        assert_eq!(state.tasks[0].name, "Updated");
        assert_eq!(state.clone().edit("missing", "x"), state);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let state = two_tasks().add("Again", "task-1");
        assert_eq!(state.tasks.len(), 2);
        assert_eq!(state.tasks[0].name, "First");
    }

    #[test]
    fn generated_ids_are_unique() {
        let (state, a) = TaskState::default().add_with_generated_id("A");
        let (state, b) = state.add_with_generated_id("B");
        assert_ne!(a, b);
        assert!(state.contains(&a) && state.contains(&b));
    }

    #[test]
    fn clears_selection_when_deleting_selected_task() {
        let state = two_tasks().select(Some("task-1")).delete("task-1");
        assert_eq!(state.selected_task_id, None);
        assert_eq!(state.tasks.len(), 1);
    }

    #[test]
    fn deleting_other_task_keeps_selection() {
        let state = two_tasks().select(Some("task-1")).delete("task-2");
        assert_eq!(state.selected().map(|t| t.name.as_str()), Some("First"));
    }

    #[test]
    fn selecting_unknown_id_clears_selection() {
        let state = two_tasks().select(Some("task-1")).select(Some("nope"));
        assert_eq!(state.selected_task_id, None);
        assert_eq!(two_tasks().select(Some("task-2")).select(None).selected(), None);
    }

    #[test]
    fn set_tasks_drops_stale_selection() {
        let state = two_tasks().select(Some("task-2"));
        let kept = state.clone().set_tasks(vec![Task {
            id: "task-2".into(),
            name: "Only".into(),
        }]);
        assert_eq!(kept.selected_task_id.as_deref(), Some("task-2"));
        let dropped = state.set_tasks(Vec::new());
        assert_eq!(dropped.selected_task_id, None);
    }

    #[test]
    fn deserializes_partial_record() {
        let state: TaskState =
            serde_json::from_str(r#"{"selectedTaskId":"ghost"}"#).unwrap();
        assert_eq!(state.normalize(), TaskState::default());
    }
}
