use clap::Subcommand;
use pomodrift_core::storage::database::TASKS_KEY;
use pomodrift_core::storage::Database;
use pomodrift_core::TaskState;
use tracing::warn;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task and print its id
    Add {
        /// Task name
        name: String,
    },
    /// Rename a task
    Edit {
        /// Task ID
        id: String,
        /// New name
        name: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Select the task being worked on (omit the id to clear)
    Select {
        /// Task ID
        id: Option<String>,
    },
    /// List tasks as JSON
    List,
}

fn load_tasks(db: &Database) -> TaskState {
    match db.kv_get_json::<TaskState>(TASKS_KEY) {
        Ok(state) => state.unwrap_or_default().normalize(),
        Err(e) => {
            warn!(error = %e, "discarding unreadable task list");
            TaskState::default()
        }
    }
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let tasks = load_tasks(&db);

    let tasks = match action {
        TaskAction::Add { name } => {
            let (tasks, id) = tasks.add_with_generated_id(name);
            println!("{id}");
            tasks
        }
        TaskAction::Edit { id, name } => {
            if !tasks.contains(&id) {
                return Err(format!("task not found: {id}").into());
            }
            tasks.edit(&id, name)
        }
        TaskAction::Delete { id } => {
            if !tasks.contains(&id) {
                return Err(format!("task not found: {id}").into());
            }
            tasks.delete(&id)
        }
        TaskAction::Select { id } => {
            if let Some(id) = id.as_deref().filter(|id| !tasks.contains(id)) {
                return Err(format!("task not found: {id}").into());
            }
            tasks.select(id.as_deref())
        }
        TaskAction::List => {
            println!("{}", serde_json::to_string_pretty(&tasks)?);
            return Ok(());
        }
    };

    db.kv_set_json(TASKS_KEY, &tasks)?;
    Ok(())
}
