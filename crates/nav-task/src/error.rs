use thiserror::Error;

use nav_world::WorldError;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("navigation worker is already running")]
    AlreadyRunning,

    #[error("failed to spawn navigation worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    World(#[from] WorldError),
}

pub type TaskResult<T> = Result<T, TaskError>;
