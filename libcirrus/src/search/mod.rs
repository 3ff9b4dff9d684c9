mod config;
pub use config::{SearchConfig, SearchConfigBuilder, SearchConfigBuilderError, StorageKind};

mod task;
pub use task::{Passes, SearchTask, TaskError, TaskResult, TaskScores};

mod workspace;
pub use workspace::Workspace;

mod scheduler;
pub use scheduler::{Scheduler, SearchError, Submission};
