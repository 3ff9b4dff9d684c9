use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;
use thread_local::ThreadLocal;

use crate::util::init_logsum;

use super::{SearchConfig, SearchTask, TaskResult, Workspace};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("failed to build the search thread pool")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// Runs batches of search tasks on a fixed-size thread pool.
pub struct Scheduler {
    config: Arc<SearchConfig>,
    pool: ThreadPool,
}

impl Scheduler {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        init_logsum();

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|idx| format!("cirrus-worker-{idx}"))
            .build()?;

        debug!(
            "search pool: {} threads, {} storage",
            pool.current_num_threads(),
            config.storage
        );

        Ok(Self {
            config: Arc::new(config),
            pool,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every task and return the results in the order the tasks were given.
    pub fn run(&self, tasks: &[SearchTask]) -> Vec<TaskResult> {
        let workspaces: ThreadLocal<RefCell<Workspace>> = ThreadLocal::new();
        let config = self.config.as_ref();

        self.pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let mut workspace = workspaces
                        .get_or(|| RefCell::new(Workspace::default()))
                        .borrow_mut();
                    workspace.run(task, config)
                })
                .collect()
        })
    }

    /// Queue the tasks and return immediately.
    ///
    /// Results arrive through the returned `Submission` in the order they finish.
    pub fn submit(&self, tasks: Vec<SearchTask>) -> Submission {
        let num_tasks = tasks.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (sender, receiver) = mpsc::channel();

        for _ in 0..self.num_threads().min(num_tasks) {
            let queue = Arc::clone(&queue);
            let config = Arc::clone(&self.config);
            let sender = sender.clone();

            self.pool.spawn(move || {
                let mut workspace = Workspace::default();
                loop {
                    let task = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();

                    let Some(task) = task else { break };

                    // the receiver is gone, so nobody wants the rest
                    if sender.send(workspace.run(&task, &config)).is_err() {
                        break;
                    }
                }
            });
        }

        Submission {
            queue,
            receiver,
            num_tasks,
        }
    }
}

/// A batch of tasks running in the background.
pub struct Submission {
    queue: Arc<Mutex<VecDeque<SearchTask>>>,
    receiver: Receiver<TaskResult>,
    num_tasks: usize,
}

impl Submission {
    /// The number of tasks that were submitted.
    pub fn len(&self) -> usize {
        self.num_tasks
    }

    pub fn is_empty(&self) -> bool {
        self.num_tasks == 0
    }

    /// The number of tasks that have not been started yet.
    pub fn num_queued(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Remove a task that has not been started. Returns false if the task is
    /// unknown or already running.
    pub fn cancel(&self, id: usize) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        match queue.iter().position(|task| task.id == id) {
            Some(idx) => {
                queue.remove(idx);
                debug!("cancelled task {id}");
                true
            }
            None => false,
        }
    }

    /// Block until the next result is ready, or return None when every task is done.
    pub fn recv(&self) -> Option<TaskResult> {
        self.receiver.recv().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskResult> + '_ {
        self.receiver.iter()
    }

    /// Block until every remaining task is done.
    pub fn wait(self) -> Vec<TaskResult> {
        self.receiver.into_iter().collect()
    }
}
