use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The unit of scheduling: a callable stepped repeatedly until it reports
/// that no work remains.
type TaskFn = Arc<dyn Fn() -> bool + Send + Sync + 'static>;

struct Task {
    id: u64,
    func: TaskFn,
    alive: bool,
}

struct PoolState {
    /// Registered tasks, ordered by ascending id. Ids give workers stable
    /// cursors that survive removals and keep registration order, which
    /// the round-robin pass depends on: a stage must be visited before the
    /// stages it feeds.
    tasks: Vec<Task>,
    next_id: u64,
    alive: usize,
    running: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    cond: Condvar,
}

/// A pool of worker threads that cooperatively multiplexes multitasks.
///
/// Every worker makes round-robin passes over the registered tasks,
/// executing one [`step`](crate::StageExecutor::step)-sized unit of work
/// per visit. Several workers may step the same task concurrently. A task
/// whose step returns `false` is retired; the worker holding the last
/// reference to its callable removes it from the list.
///
/// Because each task is step-sized, a pipeline deeper than the pool is
/// wide still makes progress: a single worker visits every stage in turn
/// instead of parking on one of them. Stages must be registered
/// upstream-first for this to hold, which chaining pipelines in
/// construction order does naturally.
///
/// Dropping the pool stops the workers after their current step;
/// unfinished tasks are not drained.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn a pool with `count` worker threads.
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::EmptyPool);
        }
        Ok(Self::spawn(count))
    }

    fn spawn(count: usize) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                tasks: Vec::new(),
                next_id: 0,
                alive: 0,
                running: true,
            }),
            cond: Condvar::new(),
        });
        let workers = (0..count)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&shared))
            })
            .collect();
        Self { shared, workers }
    }

    /// Register a multitask.
    ///
    /// The pool steps `task` until it returns `false`. Steps may run
    /// concurrently on several workers, so the callable must tolerate
    /// overlapping invocations.
    pub fn process<F>(&self, task: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let mut state = self.shared.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.push(Task {
            id,
            func: Arc::new(task),
            alive: true,
        });
        state.alive += 1;
        self.shared.cond.notify_all();
    }
}

impl Default for ThreadPool {
    /// A pool with one worker per available hardware thread.
    fn default() -> Self {
        Self::spawn(default_parallelism())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            self.shared.cond.notify_all();
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                eprintln!("thread pool: worker thread panicked");
            }
        }
    }
}

pub(crate) fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

fn worker_loop(shared: &PoolShared) {
    // Resume position in task-id order; tasks below it were already
    // visited this pass.
    let mut cursor: u64 = 0;
    let mut held: Option<(u64, TaskFn)> = None;
    let mut step_done = false;
    loop {
        let (id, func) = {
            let mut state = shared.state.lock();

            if let Some((id, func)) = held.take() {
                if let Some(pos) = state.tasks.iter().position(|t| t.id == id) {
                    // Several workers may notice the same task finishing;
                    // only the first one retires it, so the alive count
                    // drops exactly once per task.
                    if step_done && state.tasks[pos].alive {
                        state.tasks[pos].alive = false;
                        state.alive -= 1;
                    }
                    // The list entry and our own clone are the only
                    // references left: no other worker is executing or
                    // about to execute this task, so it is safe to unlink.
                    let last_holder =
                        !state.tasks[pos].alive && Arc::strong_count(&func) == 2;
                    drop(func);
                    if last_holder {
                        state.tasks.remove(pos);
                    }
                }
                cursor = id + 1;
            }

            'find: loop {
                let start = state.tasks.partition_point(|t| t.id < cursor);
                for task in &state.tasks[start..] {
                    if task.alive {
                        break 'find (task.id, Arc::clone(&task.func));
                    }
                }
                // End of the pass: sleep only while there is nothing alive
                // anywhere, then start over from the front.
                while state.running && state.alive == 0 {
                    shared.cond.wait(&mut state);
                }
                if !state.running {
                    return;
                }
                cursor = 0;
            }
        };

        step_done = !run_step(&func);
        held = Some((id, func));
    }
}

/// Execute one step, catching panics at the worker boundary so a failing
/// task is retired instead of taking the whole pool down.
fn run_step(func: &TaskFn) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| func())) {
        Ok(more) => more,
        Err(_) => {
            eprintln!("thread pool: task panicked, retiring it");
            false
        }
    }
}
