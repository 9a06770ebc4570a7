//! The single-threaded cooperative schedulers used by the ioctl adapter and
//! the data plane (spec.md §5): one thread, a FIFO of immediate tasks, and a
//! min-heap of delayed (timeout) tasks. Completions, timeouts, and RX drains
//! are strictly ordered because only one thread ever runs them.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send>;

struct DelayedTask {
    deadline: Instant,
    id: u64,
    task: Task,
}

impl PartialEq for DelayedTask {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}
impl Eq for DelayedTask {}
impl PartialOrd for DelayedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DelayedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so the BinaryHeap (a max-heap) pops the earliest deadline.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Default)]
struct Queue {
    immediate: VecDeque<Task>,
    delayed: BinaryHeap<DelayedTask>,
    canceled: HashSet<u64>,
    next_id: u64,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    cv: Condvar,
}

/// A handle to a previously-scheduled delayed task.
#[derive(Clone)]
pub struct TimeoutHandle {
    id: u64,
    shared: Arc<Shared>,
}

impl TimeoutHandle {
    /// Cancels the task if it has not yet run. Spec.md §4.1 relies on this
    /// always succeeding when the real completion races a still-pending
    /// timeout: since both run on this same worker thread, a completion
    /// handler calling `cancel` always wins against the not-yet-dequeued
    /// timer.
    pub fn cancel(&self) -> bool {
        let mut q = self.shared.queue.lock().unwrap();
        q.canceled.insert(self.id)
    }
}

/// A single-threaded task queue with immediate and deadline-scheduled work.
pub struct Worker {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn spawn(name: &str) -> Arc<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            cv: Condvar::new(),
        });
        let run_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::run(run_shared))
            .expect("failed to spawn worker thread");
        Arc::new(Worker {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Posts a task to run as soon as the worker thread is free. Returns
    /// `false` if the worker has been shut down.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        let mut q = self.shared.queue.lock().unwrap();
        if q.shutdown {
            return false;
        }
        q.immediate.push_back(Box::new(task));
        self.shared.cv.notify_one();
        true
    }

    /// Schedules `task` to run at `Instant::now() + delay`. Returns `None`
    /// if the worker has been shut down.
    pub fn post_after(
        &self,
        delay: Duration,
        task: impl FnOnce() + Send + 'static,
    ) -> Option<TimeoutHandle> {
        let mut q = self.shared.queue.lock().unwrap();
        if q.shutdown {
            return None;
        }
        let id = q.next_id;
        q.next_id += 1;
        q.delayed.push(DelayedTask {
            deadline: Instant::now() + delay,
            id,
            task: Box::new(task),
        });
        self.shared.cv.notify_one();
        Some(TimeoutHandle {
            id,
            shared: self.shared.clone(),
        })
    }

    fn run(shared: Arc<Shared>) {
        loop {
            let mut g = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = g.immediate.pop_front() {
                    drop(g);
                    task();
                    g = shared.queue.lock().unwrap();
                    continue;
                }
                if let Some(next) = g.delayed.peek() {
                    let now = Instant::now();
                    if next.deadline <= now {
                        let due = g.delayed.pop().unwrap();
                        let canceled = g.canceled.remove(&due.id);
                        drop(g);
                        if !canceled {
                            (due.task)();
                        }
                        g = shared.queue.lock().unwrap();
                        continue;
                    }
                    let wait = next.deadline - now;
                    let (guard, _timeout) = shared.cv.wait_timeout(g, wait).unwrap();
                    g = guard;
                    continue;
                }
                if g.shutdown {
                    return;
                }
                g = shared.cv.wait(g).unwrap();
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        {
            let mut q = self.shared.queue.lock().unwrap();
            q.shutdown = true;
        }
        self.shared.cv.notify_all();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn immediate_tasks_run_in_order() {
        let worker = Worker::spawn("test-worker");
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            worker.post(move || tx.send(i).unwrap());
        }
        drop(tx);
        let got: Vec<_> = rx.iter().collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn delayed_task_runs_after_immediate_ones() {
        let worker = Worker::spawn("test-worker");
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        worker.post_after(Duration::from_millis(5), move || tx2.send("late").unwrap());
        worker.post(move || tx.send("early").unwrap());
        assert_eq!(rx.recv().unwrap(), "early");
        assert_eq!(rx.recv().unwrap(), "late");
    }

    #[test]
    fn canceled_delayed_task_never_runs() {
        let worker = Worker::spawn("test-worker");
        let (tx, rx) = mpsc::channel::<()>();
        let handle = worker
            .post_after(Duration::from_millis(5), move || tx.send(()).unwrap())
            .unwrap();
        assert!(handle.cancel());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
