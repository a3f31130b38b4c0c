use std::{
  cell::Cell,
  cmp::Ordering,
  collections::BinaryHeap,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, trace, warn};

use super::{Scheduler, Task, TaskHandle};
use crate::{config::SchedulerConfig, error::SchedulerError};

/// How long the timer waits before offering a due task to a full queue again.
const TIMER_RETRY: Duration = Duration::from_millis(1);

thread_local! {
  static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

struct Job {
  task: Task,
  handle: TaskHandle,
}

struct Timed {
  due: Instant,
  seq: u64,
  job: Job,
}

impl PartialEq for Timed {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Timed {}

impl PartialOrd for Timed {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Timed {
  fn cmp(&self, other: &Self) -> Ordering {
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

struct Pool {
  jobs: Sender<Job>,
  timer: Sender<(Instant, Job)>,
  config: SchedulerConfig,
}

/// A fixed pool of worker threads fed by a bounded queue.
///
/// Delayed tasks wait on a dedicated timer thread and enter the work queue
/// when due. Producers outside the pool block while the queue is full. A
/// worker scheduling onto a full queue runs the task itself, and the timer
/// holds a due task back until the queue has room. Once every clone of the scheduler is dropped the timer discards
/// its pending tasks and the workers exit after the queued work has run.
#[derive(Clone)]
pub struct ThreadPoolScheduler(Arc<Pool>);

impl ThreadPoolScheduler {
  pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
    config.validate()?;
    let (jobs, work) = bounded::<Job>(config.queue_capacity);
    for idx in 0..config.pool_size {
      let work = work.clone();
      let name = format!("{}-{idx}", config.thread_name);
      thread::Builder::new()
        .name(name.clone())
        .spawn(move || worker(work))
        .map_err(|source| SchedulerError::Spawn { name, source })?;
    }

    let (timer, timer_rx) = unbounded();
    let name = format!("{}-timer", config.thread_name);
    let timer_jobs = jobs.clone();
    thread::Builder::new()
      .name(name.clone())
      .spawn(move || timer_loop(timer_rx, timer_jobs))
      .map_err(|source| SchedulerError::Spawn { name, source })?;

    debug!(
      pool_size = config.pool_size,
      queue_capacity = config.queue_capacity,
      "thread pool started"
    );
    Ok(ThreadPoolScheduler(Arc::new(Pool { jobs, timer, config })))
  }

  pub fn config(&self) -> &SchedulerConfig { &self.0.config }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let job = Job { task, handle: handle.clone() };
    let sent = match delay.filter(|d| !d.is_zero()) {
      Some(delay) => self.0.timer.send((Instant::now() + delay, job)).is_ok(),
      None if ON_WORKER.with(Cell::get) => match self.0.jobs.try_send(job) {
        Ok(()) => true,
        Err(TrySendError::Full(job)) => {
          trace!("work queue full, running task on the scheduling worker");
          run(job);
          true
        }
        Err(TrySendError::Disconnected(_)) => false,
      },
      None => self.0.jobs.send(job).is_ok(),
    };
    if !sent {
      warn!("thread pool is shut down, task dropped");
      handle.mark_finished();
    }
    handle
  }

  fn now(&self) -> Instant { Instant::now() }
}

fn worker(work: Receiver<Job>) {
  ON_WORKER.with(|on| on.set(true));
  work.iter().for_each(run);
}

fn run(Job { task, handle }: Job) {
  if handle.is_cancelled() {
    return;
  }
  if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
    let msg = panic
      .downcast_ref::<&str>()
      .map(|s| s.to_string())
      .or_else(|| panic.downcast_ref::<String>().cloned())
      .unwrap_or_default();
    let current = thread::current();
    error!(thread = current.name().unwrap_or_default(), panic = %msg, "task panicked");
  }
  handle.mark_finished();
}

fn timer_loop(incoming: Receiver<(Instant, Job)>, jobs: Sender<Job>) {
  let mut heap = BinaryHeap::new();
  let mut seq = 0u64;
  loop {
    let now = Instant::now();
    while heap.peek().map_or(false, |t: &Timed| t.due <= now) {
      let Some(Timed { job, seq: order, .. }) = heap.pop() else { break };
      if job.handle.is_cancelled() {
        continue;
      }
      match jobs.try_send(job) {
        Ok(()) => {}
        Err(TrySendError::Full(job)) => {
          debug!("work queue full, delaying a due task");
          heap.push(Timed { due: now + TIMER_RETRY, seq: order, job });
          break;
        }
        Err(TrySendError::Disconnected(_)) => return,
      }
    }
    let received = match heap.peek() {
      Some(next) => incoming.recv_timeout(next.due.saturating_duration_since(now)),
      None => incoming.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
      Ok((due, job)) => {
        heap.push(Timed { due, seq, job });
        seq += 1;
      }
      Err(RecvTimeoutError::Timeout) => {}
      Err(RecvTimeoutError::Disconnected) => {
        debug!(pending = heap.len(), "timer thread stopping");
        return;
      }
    }
  }
}
