use crate::entry::{clone_outcome, poisoned_panic, share, Outcome, Resolution};
use crate::metrics::Metrics;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};

use parking_lot::Mutex;

/// A caller blocked on a pending slot.
pub(crate) enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

/// The phase of a slot. `Pending -> Done` is the only transition.
enum State<V, E> {
  Pending,
  Done(Resolution<V, E>),
}

struct Inner<V, E> {
  state: State<V, E>,
  waiters: VecDeque<Waiter>,
}

/// The per-key entry of the single-flight table.
///
/// A slot is created pending by the caller that wins the race for its key.
/// That caller alone resolves it; everyone else blocks (or awaits) until the
/// one-shot transition to `Done` happens. Resolving drains the waiter queue,
/// so a slot can be awaited by any mix of threads and async tasks.
pub(crate) struct Slot<V, E> {
  inner: Mutex<Inner<V, E>>,
}

impl<V, E> Slot<V, E> {
  /// Creates a new slot in the pending phase.
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        state: State::Pending,
        waiters: VecDeque::new(),
      }),
    }
  }

  /// Moves the slot to its final state and wakes every waiter.
  fn finish(&self, resolution: Resolution<V, E>) {
    let waiters = {
      let mut inner = self.inner.lock();
      debug_assert!(
        matches!(inner.state, State::Pending),
        "a slot can only be resolved once"
      );
      inner.state = State::Done(resolution);
      std::mem::take(&mut inner.waiters)
    };
    // Wake outside the lock so woken threads don't immediately contend on it.
    for waiter in waiters {
      waiter.wake();
    }
  }

  /// Returns `true` while the owning computation is still running.
  pub(crate) fn is_pending(&self) -> bool {
    matches!(self.inner.lock().state, State::Pending)
  }

  /// Returns the outcome if the slot resolved normally.
  pub(crate) fn peek(&self) -> Option<Outcome<V, E>> {
    match &self.inner.lock().state {
      State::Pending => None,
      State::Done(resolution) => resolution.outcome(),
    }
  }

  /// Blocks the current thread until the slot is resolved.
  ///
  /// Panics if the owning computation panicked or was cancelled.
  pub(crate) fn wait(&self) -> Outcome<V, E> {
    let mut inner = self.inner.lock();
    let mut queued = false;
    loop {
      match &inner.state {
        State::Done(resolution) => return resolution.expect_outcome(),
        State::Pending => {
          // `finish` drains the queue in the same critical section that leaves
          // `Pending`, so a still-pending slot still holds our entry.
          if !queued {
            inner.waiters.push_back(Waiter::Sync(thread::current()));
            queued = true;
          }
          drop(inner);
          thread::park();
          // Parking can wake spuriously, so the state is checked again.
          inner = self.inner.lock();
        }
      }
    }
  }
}

impl<V, E> Future for &Slot<V, E> {
  type Output = Outcome<V, E>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut inner = self.inner.lock();
    match &inner.state {
      State::Done(Resolution::Resolved(outcome)) => Poll::Ready(clone_outcome(outcome)),
      State::Done(Resolution::Poisoned) => poisoned_panic(),
      State::Pending => {
        if !inner.waiters.iter().any(|w| match w {
          Waiter::Async(waker) => waker.will_wake(cx.waker()),
          Waiter::Sync(_) => false,
        }) {
          inner.waiters.push_back(Waiter::Async(cx.waker().clone()));
        }
        Poll::Pending
      }
    }
  }
}

/// Held by the caller that owns a pending slot while it runs the computation.
///
/// If the guard is dropped without [`resolve`](ResolveGuard::resolve) having
/// been called, the computation unwound or its future was dropped. The slot
/// is then poisoned so waiters are released instead of hanging forever.
pub(crate) struct ResolveGuard<'a, V, E> {
  slot: &'a Slot<V, E>,
  metrics: &'a Metrics,
  armed: bool,
}

impl<'a, V, E> ResolveGuard<'a, V, E> {
  pub(crate) fn new(slot: &'a Slot<V, E>, metrics: &'a Metrics) -> Self {
    Self {
      slot,
      metrics,
      armed: true,
    }
  }

  /// Stores the computation's result in the slot and wakes all waiters.
  pub(crate) fn resolve(mut self, result: Result<V, E>) -> Outcome<V, E> {
    self.armed = false;
    if result.is_err() {
      self.metrics.record_failure();
      tracing::debug!("memoized computation failed; the error is now cached");
    }
    let outcome = share(result);
    self
      .slot
      .finish(Resolution::Resolved(clone_outcome(&outcome)));
    outcome
  }
}

impl<'a, V, E> Drop for ResolveGuard<'a, V, E> {
  fn drop(&mut self) {
    if self.armed {
      self.metrics.record_panic();
      tracing::warn!("memoized computation did not return; poisoning its key");
      self.slot.finish(Resolution::Poisoned);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::Ordering;
  use std::sync::Arc;
  use std::time::Duration;

  #[test]
  fn pending_until_resolved() {
    let metrics = Metrics::new();
    let slot: Slot<u32, String> = Slot::new();
    assert!(slot.is_pending());
    assert!(slot.peek().is_none());

    let outcome = ResolveGuard::new(&slot, &metrics).resolve(Ok(7));
    assert_eq!(*outcome.unwrap(), 7);
    assert!(!slot.is_pending());
    assert_eq!(*slot.peek().unwrap().unwrap(), 7);
    assert_eq!(*slot.wait().unwrap(), 7);
  }

  #[test]
  fn wait_is_released_by_resolve() {
    let metrics = Arc::new(Metrics::new());
    let slot: Arc<Slot<u32, String>> = Arc::new(Slot::new());

    let waiter = {
      let slot = slot.clone();
      thread::spawn(move || slot.wait())
    };

    thread::sleep(Duration::from_millis(50));
    ResolveGuard::new(&slot, &metrics).resolve(Err("boom".to_string()));

    let outcome = waiter.join().unwrap();
    assert_eq!(outcome.unwrap_err().as_str(), "boom");
    assert_eq!(metrics.failures.load(Ordering::Relaxed), 1);
  }

  #[test]
  fn spurious_wakes_do_not_requeue_waiter() {
    let metrics = Metrics::new();
    let slot: Arc<Slot<u32, String>> = Arc::new(Slot::new());

    let waiter = {
      let slot = slot.clone();
      thread::spawn(move || slot.wait())
    };

    thread::sleep(Duration::from_millis(50));
    for _ in 0..5 {
      waiter.thread().unpark();
      thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(slot.inner.lock().waiters.len(), 1);

    ResolveGuard::new(&slot, &metrics).resolve(Ok(11));
    assert_eq!(*waiter.join().unwrap().unwrap(), 11);
  }

  #[test]
  fn dropped_guard_poisons_slot() {
    let metrics = Metrics::new();
    let slot: Slot<u32, String> = Slot::new();
    drop(ResolveGuard::new(&slot, &metrics));

    assert!(!slot.is_pending());
    assert!(slot.peek().is_none());
    assert_eq!(metrics.panics.load(Ordering::Relaxed), 1);

    let waited = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| slot.wait()));
    assert!(waited.is_err());
  }

  #[test]
  fn future_completes_after_resolve() {
    let metrics = Metrics::new();
    let slot: Slot<u32, String> = Slot::new();
    ResolveGuard::new(&slot, &metrics).resolve(Ok(3));

    let outcome = futures_executor::block_on(&slot);
    assert_eq!(*outcome.unwrap(), 3);
  }
}
