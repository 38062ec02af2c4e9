use std::sync::Arc;

/// The memoized outcome of one computation.
///
/// Both the value and the error are stored behind an `Arc`, so neither `V`
/// nor `E` needs to be `Clone`. Every caller for a key receives a clone of
/// the same `Arc`, which makes "all callers saw the same result" a pointer
/// comparison.
pub type Outcome<V, E> = Result<Arc<V>, Arc<E>>;

/// Wraps a freshly computed `Result` into its shareable form.
#[inline]
pub(crate) fn share<V, E>(result: Result<V, E>) -> Outcome<V, E> {
  result.map(Arc::new).map_err(Arc::new)
}

/// Returns a cheap clone of an outcome (two `Arc` bumps at most).
#[inline]
pub(crate) fn clone_outcome<V, E>(outcome: &Outcome<V, E>) -> Outcome<V, E> {
  match outcome {
    Ok(value) => Ok(Arc::clone(value)),
    Err(error) => Err(Arc::clone(error)),
  }
}

/// The final, permanent state of a key.
#[derive(Debug)]
pub(crate) enum Resolution<V, E> {
  /// The computation returned, successfully or not.
  Resolved(Outcome<V, E>),
  /// The computation panicked or its future was dropped before it returned.
  /// The key is never computed again; every later caller panics.
  Poisoned,
}

impl<V, E> Resolution<V, E> {
  /// Returns the stored outcome, or `None` for a poisoned key.
  #[inline]
  pub(crate) fn outcome(&self) -> Option<Outcome<V, E>> {
    match self {
      Resolution::Resolved(outcome) => Some(clone_outcome(outcome)),
      Resolution::Poisoned => None,
    }
  }

  /// Returns the stored outcome, panicking if the key was poisoned.
  #[inline]
  pub(crate) fn expect_outcome(&self) -> Outcome<V, E> {
    match self.outcome() {
      Some(outcome) => outcome,
      None => poisoned_panic(),
    }
  }
}

#[cold]
#[inline(never)]
pub(crate) fn poisoned_panic() -> ! {
  panic!("the memoized computation for this key panicked or was cancelled");
}
