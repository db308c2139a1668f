use rand::Rng;

/// A sequence guaranteed to hold at least one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonEmpty<T>(Vec<T>);

impl<T> NonEmpty<T> {
    /// Returns `None` for an empty vector.
    pub fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

/// Pick one item uniformly at random using the thread-local generator.
pub fn select<T>(items: &NonEmpty<T>) -> &T {
    select_with(items, &mut rand::thread_rng())
}

/// Pick one item uniformly at random. Each call is an independent trial.
pub fn select_with<'a, T, R: Rng + ?Sized>(items: &'a NonEmpty<T>, rng: &mut R) -> &'a T {
    let idx = rng.gen_range(0..items.0.len());
    &items.0[idx]
}
