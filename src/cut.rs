use serde::Serialize;

/// A constant lower bound on the recourse cost surrogate, generated from
/// the dispatch cost realized at the commitment sampled in `iteration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cut {
    pub iteration: usize,
    pub bound_value: f64,
}

impl Cut {
    pub fn new(iteration: usize, bound_value: f64) -> Self {
        Self {
            iteration,
            bound_value,
        }
    }
}

/// Append-only, ordered collection of the cuts generated so far. Every
/// cut stays live for all the subsequent master solves.
#[derive(Debug, Default)]
pub struct CutStore {
    pool: Vec<Cut>,
}

impl CutStore {
    pub fn new() -> Self {
        Self { pool: vec![] }
    }

    pub fn add(&mut self, iteration: usize, bound_value: f64) {
        self.pool.push(Cut::new(iteration, bound_value));
    }

    pub fn all(&self) -> &[Cut] {
        &self.pool
    }

    /// Cuts added after the first `count`, in insertion order
    pub fn since(&self, count: usize) -> &[Cut] {
        self.pool.get(count..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cut() {
        let cut = Cut::new(1, 10.0);
        assert_eq!(cut.iteration, 1);
        assert_eq!(cut.bound_value, 10.0);
    }

    #[test]
    fn test_new_cut_store() {
        let store = CutStore::new();
        assert!(store.is_empty());
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_cut_store_keeps_insertion_order() {
        let mut store = CutStore::new();
        store.add(1, 30.0);
        store.add(2, 10.0);
        store.add(3, 30.0);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.all(),
            &[Cut::new(1, 30.0), Cut::new(2, 10.0), Cut::new(3, 30.0)]
        );
    }

    #[test]
    fn test_cut_store_since() {
        let mut store = CutStore::new();
        store.add(1, 5.0);
        store.add(2, 7.0);
        assert_eq!(store.since(0).len(), 2);
        assert_eq!(store.since(1), &[Cut::new(2, 7.0)]);
        assert!(store.since(2).is_empty());
        assert!(store.since(5).is_empty());
    }
}
