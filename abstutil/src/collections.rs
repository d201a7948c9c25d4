use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counts occurrences of each key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Counter<T: Ord> {
    map: BTreeMap<T, usize>,
    sum: usize,
}

impl<T: Ord + Clone> Default for Counter<T> {
    fn default() -> Self {
        Counter::new()
    }
}

impl<T: Ord + Clone> Counter<T> {
    pub fn new() -> Counter<T> {
        Counter {
            map: BTreeMap::new(),
            sum: 0,
        }
    }

    pub fn add(&mut self, val: T, amount: usize) -> usize {
        let entry = self.map.entry(val).or_insert(0);
        *entry += amount;
        self.sum += amount;
        *entry
    }

    pub fn inc(&mut self, val: T) -> usize {
        self.add(val, 1)
    }

    /// Returns 0 for unknown keys.
    pub fn get(&self, val: T) -> usize {
        self.map.get(&val).cloned().unwrap_or(0)
    }

    pub fn sum(&self) -> usize {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting() {
        let mut c = Counter::new();
        c.inc("a");
        c.inc("b");
        c.add("c", 3);
        assert_eq!(c.sum(), 5);
        assert_eq!(c.get("c"), 3);
        assert_eq!(c.get("missing"), 0);
    }
}
