//! Enumeration of set partitions into a fixed number of groups.
//!
//! A partition of `n` items into `k` groups is encoded as a restricted growth
//! string `a`: `a[i]` is the group of item `i`, `a[0] == 0`,
//! `a[i] <= max(a[..i]) + 1` and `max(a) == k - 1`. Walking these strings in
//! lexicographic order visits every partition exactly once, S(n, k) in total,
//! without recursion.

use crate::errors::{FilterCalcError, Result};

/// A partition as produced by [`SetPartitions`]: groups ordered by their first
/// element, elements in input order.
pub type Partition<T> = Vec<Vec<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Fresh,
    Running,
    Done,
}

/// Lazy iterator over all partitions of `items` into exactly `k` non-empty
/// groups.
#[derive(Debug, Clone)]
pub struct SetPartitions<T> {
    items: Vec<T>,
    k: usize,
    rgs: Vec<usize>,
    // prefix_max[i] == max(rgs[..=i])
    prefix_max: Vec<usize>,
    cursor: Cursor,
}

impl<T: Clone> SetPartitions<T> {
    pub fn new(items: Vec<T>, k: usize) -> Result<Self> {
        if items.is_empty() {
            return Err(FilterCalcError::invalid_argument(
                "can't partition an empty sequence",
            ));
        }
        if k == 0 {
            return Err(FilterCalcError::invalid_argument(
                "the number of groups must be positive",
            ));
        }
        if k > items.len() {
            return Err(FilterCalcError::invalid_argument(format!(
                "can't split {} items into {k} non-empty groups",
                items.len()
            )));
        }
        let n = items.len();
        let mut partitions = Self {
            items,
            k,
            rgs: vec![0; n],
            prefix_max: vec![0; n],
            cursor: Cursor::Fresh,
        };
        partitions.reset();
        Ok(partitions)
    }

    /// Number of partitions this iterator yields in total.
    pub fn count_total(&self) -> u128 {
        stirling2(self.items.len(), self.k)
    }

    /// Restarts the enumeration at the first partition.
    pub fn reset(&mut self) {
        let n = self.items.len();
        // the lexicographically smallest string: zeros, then the remaining
        // groups opened one per trailing position
        let zeros = n - self.k + 1;
        for i in 0..n {
            let group = i.saturating_sub(zeros - 1);
            self.rgs[i] = group;
            self.prefix_max[i] = group;
        }
        self.cursor = Cursor::Fresh;
    }

    /// Advances to the next partition and returns its group assignment, one
    /// group index per item.
    pub fn next_assignment(&mut self) -> Option<&[usize]> {
        match self.cursor {
            Cursor::Done => return None,
            Cursor::Fresh => self.cursor = Cursor::Running,
            Cursor::Running => {
                if !self.advance() {
                    self.cursor = Cursor::Done;
                    return None;
                }
            }
        }
        Some(&self.rgs)
    }

    fn advance(&mut self) -> bool {
        let n = self.rgs.len();
        for i in (1..n).rev() {
            let prev_max = self.prefix_max[i - 1];
            let next = self.rgs[i] + 1;
            if next > prev_max + 1 || next >= self.k {
                continue;
            }
            let max = prev_max.max(next);
            let unopened = self.k - 1 - max;
            if n - 1 - i < unopened {
                continue;
            }
            self.rgs[i] = next;
            self.prefix_max[i] = max;
            let first_opening = n - unopened;
            for j in i + 1..n {
                if j < first_opening {
                    self.rgs[j] = 0;
                    self.prefix_max[j] = max;
                } else {
                    let group = max + 1 + (j - first_opening);
                    self.rgs[j] = group;
                    self.prefix_max[j] = group;
                }
            }
            return true;
        }
        false
    }

    fn materialize(&self) -> Partition<T> {
        materialize(&self.items, &self.rgs, self.k)
    }
}

impl<T: Clone> Iterator for SetPartitions<T> {
    type Item = Partition<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_assignment()?;
        Some(self.materialize())
    }
}

/// Builds the groups described by a group assignment.
pub fn materialize<T: Clone>(items: &[T], assignment: &[usize], k: usize) -> Partition<T> {
    let mut groups = vec![Vec::new(); k];
    for (item, &group) in items.iter().zip(assignment) {
        groups[group].push(item.clone());
    }
    groups
}

/// Stirling number of the second kind, saturating at `u128::MAX`.
pub fn stirling2(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    if n == 0 {
        return 1;
    }
    // row[j] == S(i, j)
    let mut row = vec![0u128; k + 1];
    row[0] = 1;
    for i in 1..=n {
        for j in (1..=k.min(i)).rev() {
            row[j] = (j as u128)
                .saturating_mul(row[j])
                .saturating_add(row[j - 1]);
        }
        row[0] = 0;
    }
    row[k]
}
