//! Lazy index enumerators
//!
//! Both iterators yield index vectors one at a time and keep only a single
//! cursor in memory.

/// k-element subsets of `0..n`, in lexicographic order
#[derive(Debug, Clone)]
pub struct KSubsets {
    n: usize,
    current: Option<Vec<usize>>,
}

impl KSubsets {
    pub fn new(n: usize, k: usize) -> Self {
        let current = (k > 0 && k <= n).then(|| (0..k).collect());
        Self { n, current }
    }
}

impl Iterator for KSubsets {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let k = current.len();

        // Advance: rightmost position that can still move
        let mut next = current.clone();
        let mut advanced = false;
        for i in (0..k).rev() {
            if next[i] < self.n - k + i {
                next[i] += 1;
                for j in i + 1..k {
                    next[j] = next[j - 1] + 1;
                }
                advanced = true;
                break;
            }
        }
        if advanced {
            self.current = Some(next);
        }

        Some(current)
    }
}

/// Mixed-radix counter over `radices`; the last position varies fastest
///
/// Yields nothing when `radices` is empty or any radix is zero.
#[derive(Debug, Clone)]
pub struct CartesianProduct {
    radices: Vec<usize>,
    current: Option<Vec<usize>>,
}

impl CartesianProduct {
    pub fn new(radices: Vec<usize>) -> Self {
        let current =
            (!radices.is_empty() && radices.iter().all(|&r| r > 0)).then(|| vec![0; radices.len()]);
        Self { radices, current }
    }
}

impl Iterator for CartesianProduct {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;

        let mut next = current.clone();
        for i in (0..next.len()).rev() {
            next[i] += 1;
            if next[i] < self.radices[i] {
                self.current = Some(next);
                break;
            }
            next[i] = 0;
        }

        Some(current)
    }
}
