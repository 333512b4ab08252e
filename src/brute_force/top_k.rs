//! Top-K selection.
//!
//! Per distance row, pick the K+1 smallest entries with a partial selection,
//! drop the query's own index if it is among them, and keep the first K of
//! what remains. Neither strategy orders the result by distance.

use crate::config::SelectionStrategy;
use crate::types::{point_index, Element, PointIndex};
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// A max-heap based top-k tracker.
///
/// Maintains the k smallest distances seen so far. The root is the largest
/// kept distance, so a candidate is accepted only if it beats the root.
/// Equal distances never displace an element already kept, so among ties the
/// earliest pushed indices win.
#[derive(Debug)]
pub struct TopK {
    /// Max-heap of (distance, index) pairs.
    heap: BinaryHeap<(OrderedFloat<Element>, PointIndex)>,

    /// Maximum capacity.
    k: usize,
}

impl TopK {
    /// Create a new top-k tracker.
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    /// Get the current size.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Get the capacity (k).
    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Get the current threshold distance.
    /// If we have k elements, this is the largest distance in the heap.
    /// Otherwise, returns infinity.
    pub fn threshold(&self) -> Element {
        if self.heap.len() >= self.k {
            self.heap.peek().map(|(d, _)| d.0).unwrap_or(Element::INFINITY)
        } else {
            Element::INFINITY
        }
    }

    /// Try to push a new element.
    /// Returns true if the element was added (distance < threshold).
    pub fn push(&mut self, index: PointIndex, distance: Element) -> bool {
        if self.heap.len() < self.k {
            self.heap.push((OrderedFloat(distance), index));
            true
        } else if let Some(&(max_dist, _)) = self.heap.peek() {
            if OrderedFloat(distance) < max_dist {
                self.heap.pop();
                self.heap.push((OrderedFloat(distance), index));
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    /// Clear the tracker and set a new capacity.
    pub fn reset(&mut self, k: usize) {
        self.heap.clear();
        self.k = k;
    }

    /// Drain kept indices in heap order (not sorted by distance).
    pub fn drain_unsorted(&mut self) -> impl Iterator<Item = PointIndex> + '_ {
        self.heap.drain().map(|(_, idx)| idx)
    }

    /// Get results sorted by distance (ascending).
    pub fn results(&self) -> Vec<(PointIndex, Element)> {
        let mut results: Vec<_> = self.heap.iter().map(|(d, idx)| (*idx, d.0)).collect();
        results.sort_by_key(|&(idx, d)| (OrderedFloat(d), idx));
        results
    }
}

/// Extracts the K nearest corpus indices from a distance row.
///
/// Holds scratch buffers, so one selector is reused across all rows of a
/// batch.
#[derive(Debug)]
pub struct TopKSelector {
    k: usize,
    strategy: SelectionStrategy,
    order: Vec<PointIndex>,
    heap: TopK,
}

impl TopKSelector {
    /// Create a selector returning `k` neighbors per row.
    pub fn new(k: usize, strategy: SelectionStrategy) -> Self {
        Self {
            k,
            strategy,
            order: Vec::new(),
            heap: TopK::new(k + 1),
        }
    }

    /// Number of neighbors per row.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The selection strategy.
    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Select the nearest entries of `row` into `out`.
    ///
    /// With `exclude = Some(q)`, K+1 candidates are selected and `q` is
    /// removed if present. When more than K other points tie with `q` at the
    /// minimum distance, the selection may legitimately leave `q` out of the
    /// K+1 candidates; then nothing is removed and the K+1-th candidate (an
    /// arbitrary member of the tie) is dropped instead.
    ///
    /// Writes at most `out.len()` indices (and at most `distances.len()`
    /// when given), with their distances into `distances`. Returns the number written, which is K
    /// whenever the row has more than K entries (or at least K without
    /// exclusion).
    pub fn select(
        &mut self,
        row: &[Element],
        exclude: Option<PointIndex>,
        out: &mut [PointIndex],
        mut distances: Option<&mut [Element]>,
    ) -> usize {
        let k = self
            .k
            .min(out.len())
            .min(distances.as_deref().map_or(usize::MAX, |d| d.len()));
        let take = match exclude {
            Some(_) => self.k + 1,
            None => self.k,
        }
        .min(row.len());

        let candidates = match self.strategy {
            SelectionStrategy::Partition => self.partition(row, take),
            SelectionStrategy::Heap => self.heap_select(row, take),
        };

        let mut written = 0;
        for &candidate in candidates {
            if written == k {
                break;
            }
            if Some(candidate) == exclude {
                continue;
            }
            out[written] = candidate;
            if let Some(dist) = distances.as_deref_mut() {
                dist[written] = row[candidate as usize];
            }
            written += 1;
        }
        written
    }

    /// Introselect: the `take` smallest land in the first `take` slots.
    fn partition(&mut self, row: &[Element], take: usize) -> &[PointIndex] {
        self.order.clear();
        self.order.extend(0..point_index(row.len()));
        if take > 0 && take < self.order.len() {
            self.order.select_nth_unstable_by_key(take - 1, |&i| OrderedFloat(row[i as usize]));
        }
        &self.order[..take]
    }

    /// Bounded max-heap of size `take` over the whole row.
    fn heap_select(&mut self, row: &[Element], take: usize) -> &[PointIndex] {
        self.heap.reset(take);
        for (i, &dist) in row.iter().enumerate() {
            self.heap.push(point_index(i), dist);
        }
        self.order.clear();
        self.order.extend(self.heap.drain_unsorted());
        &self.order
    }
}
