//! Bit-set closure arrays indexed by dense node position

use fixedbitset::FixedBitSet;
use std::collections::VecDeque;

/// Closure state of a built graph.
///
/// Every array holds one lazily allocated bit-set per dense node index; a
/// `None` slot is an empty set.
#[derive(Debug, Clone)]
pub(crate) struct Closure {
    len: usize,
    parents: Vec<Option<FixedBitSet>>,
    children: Vec<Option<FixedBitSet>>,
    descendants: Vec<Option<FixedBitSet>>,
    indirect_ancestors: Vec<Option<FixedBitSet>>,
}

fn bits_mut(slot: &mut Option<FixedBitSet>, len: usize) -> &mut FixedBitSet {
    slot.get_or_insert_with(|| FixedBitSet::with_capacity(len))
}

fn count(slot: &Option<FixedBitSet>) -> usize {
    slot.as_ref().map_or(0, |bits| bits.count_ones(..))
}

fn members(slot: &Option<FixedBitSet>) -> Vec<usize> {
    slot.as_ref().map(|bits| bits.ones().collect()).unwrap_or_default()
}

impl Closure {
    pub(crate) fn new(len: usize) -> Self {
        Closure {
            len,
            parents: vec![None; len],
            children: vec![None; len],
            descendants: vec![None; len],
            indirect_ancestors: vec![None; len],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Record that `parent` is a direct parent of `child`.
    pub(crate) fn link(&mut self, child: usize, parent: usize) {
        bits_mut(&mut self.parents[child], self.len).insert(parent);
        bits_mut(&mut self.children[parent], self.len).insert(child);
    }

    pub(crate) fn parents(&self, index: usize) -> Option<&FixedBitSet> {
        self.parents[index].as_ref()
    }

    pub(crate) fn children(&self, index: usize) -> Option<&FixedBitSet> {
        self.children[index].as_ref()
    }

    pub(crate) fn descendants(&self, index: usize) -> Option<&FixedBitSet> {
        self.descendants[index].as_ref()
    }

    pub(crate) fn indirect_ancestors(&self, index: usize) -> Option<&FixedBitSet> {
        self.indirect_ancestors[index].as_ref()
    }

    /// Push ancestor information from the roots down.
    ///
    /// A node is dequeued only after all of its parents were processed, so
    /// every parent contributes its complete set. Nodes on or below a cycle
    /// are never released and keep a partial set.
    pub(crate) fn propagate_ancestors(&mut self) {
        let mut pending: Vec<usize> = self.parents.iter().map(count).collect();
        let mut queue: VecDeque<usize> = (0..self.len)
            .filter(|&i| pending[i] == 0 && self.children[i].is_some())
            .collect();

        while let Some(current) = queue.pop_front() {
            let mut inherited = self.parents[current]
                .clone()
                .unwrap_or_else(|| FixedBitSet::with_capacity(self.len));
            if let Some(indirect) = &self.indirect_ancestors[current] {
                inherited.union_with(indirect);
            }
            let has_inherited = inherited.count_ones(..) > 0;

            for child in members(&self.children[current]) {
                if has_inherited {
                    bits_mut(&mut self.indirect_ancestors[child], self.len).union_with(&inherited);
                }
                pending[child] -= 1;
                // leaves end the branch
                if pending[child] == 0 && self.children[child].is_some() {
                    queue.push_back(child);
                }
            }
        }
    }

    /// Push descendant information from the leaves up, seeded with the
    /// direct children of every node.
    pub(crate) fn propagate_descendants(&mut self) {
        self.descendants = self.children.clone();

        let mut pending: Vec<usize> = self.children.iter().map(count).collect();
        let mut queue: VecDeque<usize> = (0..self.len)
            .filter(|&i| pending[i] == 0 && self.parents[i].is_some())
            .collect();

        while let Some(current) = queue.pop_front() {
            let below = self.descendants[current].clone();

            for parent in members(&self.parents[current]) {
                if let Some(below) = &below {
                    bits_mut(&mut self.descendants[parent], self.len).union_with(below);
                }
                pending[parent] -= 1;
                if pending[parent] == 0 && self.parents[parent].is_some() {
                    queue.push_back(parent);
                }
            }
        }
    }
}
