use tracing::{debug, trace};

use super::Predicate;
use crate::codevalue::CodeValue;
use crate::util::{BitTrie, NodeId, Slot};

/// Turns a [`BitTrie`] into an equivalent [`Predicate`] with as few
/// compare/jumps as it can find.
///
/// The trie is consumed node by node while the predicate is built; every
/// node must be gone once [`Pruner::run`] returns.
pub struct Pruner {
    trie: BitTrie,
    comparisons: usize,
}

impl Pruner {
    pub fn new(trie: BitTrie) -> Self {
        Self {
            trie,
            comparisons: 0,
        }
    }

    /// Builds the predicate and returns it with its compare/jump count.
    ///
    /// # Panics
    ///
    /// Panics if any trie node is left unconsumed.
    pub fn run(mut self) -> (Predicate, usize) {
        let nodes = self.trie.len();

        let predicate = if self.trie.is_empty() {
            Predicate::Constant(false)
        } else if self.trie.is_full() {
            Predicate::Constant(true)
        } else {
            let root = self.trie.root();
            self.prune(root, Prefix::default())
        };

        assert_eq!(
            self.trie.len(),
            0,
            "predicate construction left trie nodes unconsumed"
        );
        debug!(nodes, comparisons = self.comparisons, "pruned match trie");

        (predicate, self.comparisons)
    }

    fn prune(&mut self, mut frontier: NodeId, mut prefix: Prefix) -> Predicate {
        let mut chain = Vec::new();

        let tail = loop {
            match self.prune_base(frontier, prefix) {
                Base::Resolved(test) => break test,
                Base::Narrowed {
                    test,
                    node,
                    prefix: narrowed,
                } => {
                    chain.push(Link::And(test));
                    frontier = node;
                    prefix = narrowed;
                }
                Base::Unchanged => {}
            }

            // The frontier has two non-absent slots from here on
            if let Some(node) = self.merge_twins(frontier) {
                frontier = node;
                continue;
            }

            match self.prune_top(frontier, prefix) {
                Top::Resolved(test) => break test,
                Top::Pruned(test) => chain.push(Link::Or(test)),
                Top::Unchanged => break self.branch(frontier, prefix),
            }
        };

        chain.into_iter().rev().fold(tail, |rest, link| match link {
            Link::And(test) => Predicate::and(test, rest),
            Link::Or(test) => Predicate::or(test, rest),
        })
    }

    /// Folds a single-child chain starting at `frontier` into one test.
    fn prune_base(&mut self, frontier: NodeId, mut prefix: Prefix) -> Base {
        let mut node = frontier;
        while let Some((bit, slot)) = self.trie.node(node).single_child() {
            prefix = prefix.with(self.trie.node(node).pos(), bit);
            match slot {
                Slot::Node(child) => node = child,
                Slot::FullAccept => {
                    trace!(?prefix, "base chain ends in an accepting region");
                    self.trie.clear(node, bit);
                    return Base::Resolved(self.test(prefix, true));
                }
                Slot::Absent => unreachable!("single child is never absent"),
            }
        }

        if node == frontier {
            return Base::Unchanged;
        }

        trace!(?prefix, "base chain narrowed");
        Base::Narrowed {
            test: self.test(prefix, true),
            node,
            prefix,
        }
    }

    /// Drops the frontier's bit when both of its subtrees are identical.
    fn merge_twins(&mut self, frontier: NodeId) -> Option<NodeId> {
        let node = self.trie.node(frontier);
        let (on @ Slot::Node(_), Slot::Node(off)) = (node.on(), node.off()) else {
            return None;
        };
        if !self.trie.same_subtree(on, Slot::Node(off)) {
            return None;
        }

        trace!(bit = node.pos(), "merged identical subtrees");
        self.trie.clear(frontier, true);
        Some(off)
    }

    /// Removes an accepting region reachable through single-child links.
    fn prune_top(&mut self, frontier: NodeId, prefix: Prefix) -> Top {
        let node = self.trie.node(frontier);
        let pos = node.pos();

        let accepting = match (node.on(), node.off()) {
            (Slot::FullAccept, _) => Some(true),
            (_, Slot::FullAccept) => Some(false),
            _ => None,
        };

        if let Some(bit) = accepting {
            if let Some(hole) = self.find_hole(frontier, prefix) {
                // Everything but one region is accepted
                trace!(?hole, "subtree accepts all but one region");
                self.trie.clear(frontier, !bit);
                self.trie.clear(frontier, bit);
                return Top::Resolved(self.test(hole, false));
            }

            let region = prefix.with(pos, bit);
            self.trie.clear(frontier, bit);
            return Top::Pruned(self.test(region, true));
        }

        let on = self.find_region(node.on(), prefix.with(pos, true));
        let off = self.find_region(node.off(), prefix.with(pos, false));
        let region = match (on, off) {
            (Some(on), Some(off)) => Some(if on.depth > off.depth { on } else { off }),
            (on, off) => on.or(off),
        };

        match region {
            Some(region) => {
                trace!(prefix = ?region.prefix, "pruned accepting branch");
                self.trie.clear(region.node, region.bit);
                Top::Pruned(self.test(region.prefix, true))
            }
            None => Top::Unchanged,
        }
    }

    /// Follows a single-child chain down to an accepting slot.
    fn find_region(&self, slot: Slot, mut prefix: Prefix) -> Option<Region> {
        let Slot::Node(mut id) = slot else {
            return None;
        };

        let mut depth = 0;
        loop {
            let node = self.trie.node(id);
            let (bit, child) = node.single_child()?;
            prefix = prefix.with(node.pos(), bit);
            depth += 1;
            match child {
                Slot::Node(child) => id = child,
                Slot::FullAccept => {
                    return Some(Region {
                        node: id,
                        bit,
                        prefix,
                        depth,
                    })
                }
                Slot::Absent => unreachable!("single child is never absent"),
            }
        }
    }

    /// Finds the only rejected region of a subtree where every node has an
    /// accepting slot.
    fn find_hole(&self, frontier: NodeId, mut prefix: Prefix) -> Option<Prefix> {
        let mut id = frontier;
        loop {
            let node = self.trie.node(id);
            let pos = node.pos();
            match (node.on(), node.off()) {
                (Slot::FullAccept, Slot::Absent) => return Some(prefix.with(pos, false)),
                (Slot::Absent, Slot::FullAccept) => return Some(prefix.with(pos, true)),
                (Slot::FullAccept, Slot::Node(child)) => {
                    prefix = prefix.with(pos, false);
                    id = child;
                }
                (Slot::Node(child), Slot::FullAccept) => {
                    prefix = prefix.with(pos, true);
                    id = child;
                }
                _ => return None,
            }
        }
    }

    fn branch(&mut self, frontier: NodeId, prefix: Prefix) -> Predicate {
        let node = self.trie.node(frontier);
        let pos = node.pos();
        let (Slot::Node(on), Slot::Node(off)) = (node.on(), node.off()) else {
            panic!("branching on a node without two live children");
        };

        self.comparisons += 1;
        let on = self.prune(on, prefix.with(pos, true));
        let off = self.prune(off, prefix.with(pos, false));
        Predicate::conditional(pos, on, off)
    }

    fn test(&mut self, prefix: Prefix, equals: bool) -> Predicate {
        self.comparisons += 1;
        Predicate::bit_test(prefix.mask, prefix.value, equals)
    }
}

/// Bits fixed along the path to a node.
#[derive(Default, Clone, Copy, Eq, PartialEq)]
struct Prefix {
    mask: CodeValue,
    value: CodeValue,
}

impl Prefix {
    fn with(self, pos: CodeValue, bit: bool) -> Self {
        Self {
            mask: self.mask | pos,
            value: if bit { self.value | pos } else { self.value },
        }
    }
}

impl std::fmt::Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}/{:#x}", self.value, self.mask)
    }
}

struct Region {
    node: NodeId,
    bit: bool,
    prefix: Prefix,
    depth: u32,
}

enum Base {
    Unchanged,
    /// The whole frontier subtree is one test.
    Resolved(Predicate),
    /// The frontier moved down to `node`, guarded by `test`.
    Narrowed {
        test: Predicate,
        node: NodeId,
        prefix: Prefix,
    },
}

enum Top {
    Unchanged,
    /// The whole frontier subtree is one test.
    Resolved(Predicate),
    /// An accepting region was removed from the frontier subtree.
    Pruned(Predicate),
}

enum Link {
    And(Predicate),
    Or(Predicate),
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::codevalue::CodeWidth;

    fn build(bits: u32, values: &[CodeValue]) -> (Predicate, usize) {
        let width = CodeWidth::new(bits).unwrap();
        let mut values = values.to_vec();
        values.sort_unstable();
        values.dedup();

        let trie = BitTrie::from_sorted(width, values.iter().copied());
        let (predicate, comparisons) = Pruner::new(trie).run();
        println!("{predicate}");

        for c in 0..=width.max_value() {
            assert_eq!(predicate.evaluate(c), values.binary_search(&c).is_ok(), "value {c:#x}");
        }
        assert_eq!(predicate.comparisons(), comparisons);
        (predicate, comparisons)
    }

    #[test]
    fn constants() {
        assert_eq!(build(4, &[]), (Predicate::Constant(false), 0));
        assert_eq!(build(4, &(0..16).collect::<Vec<_>>()), (Predicate::Constant(true), 0));
    }

    #[test]
    fn single_branch() {
        assert_eq!(build(4, &[0]), (Predicate::bit_test(0xf, 0x0, true), 1));
        assert_eq!(build(4, &[0, 1]), (Predicate::bit_test(0xe, 0x0, true), 1));
        assert_eq!(build(4, &[5]), (Predicate::bit_test(0xf, 0x5, true), 1));
        assert_eq!(
            build(4, &[4, 5, 6, 7]),
            (Predicate::bit_test(0xc, 0x4, true), 1)
        );
    }

    #[test]
    fn irrelevant_bits() {
        let evens = (0..16).step_by(2).collect::<Vec<_>>();
        assert_eq!(build(4, &evens), (Predicate::bit_test(0x1, 0x0, true), 1));

        assert_eq!(build(4, &[0, 8]), (Predicate::bit_test(0x7, 0x0, true), 1));
    }

    #[test]
    fn all_but_one_region() {
        assert_eq!(
            build(4, &[0, 1, 2]),
            (
                Predicate::and(
                    Predicate::bit_test(0xc, 0x0, true),
                    Predicate::bit_test(0xf, 0x3, false),
                ),
                2
            )
        );

        let values = (0..16).filter(|&c| c != 9).collect::<Vec<_>>();
        assert_eq!(build(4, &values), (Predicate::bit_test(0xf, 0x9, false), 1));
    }

    #[test]
    fn accepting_half() {
        // 1*** plus 0011
        let mut values = vec![3];
        values.extend(8..16);
        let (predicate, comparisons) = build(4, &values);
        assert_eq!(comparisons, 2);
        assert_eq!(
            predicate,
            Predicate::or(
                Predicate::bit_test(0x8, 0x8, true),
                Predicate::bit_test(0xf, 0x3, true),
            )
        );
    }

    #[test]
    fn deeper_region_wins() {
        // on side 11** is one level deep, off side 001* is two
        assert_eq!(
            build(4, &[2, 3, 12, 13, 14, 15]),
            (
                Predicate::or(
                    Predicate::bit_test(0xe, 0x2, true),
                    Predicate::bit_test(0xc, 0xc, true),
                ),
                2
            )
        );
    }

    #[test]
    fn branches() {
        let (predicate, _) = build(4, &[1, 2, 13, 14, 15]);
        assert!(matches!(predicate, Predicate::Conditional { bit: 0x8, .. }));

        build(8, &[0x41, 0x42, 0x43, 0x5a, 0x61, 0x7a, 0xc0, 0xd6, 0xd8, 0xf6]);
        build(6, &[0, 5, 6, 17, 33, 34, 35, 40, 41, 60, 63]);
    }

    #[test]
    fn full_width_domain() {
        let (predicate, _) = {
            let width = CodeWidth::MAX;
            let trie = BitTrie::from_sorted(width, [0x41, 0x10ffff, u32::MAX]);
            Pruner::new(trie).run()
        };

        for c in [0x41, 0x10ffff, u32::MAX] {
            assert!(predicate.evaluate(c));
        }
        for c in [0, 0x40, 0x42, 0x10fffe, u32::MAX - 1] {
            assert!(!predicate.evaluate(c));
        }
    }

    #[test]
    fn duplicates_do_not_change_result() {
        let width = CodeWidth::new(5).unwrap();
        let values = [1, 4, 5, 6, 19, 30];
        let duplicated = [1, 1, 4, 5, 5, 5, 6, 19, 19, 30];

        let plain = BitTrie::from_sorted(width, values);
        let mut inserted = BitTrie::new(width);
        for value in duplicated {
            inserted.insert(value);
        }
        assert_eq!(plain.len(), inserted.len());

        assert_eq!(Pruner::new(plain).run(), Pruner::new(inserted).run());
    }

    fn membership() -> impl Strategy<Value = (u32, Vec<bool>)> {
        (1u32..=8, 0.0..1.0f64).prop_flat_map(|(bits, density)| {
            (
                Just(bits),
                proptest::collection::vec(proptest::bool::weighted(density), 1usize << bits),
            )
        })
    }

    proptest! {
        #[test]
        fn equivalent_to_membership((bits, members) in membership()) {
            let width = CodeWidth::new(bits).unwrap();
            let values = (0..=width.max_value()).filter(|&c| members[c as usize]);
            let (predicate, comparisons) = Pruner::new(BitTrie::from_sorted(width, values)).run();

            for c in 0..=width.max_value() {
                prop_assert_eq!(predicate.evaluate(c), members[c as usize]);
            }
            prop_assert_eq!(predicate.comparisons(), comparisons);
            prop_assert!(predicate.worst_case() <= comparisons);
        }

        #[test]
        fn deterministic((bits, members) in membership()) {
            let width = CodeWidth::new(bits).unwrap();
            let values = (0..=width.max_value())
                .filter(|&c| members[c as usize])
                .collect::<Vec<_>>();

            let first = Pruner::new(BitTrie::from_sorted(width, values.iter().copied())).run();
            let second = Pruner::new(BitTrie::from_sorted(width, values.iter().copied())).run();
            prop_assert_eq!(first, second);
        }
    }
}
