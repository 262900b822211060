use crate::codevalue::{CodeValue, CodeWidth};

/// Binary trie over the bits of a code value, most significant bit first.
///
/// The trie stays minimal after every mutation: a node whose both slots
/// accept everything collapses into [`Slot::FullAccept`] in its parent, and a
/// node whose both slots are [`Slot::Absent`] is removed. The root is never
/// removed and is not included in [`BitTrie::len`].
#[derive(Clone)]
pub struct BitTrie {
    width: CodeWidth,
    nodes: Vec<Option<TrieNode>>,
    count: usize,
}

impl BitTrie {
    pub fn new(width: CodeWidth) -> Self {
        Self {
            width,
            nodes: vec![Some(TrieNode::new(width.high_bit(), None))],
            count: 0,
        }
    }

    /// Builds a trie from an ascending, duplicate-free sequence.
    ///
    /// Duplicates are tolerated and ignored.
    pub fn from_sorted<I>(width: CodeWidth, values: I) -> Self
    where
        I: IntoIterator<Item = CodeValue>,
    {
        let mut trie = Self::new(width);
        let mut last = None;
        for value in values {
            if last != Some(value) {
                trie.insert(value);
                last = Some(value);
            }
        }
        trie
    }

    pub fn width(&self) -> CodeWidth {
        self.width
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of live nodes below the root.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the trie matches nothing.
    pub fn is_empty(&self) -> bool {
        let root = self.node(NodeId::ROOT);
        root.on == Slot::Absent && root.off == Slot::Absent
    }

    /// Whether the trie matches the whole domain.
    pub fn is_full(&self) -> bool {
        let root = self.node(NodeId::ROOT);
        root.on == Slot::FullAccept && root.off == Slot::FullAccept
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        match self.nodes.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("trie node {id:?} is not live"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TrieNode {
        match self.nodes.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("trie node {id:?} is not live"),
        }
    }

    /// Adds a value to the set. Returns `false` if it was already covered.
    pub fn insert(&mut self, value: CodeValue) -> bool {
        debug_assert!(self.width.contains(value), "{value:#x} is out of domain");

        let mut id = NodeId::ROOT;
        loop {
            let node = self.node(id);
            let pos = node.pos;
            let bit = value & pos != 0;
            match node.slot(bit) {
                Slot::FullAccept => return false,
                Slot::Node(child) => id = child,
                Slot::Absent if pos == 1 => {
                    *self.node_mut(id).slot_mut(bit) = Slot::FullAccept;
                    break;
                }
                Slot::Absent => {
                    let child = self.alloc(TrieNode::new(pos >> 1, Some(id)));
                    *self.node_mut(id).slot_mut(bit) = Slot::Node(child);
                    id = child;
                }
            }
        }

        self.trim_up(id);
        true
    }

    pub fn contains(&self, value: CodeValue) -> bool {
        let mut id = NodeId::ROOT;
        loop {
            let node = self.node(id);
            match node.slot(value & node.pos != 0) {
                Slot::Absent => return false,
                Slot::FullAccept => return true,
                Slot::Node(child) => id = child,
            }
        }
    }

    /// Empties the `bit` slot of `id`, releasing any subtree it held, and
    /// removes the ancestors left without children.
    ///
    /// Returns the number of removed nodes.
    pub fn clear(&mut self, id: NodeId, bit: bool) -> usize {
        let slot = std::mem::replace(self.node_mut(id).slot_mut(bit), Slot::Absent);
        let released = match slot {
            Slot::Node(child) => self.release(child),
            Slot::Absent | Slot::FullAccept => 0,
        };
        released + self.remove_up(id)
    }

    /// Structural equality of two slots. The trie is canonical, so this is
    /// equality of the membership functions below them.
    pub fn same_subtree(&self, left: Slot, right: Slot) -> bool {
        let mut stack = vec![(left, right)];
        while let Some(pair) = stack.pop() {
            match pair {
                (Slot::Node(a), Slot::Node(b)) => {
                    let (a, b) = (self.node(a), self.node(b));
                    stack.push((a.on, b.on));
                    stack.push((a.off, b.off));
                }
                (Slot::Absent, Slot::Absent) | (Slot::FullAccept, Slot::FullAccept) => {}
                _ => return false,
            }
        }
        true
    }

    fn alloc(&mut self, node: TrieNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        self.count += 1;
        id
    }

    fn free(&mut self, id: NodeId) {
        debug_assert_ne!(id, NodeId::ROOT);
        if let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) {
            debug_assert!(!matches!(node.on, Slot::Node(_)) && !matches!(node.off, Slot::Node(_)));
            self.count -= 1;
        }
    }

    /// Drops a whole subtree. The parent slot is left to the caller.
    fn release(&mut self, id: NodeId) -> usize {
        let mut released = 0;
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
                continue;
            };
            for slot in [node.on, node.off] {
                if let Slot::Node(child) = slot {
                    stack.push(child);
                }
            }
            self.count -= 1;
            released += 1;
        }
        released
    }

    /// Collapse cascade: replaces fully accepting nodes with
    /// [`Slot::FullAccept`] from `id` upwards.
    fn trim_up(&mut self, mut id: NodeId) -> usize {
        let mut collapsed = 0;
        loop {
            let node = self.node(id);
            let Some(parent) = node.parent else { break };
            if node.on != Slot::FullAccept || node.off != Slot::FullAccept {
                break;
            }

            *self.node_mut(parent).slot_of_mut(id) = Slot::FullAccept;
            self.free(id);
            collapsed += 1;
            id = parent;
        }
        collapsed
    }

    /// Remove cascade: deletes childless nodes from `id` upwards.
    fn remove_up(&mut self, mut id: NodeId) -> usize {
        let mut removed = 0;
        loop {
            let node = self.node(id);
            let Some(parent) = node.parent else { break };
            if node.on != Slot::Absent || node.off != Slot::Absent {
                break;
            }

            *self.node_mut(parent).slot_of_mut(id) = Slot::Absent;
            self.free(id);
            removed += 1;
            id = parent;
        }
        removed
    }
}

impl std::fmt::Debug for BitTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        struct Path(CodeValue, u32);

        impl std::fmt::Debug for Path {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let Path(prefix, len) = *self;
                if len > 0 {
                    let len = len as usize;
                    f.write_fmt(format_args!("{prefix:0len$b}"))
                } else {
                    f.write_str("root")
                }
            }
        }

        let mut map = f.debug_map();

        let mut stack = vec![(NodeId::ROOT, 0, 0)];
        while let Some((id, prefix, len)) = stack.pop() {
            let node = self.node(id);
            map.entry(&Path(prefix, len), &(node.off, node.on));

            if let Slot::Node(on) = node.on {
                stack.push((on, (prefix << 1) | 1, len + 1));
            }
            if let Slot::Node(off) = node.off {
                stack.push((off, prefix << 1, len + 1));
            }
        }

        map.finish()
    }
}

#[derive(Debug, Clone)]
pub struct TrieNode {
    pos: CodeValue,
    on: Slot,
    off: Slot,
    parent: Option<NodeId>,
}

impl TrieNode {
    fn new(pos: CodeValue, parent: Option<NodeId>) -> Self {
        Self {
            pos,
            on: Slot::Absent,
            off: Slot::Absent,
            parent,
        }
    }

    /// Single-bit mask tested by this node.
    pub fn pos(&self) -> CodeValue {
        self.pos
    }

    pub fn on(&self) -> Slot {
        self.on
    }

    pub fn off(&self) -> Slot {
        self.off
    }

    pub fn slot(&self, bit: bool) -> Slot {
        if bit {
            self.on
        } else {
            self.off
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The only non-absent slot, if the other one is absent.
    pub fn single_child(&self) -> Option<(bool, Slot)> {
        match (self.on, self.off) {
            (Slot::Absent, Slot::Absent) => None,
            (slot, Slot::Absent) => Some((true, slot)),
            (Slot::Absent, slot) => Some((false, slot)),
            _ => None,
        }
    }

    fn slot_mut(&mut self, bit: bool) -> &mut Slot {
        if bit {
            &mut self.on
        } else {
            &mut self.off
        }
    }

    fn slot_of_mut(&mut self, child: NodeId) -> &mut Slot {
        if self.on == Slot::Node(child) {
            &mut self.on
        } else {
            debug_assert_eq!(self.off, Slot::Node(child));
            &mut self.off
        }
    }
}

/// Arena index of a trie node.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    const ROOT: Self = Self(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Child slot of a trie node.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Slot {
    /// No value takes this branch.
    Absent,
    /// Live child node.
    Node(NodeId),
    /// Every value sharing this prefix is in the set.
    FullAccept,
}
