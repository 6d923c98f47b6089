//! Building the automaton in two steps: patterns are inserted into a
//! nondeterministic graph whose edges point at interned node sets, then
//! [`disambiguate`] turns every reachable node set into one deterministic state.

use std::collections::HashMap;

use tracing::debug;

use crate::RouteBuildError;

pub(super) type NodeId = u32;
pub(super) type StateId = u32;
pub(super) type VarSlot = u8;
type EdgeSetId = u32;

pub(super) const MAX_PLACEHOLDERS: usize = 64;
/// Closes every pattern and every matched path.
pub(super) const TERMINATOR: u8 = 0;
pub(super) const ROOT: NodeId = 0;
pub(super) const NO_EDGE: StateId = StateId::MAX;
const EMPTY_SET: EdgeSetId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Segment {
    Literal(u8),
    Placeholder(VarSlot),
    Wildcard,
}

#[derive(Debug)]
pub(super) struct ParsedPattern {
    pub(super) segments: Vec<Segment>,
    pub(super) var_names: Vec<String>,
}

/// Splits a pattern into literal bytes, `:name` placeholders and a final `*`.
pub(super) fn parse_pattern(pattern: &str) -> Result<ParsedPattern, RouteBuildError> {
    let bytes = pattern.as_bytes();
    let mut segments = Vec::with_capacity(bytes.len());
    let mut var_names: Vec<String> = Vec::new();
    let mut after_variable = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b':' => {
                if after_variable {
                    return Err(RouteBuildError::AdjacentPlaceholders { pattern: pattern.to_owned() });
                }
                let name_len = bytes[i + 1..].iter().take_while(|b| b.is_ascii_alphanumeric() || **b == b'_').count();
                if name_len == 0 {
                    return Err(RouteBuildError::EmptyPlaceholderName { pattern: pattern.to_owned() });
                }
                let name = &pattern[i + 1..i + 1 + name_len];
                if var_names.iter().any(|known| known == name) {
                    return Err(RouteBuildError::DuplicatePlaceholder { pattern: pattern.to_owned(), name: name.to_owned() });
                }
                if var_names.len() == MAX_PLACEHOLDERS {
                    return Err(RouteBuildError::TooManyPlaceholders { pattern: pattern.to_owned(), max: MAX_PLACEHOLDERS });
                }
                segments.push(Segment::Placeholder(var_names.len() as VarSlot));
                var_names.push(name.to_owned());
                after_variable = true;
                i += 1 + name_len;
            }
            b'*' => {
                if after_variable {
                    return Err(RouteBuildError::AdjacentPlaceholders { pattern: pattern.to_owned() });
                }
                if i + 1 != bytes.len() {
                    return Err(RouteBuildError::WildcardNotAtEnd { pattern: pattern.to_owned() });
                }
                segments.push(Segment::Wildcard);
                after_variable = true;
                i += 1;
            }
            byte => {
                segments.push(Segment::Literal(byte));
                after_variable = false;
                i += 1;
            }
        }
    }

    Ok(ParsedPattern { segments, var_names })
}

/// Hash-consed sets of successor nodes, kept sorted; id `0` is the empty set.
#[derive(Debug)]
pub(super) struct EdgeSetInterner {
    sets: Vec<Box<[NodeId]>>,
    ids: HashMap<Box<[NodeId]>, EdgeSetId>,
}

impl EdgeSetInterner {
    fn new() -> Self {
        let empty: Box<[NodeId]> = Box::default();
        Self { sets: vec![empty.clone()], ids: HashMap::from([(empty, EMPTY_SET)]) }
    }

    pub(super) fn get(&self, id: EdgeSetId) -> &[NodeId] {
        &self.sets[id as usize]
    }

    /// `members` must be sorted and free of duplicates.
    fn intern(&mut self, members: Vec<NodeId>) -> EdgeSetId {
        if let Some(id) = self.ids.get(members.as_slice()) {
            return *id;
        }
        let id = self.sets.len() as EdgeSetId;
        let members = members.into_boxed_slice();
        self.sets.push(members.clone());
        self.ids.insert(members, id);
        id
    }

    fn with_member(&mut self, id: EdgeSetId, node: NodeId) -> EdgeSetId {
        let set = self.get(id);
        match set.binary_search(&node) {
            Ok(_) => id,
            Err(pos) => {
                let mut members = Vec::with_capacity(set.len() + 1);
                members.extend_from_slice(&set[..pos]);
                members.push(node);
                members.extend_from_slice(&set[pos..]);
                self.intern(members)
            }
        }
    }

    fn len(&self) -> usize {
        self.sets.len()
    }
}

#[derive(Debug)]
pub(super) struct NfaNode {
    edges: Box<[EdgeSetId; 256]>,
    /// The terminal whose pattern created the node; `None` for the root.
    pub(super) owner: Option<usize>,
    pub(super) accepts: bool,
}

impl NfaNode {
    fn new(owner: Option<usize>) -> Self {
        Self { edges: Box::new([EMPTY_SET; 256]), owner, accepts: false }
    }
}

/// The nondeterministic graph, patterns are only ever appended.
#[derive(Debug)]
pub(super) struct NfaBuilder {
    nodes: Vec<NfaNode>,
    interner: EdgeSetInterner,
}

/// Where one pattern ended up in the graph.
#[derive(Debug)]
pub(super) struct InsertedPattern {
    pub(super) accept: NodeId,
    pub(super) var_map: HashMap<NodeId, VarSlot>,
}

impl NfaBuilder {
    pub(super) fn new() -> Self {
        Self { nodes: vec![NfaNode::new(None)], interner: EdgeSetInterner::new() }
    }

    pub(super) fn node(&self, id: NodeId) -> &NfaNode {
        &self.nodes[id as usize]
    }

    pub(super) fn targets(&self, from: NodeId, byte: u8) -> &[NodeId] {
        self.interner.get(self.node(from).edges[byte as usize])
    }

    pub(super) fn has_edge(&self, from: NodeId, byte: u8, to: NodeId) -> bool {
        self.targets(from, byte).binary_search(&to).is_ok()
    }

    pub(super) fn insert(&mut self, terminal: usize, segments: &[Segment]) -> InsertedPattern {
        let mut heads = vec![ROOT];
        let mut var_map = HashMap::new();

        for segment in segments {
            match *segment {
                Segment::Literal(byte) => {
                    let node = self.add_node(terminal);
                    self.connect(&heads, byte, node);
                    heads = vec![node];
                }
                Segment::Placeholder(slot) => {
                    let node = self.add_node(terminal);
                    var_map.insert(node, slot);
                    heads.push(node);
                    // one or more bytes of a single segment
                    for byte in (1..=u8::MAX).filter(|byte| *byte != b'/') {
                        self.connect(&heads, byte, node);
                    }
                    heads = vec![node];
                }
                Segment::Wildcard => {
                    let node = self.add_node(terminal);
                    heads.push(node);
                    for byte in 1..=u8::MAX {
                        self.connect(&heads, byte, node);
                    }
                }
            }
        }

        let accept = self.add_node(terminal);
        self.nodes[accept as usize].accepts = true;
        self.connect(&heads, TERMINATOR, accept);
        InsertedPattern { accept, var_map }
    }

    fn add_node(&mut self, owner: usize) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(NfaNode::new(Some(owner)));
        id
    }

    fn connect(&mut self, from: &[NodeId], byte: u8, to: NodeId) {
        for &node in from {
            let set = self.nodes[node as usize].edges[byte as usize];
            let set = self.interner.with_member(set, to);
            self.nodes[node as usize].edges[byte as usize] = set;
        }
    }
}

#[derive(Debug)]
pub(super) struct DfaState {
    pub(super) edges: Box<[StateId; 256]>,
    /// The graph nodes merged into this state, sorted.
    pub(super) members: Box<[NodeId]>,
    /// Terminals accepted here, in registration order.
    pub(super) terminals: Box<[usize]>,
}

/// Merges every node set reachable from the root into a single state.
///
/// Merged states are memoized by their member set, so the same combination
/// reached along different paths becomes one state. State `0` is the root.
pub(super) fn disambiguate(nfa: &NfaBuilder) -> Vec<DfaState> {
    let mut states = Vec::new();
    let mut memo: HashMap<Box<[NodeId]>, StateId> = HashMap::new();
    let mut pending = vec![add_state(nfa, &mut states, &mut memo, Box::new([ROOT]))];

    while let Some(state) = pending.pop() {
        let members = states[state as usize].members.clone();
        for byte in 0..=u8::MAX {
            let mut merged = Vec::new();
            for &member in members.iter() {
                merged.extend_from_slice(nfa.targets(member, byte));
            }
            if merged.is_empty() {
                continue;
            }
            merged.sort_unstable();
            merged.dedup();

            let target = match memo.get(merged.as_slice()) {
                Some(target) => *target,
                None => {
                    let target = add_state(nfa, &mut states, &mut memo, merged.into_boxed_slice());
                    pending.push(target);
                    target
                }
            };
            states[state as usize].edges[byte as usize] = target;
        }
    }

    debug!(states = states.len(), edge_sets = nfa.interner.len(), "route automaton built");
    states
}

fn add_state(
    nfa: &NfaBuilder,
    states: &mut Vec<DfaState>,
    memo: &mut HashMap<Box<[NodeId]>, StateId>,
    members: Box<[NodeId]>,
) -> StateId {
    let mut terminals: Vec<usize> =
        members.iter().map(|member| nfa.node(*member)).filter(|node| node.accepts).filter_map(|node| node.owner).collect();
    terminals.sort_unstable();

    let id = states.len() as StateId;
    memo.insert(members.clone(), id);
    states.push(DfaState { edges: Box::new([NO_EDGE; 256]), members, terminals: terminals.into_boxed_slice() });
    id
}
