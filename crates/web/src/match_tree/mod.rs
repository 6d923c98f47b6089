//! A deterministic automaton over path bytes, finding every route pattern that
//! matches a path in one pass over its bytes.
//!
//! Patterns are made of literal bytes, `:name` placeholders matching one non
//! empty path segment (no `/`), and a trailing `*` matching the rest of the
//! path. Several patterns may match the same path; they are reported in the
//! order they were added.
//!
//! ```
//! use strand_web::MatchTree;
//!
//! let mut tree = MatchTree::new();
//! tree.add_terminal("/users/:name", "user").unwrap();
//! tree.add_terminal("/users/*", "fallback").unwrap();
//!
//! let mut found = Vec::new();
//! tree.match_path("/users/alice", |index, vars| found.push((*tree.terminal_data(index), vars.to_vec())));
//! assert_eq!(found, vec![("user", vec!["alice"]), ("fallback", vec![])]);
//! ```

mod builder;

use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::sync::OnceLock;

use builder::{DfaState, NO_EDGE, NfaBuilder, NodeId, ROOT, StateId, TERMINATOR, VarSlot};

use crate::RouteBuildError;

struct Terminal<T> {
    pattern: String,
    data: T,
    var_names: Vec<String>,
    /// The graph node accepting this pattern.
    accept: NodeId,
    /// Graph nodes consuming placeholder bytes, and the placeholder they fill.
    var_map: HashMap<NodeId, VarSlot>,
}

pub struct MatchTree<T> {
    terminals: Vec<Terminal<T>>,
    nfa: NfaBuilder,
    /// Rebuilt on first use after a terminal was added.
    dfa: OnceLock<Vec<DfaState>>,
}

impl<T> MatchTree<T> {
    pub fn new() -> Self {
        Self { terminals: Vec::new(), nfa: NfaBuilder::new(), dfa: OnceLock::new() }
    }

    /// Appends a pattern and returns its terminal index.
    ///
    /// An invalid pattern leaves the tree untouched.
    pub fn add_terminal(&mut self, pattern: &str, data: T) -> Result<usize, RouteBuildError> {
        let parsed = builder::parse_pattern(pattern)?;
        let index = self.terminals.len();
        let inserted = self.nfa.insert(index, &parsed.segments);

        self.terminals.push(Terminal {
            pattern: pattern.to_owned(),
            data,
            var_names: parsed.var_names,
            accept: inserted.accept,
            var_map: inserted.var_map,
        });
        self.dfa = OnceLock::new();
        Ok(index)
    }

    /// Builds the automaton now instead of on the next match.
    pub fn rebuild(&mut self) {
        self.dfa = OnceLock::from(builder::disambiguate(&self.nfa));
    }

    fn dfa(&self) -> &[DfaState] {
        self.dfa.get_or_init(|| builder::disambiguate(&self.nfa))
    }

    /// Calls `on_match` with the index and the placeholder values of every
    /// terminal matching `text`, in ascending index order.
    ///
    /// A terminal is skipped when one of its placeholders would be empty.
    pub fn match_path<'t, F>(&self, text: &'t str, mut on_match: F)
    where
        F: FnMut(usize, &[&'t str]),
    {
        let dfa = self.dfa();

        // path[i] is the state before the i-th input byte
        let mut path = Vec::with_capacity(text.len() + 2);
        let mut state: StateId = 0;
        path.push(state);
        for &byte in text.as_bytes().iter().chain(iter::once(&TERMINATOR)) {
            state = dfa[state as usize].edges[byte as usize];
            if state == NO_EDGE {
                return;
            }
            path.push(state);
        }

        let mut vars = Vec::new();
        for &index in dfa[state as usize].terminals.iter() {
            vars.clear();
            if self.match_vars(index, text, dfa, &path, &mut vars) {
                on_match(index, &vars);
            }
        }
    }

    /// Walks the matched path backwards through the nodes of one terminal to
    /// slice out its placeholder values, in declaration order.
    ///
    /// Where a byte could belong to more than one placeholder the earlier one
    /// takes it.
    fn match_vars<'t>(&self, index: usize, text: &'t str, dfa: &[DfaState], path: &[StateId], vars: &mut Vec<&'t str>) -> bool {
        let terminal = &self.terminals[index];
        if terminal.var_names.is_empty() {
            return true;
        }

        let bytes = text.as_bytes();
        let mut spans: Vec<Option<(usize, usize)>> = vec![None; terminal.var_names.len()];
        let mut node = terminal.accept;

        for position in (0..=bytes.len()).rev() {
            if let Some(&slot) = terminal.var_map.get(&node) {
                let span = spans[slot as usize].get_or_insert((position + 1, position + 1));
                span.0 = position;
            }

            let byte = bytes.get(position).copied().unwrap_or(TERMINATOR);
            let previous = dfa[path[position] as usize].members.iter().copied().find(|&member| {
                (member == ROOT || self.nfa.node(member).owner == Some(index)) && self.nfa.has_edge(member, byte, node)
            });
            match previous {
                Some(previous) => node = previous,
                None => return false,
            }
        }

        for span in spans {
            match span.and_then(|(start, end)| text.get(start..end)) {
                Some(value) if !value.is_empty() => vars.push(value),
                _ => return false,
            }
        }
        true
    }

    pub fn terminal_data(&self, index: usize) -> &T {
        &self.terminals[index].data
    }

    pub fn terminal_var_names(&self, index: usize) -> &[String] {
        &self.terminals[index].var_names
    }

    pub fn terminal_pattern(&self, index: usize) -> &str {
        &self.terminals[index].pattern
    }

    /// Number of automaton states; builds the automaton if needed.
    pub fn node_count(&self) -> usize {
        self.dfa().len()
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }
}

impl<T> Default for MatchTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MatchTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchTree")
            .field("patterns", &self.terminals.iter().map(|terminal| terminal.pattern.as_str()).collect::<Vec<_>>())
            .field("built", &self.dfa.get().is_some())
            .finish()
    }
}
