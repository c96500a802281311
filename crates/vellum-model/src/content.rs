//! The content-expression compiler and match states.
//!
//! A node spec's content expression (`"paragraph+"`, `"heading (block |
//! list)*"`, `"hard_break{2,4}"`) is compiled in three phases: tokenize,
//! parse to a small AST, then build an NFA whose subset construction yields
//! a deterministic automaton. The automaton's states are stored in an arena
//! inside the schema and addressed by index; [`ContentMatch`] is a handle to
//! one such state. Edge order is preserved through every phase, because
//! [`ContentMatch::fill_before`] uses it to pick which filler node to
//! synthesize when several would fit.

use std::collections::HashMap;

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::schema::{NodeType, NodeTypeData, Schema, SchemaError};

/// Arena index of the canonical empty match state, shared by every node
/// type without a content expression.
pub(crate) const EMPTY_MATCH: usize = 0;

/// One automaton state: whether the node may end here, and the ordered
/// outgoing edges as `(node type index, next state index)` pairs.
pub(crate) struct MatchData {
    pub(crate) valid_end: bool,
    pub(crate) edges: Vec<(usize, usize)>,
}

/// A match state of a node type's content expression, used to find out
/// whether further content fits here, and whether a position is a valid end
/// of the node. Identity (same schema, same state) is the only meaningful
/// equality.
#[derive(Clone)]
pub struct ContentMatch {
    schema: Schema,
    index: usize,
}

impl ContentMatch {
    pub(crate) fn new(schema: Schema, index: usize) -> ContentMatch {
        ContentMatch { schema, index }
    }

    fn data(&self) -> &MatchData {
        &self.schema.inner.matches[self.index]
    }

    fn at(&self, index: usize) -> ContentMatch {
        ContentMatch::new(self.schema.clone(), index)
    }

    /// True when this match state represents a valid end of the node.
    pub fn valid_end(&self) -> bool {
        self.data().valid_end
    }

    /// Match a node type, returning the state after that node when
    /// successful.
    pub fn match_type(&self, node_type: &NodeType) -> Option<ContentMatch> {
        self.data()
            .edges
            .iter()
            .find(|&&(term, _)| term == node_type.index())
            .map(|&(_, next)| self.at(next))
    }

    /// Try to match a whole fragment.
    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_fragment_range(fragment, 0, fragment.child_count())
    }

    /// Try to match the children of `fragment` in the index range
    /// `start..end`.
    pub fn match_fragment_range(
        &self,
        fragment: &Fragment,
        start: usize,
        end: usize,
    ) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for i in start..end {
            let child = fragment.maybe_child(i)?;
            cur = cur.match_type(child.node_type())?;
        }
        Some(cur)
    }

    /// The number of outgoing edges from this state.
    pub fn edge_count(&self) -> usize {
        self.data().edges.len()
    }

    /// The `i`th outgoing edge as a `(node type, next state)` pair.
    pub fn edge(&self, i: usize) -> Option<(NodeType, ContentMatch)> {
        self.data()
            .edges
            .get(i)
            .map(|&(term, next)| (self.schema.node_type_at(term), self.at(next)))
    }

    /// True when this state and the other share an outgoing node type.
    /// Both states must belong to the same schema.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.data()
            .edges
            .iter()
            .any(|&(t1, _)| other.data().edges.iter().any(|&(t2, _)| t1 == t2))
    }

    /// Find the shortest edge-ordered sequence of generatable node types
    /// that moves this state to one where `after` (from `start_index` on)
    /// matches, reaching a valid end when `to_end` is set. Returns the
    /// synthesized fill as a fragment, or `None` when no such sequence
    /// exists.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Result<Option<Fragment>, ModelError> {
        let mut seen = vec![self.index];
        self.fill_search(after, to_end, start_index, &mut seen, &mut Vec::new())
    }

    fn fill_search(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        seen: &mut Vec<usize>,
        types: &mut Vec<NodeType>,
    ) -> Result<Option<Fragment>, ModelError> {
        if let Some(finished) = self.match_fragment_range(after, start_index, after.child_count()) {
            if !to_end || finished.valid_end() {
                let mut filled = Vec::new();
                for node_type in types.iter() {
                    match node_type.create_and_fill(None, Fragment::empty(), &[])? {
                        Some(node) => filled.push(node),
                        None => return Ok(None),
                    }
                }
                return Ok(Some(Fragment::from_nodes(filled)));
            }
        }
        for &(term, next) in &self.data().edges {
            let node_type = self.schema.node_type_at(term);
            if !(node_type.is_text() || node_type.has_required_attrs()) && !seen.contains(&next) {
                seen.push(next);
                types.push(node_type);
                let found = self.at(next).fill_search(after, to_end, start_index, seen, types)?;
                types.pop();
                if found.is_some() {
                    return Ok(found);
                }
            }
        }
        Ok(None)
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &ContentMatch) -> bool {
        self.schema == other.schema && self.index == other.index
    }
}

impl Eq for ContentMatch {}

impl std::fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentMatch({})", self.index)
    }
}

// ── Parsing ────────────────────────────────────────────────────────────────

enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(usize),
}

struct TokenStream<'a> {
    expr: &'a str,
    tokens: Vec<String>,
    pos: usize,
    inline: Option<bool>,
    nodes: &'a [NodeTypeData],
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn tokenize(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in expr.chars() {
        if is_word_char(ch) {
            word.push(ch);
        } else {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !ch.is_whitespace() {
                tokens.push(ch.to_string());
            }
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

impl<'a> TokenStream<'a> {
    fn new(expr: &'a str, nodes: &'a [NodeTypeData]) -> TokenStream<'a> {
        TokenStream {
            expr,
            tokens: tokenize(expr),
            pos: 0,
            inline: None,
            nodes,
        }
    }

    fn next(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.next() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err<T>(&self, message: impl Into<String>) -> Result<T, SchemaError> {
        Err(SchemaError::ContentExpression {
            message: message.into(),
            expr: self.expr.to_string(),
        })
    }
}

fn parse_expr(stream: &mut TokenStream) -> Result<Expr, SchemaError> {
    let mut exprs = vec![parse_expr_seq(stream)?];
    while stream.eat("|") {
        exprs.push(parse_expr_seq(stream)?);
    }
    Ok(if exprs.len() == 1 {
        exprs.pop().unwrap_or(Expr::Seq(Vec::new()))
    } else {
        Expr::Choice(exprs)
    })
}

fn parse_expr_seq(stream: &mut TokenStream) -> Result<Expr, SchemaError> {
    let mut exprs = vec![parse_expr_subscript(stream)?];
    while matches!(stream.next(), Some(tok) if tok != ")" && tok != "|") {
        exprs.push(parse_expr_subscript(stream)?);
    }
    Ok(if exprs.len() == 1 {
        exprs.pop().unwrap_or(Expr::Seq(Vec::new()))
    } else {
        Expr::Seq(exprs)
    })
}

fn parse_expr_subscript(stream: &mut TokenStream) -> Result<Expr, SchemaError> {
    let mut expr = parse_expr_atom(stream)?;
    loop {
        if stream.eat("+") {
            expr = Expr::Plus(Box::new(expr));
        } else if stream.eat("*") {
            expr = Expr::Star(Box::new(expr));
        } else if stream.eat("?") {
            expr = Expr::Opt(Box::new(expr));
        } else if stream.eat("{") {
            expr = parse_expr_range(stream, expr)?;
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_num(stream: &mut TokenStream) -> Result<usize, SchemaError> {
    let tok = stream.next().unwrap_or("").to_string();
    match tok.parse::<usize>() {
        Ok(n) => {
            stream.pos += 1;
            Ok(n)
        }
        Err(_) => stream.err(format!("Expected number, got '{}'", tok)),
    }
}

fn parse_expr_range(stream: &mut TokenStream, expr: Expr) -> Result<Expr, SchemaError> {
    let min = parse_num(stream)?;
    let max = if stream.eat(",") {
        if stream.next() != Some("}") {
            Some(parse_num(stream)?)
        } else {
            None
        }
    } else {
        Some(min)
    };
    if !stream.eat("}") {
        return stream.err("Unclosed braced range");
    }
    Ok(Expr::Range {
        min,
        max,
        expr: Box::new(expr),
    })
}

fn resolve_name(stream: &mut TokenStream, name: &str) -> Result<Vec<usize>, SchemaError> {
    let mut result = Vec::new();
    if let Some(i) = stream.nodes.iter().position(|n| n.name == name) {
        result.push(i);
    } else {
        for (i, node) in stream.nodes.iter().enumerate() {
            if node.is_in_group(name) {
                result.push(i);
            }
        }
    }
    if result.is_empty() {
        return stream.err(format!("No node type or group '{}' found", name));
    }
    for &i in &result {
        let inline = stream.nodes[i].is_inline();
        match stream.inline {
            None => stream.inline = Some(inline),
            Some(expected) if expected != inline => {
                return stream.err("Mixing inline and block content")
            }
            _ => {}
        }
    }
    Ok(result)
}

fn parse_expr_atom(stream: &mut TokenStream) -> Result<Expr, SchemaError> {
    if stream.eat("(") {
        let expr = parse_expr(stream)?;
        if !stream.eat(")") {
            return stream.err("Missing closing paren");
        }
        Ok(expr)
    } else if matches!(stream.next(), Some(tok) if tok.chars().all(is_word_char)) {
        let name = stream.next().unwrap_or("").to_string();
        let types = resolve_name(stream, &name)?;
        stream.pos += 1;
        let mut exprs: Vec<Expr> = types.into_iter().map(Expr::Name).collect();
        Ok(if exprs.len() == 1 {
            exprs.pop().unwrap_or(Expr::Seq(Vec::new()))
        } else {
            Expr::Choice(exprs)
        })
    } else {
        stream.err(format!("Unexpected token '{}'", stream.next().unwrap_or("")))
    }
}

// ── NFA construction and subset construction ───────────────────────────────

#[derive(Clone, Copy)]
struct NfaEdge {
    term: Option<usize>,
    to: Option<usize>,
}

struct Nfa {
    states: Vec<Vec<NfaEdge>>,
}

impl Nfa {
    fn node(&mut self) -> usize {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> (usize, usize) {
        self.states[from].push(NfaEdge { term, to });
        (from, self.states[from].len() - 1)
    }

    fn connect(&mut self, edges: &[(usize, usize)], to: usize) {
        for &(state, edge) in edges {
            self.states[state][edge].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<(usize, usize)> {
        match expr {
            Expr::Choice(exprs) => exprs
                .iter()
                .flat_map(|expr| self.compile(expr, from))
                .collect(),
            Expr::Seq(exprs) => {
                let mut cur = from;
                let mut out = Vec::new();
                for (i, expr) in exprs.iter().enumerate() {
                    out = self.compile(expr, cur);
                    if i < exprs.len() - 1 {
                        let next = self.node();
                        self.connect(&out, next);
                        cur = next;
                    }
                }
                out
            }
            Expr::Star(expr) => {
                let cycle = self.node();
                self.edge(from, Some(cycle), None);
                let inner = self.compile(expr, cycle);
                self.connect(&inner, cycle);
                vec![self.edge(cycle, None, None)]
            }
            Expr::Plus(expr) => {
                let cycle = self.node();
                let first = self.compile(expr, from);
                self.connect(&first, cycle);
                let again = self.compile(expr, cycle);
                self.connect(&again, cycle);
                vec![self.edge(cycle, None, None)]
            }
            Expr::Opt(expr) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(expr, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let inner = self.compile(expr, cur);
                            self.connect(&inner, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(term) => vec![self.edge(from, None, Some(*term))],
        }
    }
}

fn null_from(nfa: &Nfa, from: usize) -> Vec<usize> {
    let mut result = Vec::new();
    scan(nfa, from, &mut result);
    result.sort_by(|a, b| b.cmp(a));
    result
}

fn scan(nfa: &Nfa, state: usize, result: &mut Vec<usize>) {
    let edges = &nfa.states[state];
    if edges.len() == 1 && edges[0].term.is_none() {
        if let Some(to) = edges[0].to {
            return scan(nfa, to, result);
        }
    }
    result.push(state);
    for edge in edges {
        if edge.term.is_none() {
            if let Some(to) = edge.to {
                if !result.contains(&to) {
                    scan(nfa, to, result);
                }
            }
        }
    }
}

fn explore(
    states: Vec<usize>,
    nfa: &Nfa,
    labeled: &mut HashMap<Vec<usize>, usize>,
    arena: &mut Vec<MatchData>,
) -> usize {
    let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
    for &state in &states {
        for edge in &nfa.states[state] {
            let (term, to) = match (edge.term, edge.to) {
                (Some(term), Some(to)) => (term, to),
                _ => continue,
            };
            let targets = null_from(nfa, to);
            if targets.is_empty() {
                continue;
            }
            let slot = match out.iter().position(|(t, _)| *t == term) {
                Some(slot) => slot,
                None => {
                    out.push((term, Vec::new()));
                    out.len() - 1
                }
            };
            let set = &mut out[slot].1;
            for target in targets {
                if !set.contains(&target) {
                    set.push(target);
                }
            }
        }
    }

    let accepting = nfa.states.len() - 1;
    let id = arena.len();
    arena.push(MatchData {
        valid_end: states.contains(&accepting),
        edges: Vec::new(),
    });
    labeled.insert(states, id);

    let mut edges = Vec::new();
    for (term, mut set) in out {
        set.sort_by(|a, b| b.cmp(a));
        let next = match labeled.get(&set) {
            Some(&next) => next,
            None => explore(set, nfa, labeled, arena),
        };
        edges.push((term, next));
    }
    arena[id].edges = edges;
    id
}

fn check_for_dead_ends(
    start: usize,
    arena: &[MatchData],
    nodes: &[NodeTypeData],
) -> Result<(), String> {
    let mut work = vec![start];
    let mut i = 0;
    while i < work.len() {
        let state = work[i];
        let mut dead = !arena[state].valid_end;
        let mut names = Vec::new();
        for &(term, next) in &arena[state].edges {
            names.push(nodes[term].name.clone());
            if dead && !(nodes[term].is_text() || nodes[term].has_required_attrs()) {
                dead = false;
            }
            if !work.contains(&next) {
                work.push(next);
            }
        }
        if dead {
            return Err(format!(
                "Only non-generatable nodes ({}) in a required position",
                names.join(", ")
            ));
        }
        i += 1;
    }
    Ok(())
}

/// Compile a content expression into the schema's match arena, returning
/// the index of its start state. The empty expression compiles to the
/// shared empty match.
pub(crate) fn parse(
    expr: &str,
    nodes: &[NodeTypeData],
    arena: &mut Vec<MatchData>,
) -> Result<usize, SchemaError> {
    let mut stream = TokenStream::new(expr, nodes);
    if stream.next().is_none() {
        return Ok(EMPTY_MATCH);
    }
    let ast = parse_expr(&mut stream)?;
    if stream.next().is_some() {
        return stream.err("Unexpected trailing text");
    }

    let mut nfa = Nfa {
        states: vec![Vec::new()],
    };
    let dangling = nfa.compile(&ast, 0);
    let accepting = nfa.node();
    nfa.connect(&dangling, accepting);

    let mut labeled = HashMap::new();
    let start = explore(null_from(&nfa, 0), &nfa, &mut labeled, arena);
    check_for_dead_ends(start, arena, nodes).map_err(|message| SchemaError::ContentExpression {
        message,
        expr: expr.to_string(),
    })?;
    Ok(start)
}
