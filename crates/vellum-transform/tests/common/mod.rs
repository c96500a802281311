//! Shared test helpers: a schema resembling the CommonMark one plus list
//! support, and builder functions for concisely constructing documents.
//!
//! Builders accept strings (text nodes), other built nodes, or the result
//! of mark builders. Inside strings, `<name>` markers record the position
//! at that point in the node's `tag` map without appearing in the document,
//! so tests can refer to positions without counting tokens.

#![allow(dead_code, unused_macros, unused_imports)]

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use vellum_model::schema::{AttributeSpec, MarkSpec, NodeSpec, SchemaSpec};
use vellum_model::{text, Attrs, Fragment, Mark, Node, Schema};

fn attr(default: Option<Value>) -> AttributeSpec {
    AttributeSpec { default }
}

/// The spec of the schema the tests run against: CommonMark-like nodes
/// plus list support.
pub fn base_spec() -> SchemaSpec {
    SchemaSpec {
        nodes: vec![
            (
                "doc".into(),
                NodeSpec {
                    content: Some("block+".into()),
                    ..Default::default()
                },
            ),
            (
                "paragraph".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "blockquote".into(),
                NodeSpec {
                    content: Some("block+".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "horizontal_rule".into(),
                NodeSpec {
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "heading".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: Some("block".into()),
                    attrs: vec![("level".into(), attr(Some(Value::from(1))))],
                    ..Default::default()
                },
            ),
            (
                "code_block".into(),
                NodeSpec {
                    content: Some("text*".into()),
                    marks: Some(String::new()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "text".into(),
                NodeSpec {
                    group: Some("inline".into()),
                    ..Default::default()
                },
            ),
            (
                "image".into(),
                NodeSpec {
                    group: Some("inline".into()),
                    inline: true,
                    attrs: vec![
                        ("src".into(), attr(None)),
                        ("alt".into(), attr(Some(Value::Null))),
                        ("title".into(), attr(Some(Value::Null))),
                    ],
                    ..Default::default()
                },
            ),
            (
                "hard_break".into(),
                NodeSpec {
                    group: Some("inline".into()),
                    inline: true,
                    ..Default::default()
                },
            ),
            (
                "ordered_list".into(),
                NodeSpec {
                    content: Some("list_item+".into()),
                    group: Some("block".into()),
                    attrs: vec![("order".into(), attr(Some(Value::from(1))))],
                    ..Default::default()
                },
            ),
            (
                "bullet_list".into(),
                NodeSpec {
                    content: Some("list_item+".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "list_item".into(),
                NodeSpec {
                    content: Some("paragraph block*".into()),
                    ..Default::default()
                },
            ),
        ],
        marks: vec![
            (
                "link".into(),
                MarkSpec {
                    attrs: vec![
                        ("href".into(), attr(None)),
                        ("title".into(), attr(Some(Value::Null))),
                    ],
                    inclusive: Some(false),
                    ..Default::default()
                },
            ),
            ("em".into(), MarkSpec::default()),
            ("strong".into(), MarkSpec::default()),
            ("code".into(), MarkSpec::default()),
        ],
        top_node: None,
    }
}

/// The schema the tests run against.
pub static SCHEMA: Lazy<Schema> =
    Lazy::new(|| Schema::new(base_spec()).expect("test schema must compile"));

/// A built node along with the positions its `<name>` markers recorded.
#[derive(Clone, Debug)]
pub struct Tagged {
    pub node: Node,
    pub tag: HashMap<String, usize>,
}

impl Tagged {
    /// The position recorded for the given marker.
    pub fn tag(&self, name: &str) -> usize {
        match self.tag.get(name) {
            Some(&pos) => pos,
            None => panic!("no tag <{}> in {}", name, self.node),
        }
    }

    pub fn maybe_tag(&self, name: &str) -> Option<usize> {
        self.tag.get(name).copied()
    }
}

/// The result of a mark builder: a flat run of inline nodes plus tags.
#[derive(Clone, Debug)]
pub struct Marked {
    pub nodes: Vec<Node>,
    pub tag: HashMap<String, usize>,
}

/// Anything a builder accepts as a child.
#[derive(Clone, Debug)]
pub enum Child {
    Text(String),
    Node(Tagged),
    Marked(Marked),
}

impl From<&str> for Child {
    fn from(text: &str) -> Child {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Child {
        Child::Text(text)
    }
}

impl From<Tagged> for Child {
    fn from(tagged: Tagged) -> Child {
        Child::Node(tagged)
    }
}

impl From<Marked> for Child {
    fn from(marked: Marked) -> Child {
        Child::Marked(marked)
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Child {
        Child::Node(Tagged {
            node,
            tag: HashMap::new(),
        })
    }
}

fn parse_tagged_text(text: &str, pos: &mut usize, tag: &mut HashMap<String, usize>) -> String {
    let mut out = String::new();
    let mut rest = text;
    loop {
        let Some(open) = rest.find('<') else { break };
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else { break };
        let name = &after[..close];
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            // Not a marker; emit up to and including the '<' and go on.
            out.push_str(&rest[..open + 1]);
            *pos += text::len_utf16(&rest[..open + 1]);
            rest = after;
            continue;
        }
        out.push_str(&rest[..open]);
        *pos += text::len_utf16(&rest[..open]);
        tag.insert(name.to_string(), *pos);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    *pos += text::len_utf16(rest);
    out
}

fn flatten(
    schema: &Schema,
    children: Vec<Child>,
    f: &dyn Fn(Node) -> Node,
) -> (Vec<Node>, HashMap<String, usize>) {
    let mut nodes = Vec::new();
    let mut tag = HashMap::new();
    let mut pos = 0;
    for child in children {
        match child {
            Child::Text(text) => {
                let out = parse_tagged_text(&text, &mut pos, &mut tag);
                if !out.is_empty() {
                    nodes.push(f(schema.text(&out)));
                }
            }
            Child::Node(tagged) => {
                let extra = if tagged.node.is_text() { 0 } else { 1 };
                for (id, val) in &tagged.tag {
                    tag.insert(id.clone(), val + extra + pos);
                }
                let node = f(tagged.node);
                pos += node.node_size();
                nodes.push(node);
            }
            Child::Marked(marked) => {
                for (id, val) in &marked.tag {
                    tag.insert(id.clone(), val + pos);
                }
                for node in marked.nodes {
                    let node = f(node);
                    pos += node.node_size();
                    nodes.push(node);
                }
            }
        }
    }
    (nodes, tag)
}

/// Build a node of the named type from the given children.
pub fn block(name: &str, attrs: Option<Attrs>, children: Vec<Child>) -> Tagged {
    let schema = &*SCHEMA;
    let (nodes, tag) = flatten(schema, children, &|n| n);
    let node = schema
        .node_type(name)
        .expect("known node type")
        .create(attrs.as_ref(), Fragment::from_nodes(nodes), &[])
        .expect("node builds");
    Tagged { node, tag }
}

/// Build a run of inline content wearing the named mark.
pub fn marked(name: &str, attrs: Option<Attrs>, children: Vec<Child>) -> Marked {
    let schema = &*SCHEMA;
    let mark = schema
        .mark_type(name)
        .expect("known mark type")
        .create(attrs.as_ref())
        .expect("mark builds");
    let (nodes, tag) = flatten(schema, children, &{
        let mark = mark.clone();
        move |n: Node| {
            if mark.mark_type().is_in_set(n.marks()).is_some() {
                n
            } else {
                n.mark(mark.add_to_set(n.marks()))
            }
        }
    });
    Marked { nodes, tag }
}

pub fn obj(value: Value) -> Attrs {
    match value {
        Value::Object(map) => map,
        _ => panic!("attrs must be a JSON object"),
    }
}

/// An inline image leaf.
pub fn img() -> Tagged {
    block(
        "image",
        Some(obj(serde_json::json!({"src": "img.png"}))),
        vec![],
    )
}

/// A hard break leaf.
pub fn br() -> Tagged {
    block("hard_break", None, vec![])
}

/// A horizontal rule leaf.
pub fn hr() -> Tagged {
    block("horizontal_rule", None, vec![])
}

macro_rules! doc_macro {
    ($($c:expr),* $(,)?) => { crate::common::block("doc", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! p {
    ($($c:expr),* $(,)?) => { crate::common::block("paragraph", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! blockquote {
    ($($c:expr),* $(,)?) => { crate::common::block("blockquote", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! h1 {
    ($($c:expr),* $(,)?) => { crate::common::block("heading", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! h2 {
    ($($c:expr),* $(,)?) => {
        crate::common::block(
            "heading",
            Some(crate::common::obj(serde_json::json!({"level": 2}))),
            vec![$(crate::common::Child::from($c)),*],
        )
    };
}
macro_rules! ul {
    ($($c:expr),* $(,)?) => { crate::common::block("bullet_list", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! ol {
    ($($c:expr),* $(,)?) => { crate::common::block("ordered_list", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! li {
    ($($c:expr),* $(,)?) => { crate::common::block("list_item", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! pre {
    ($($c:expr),* $(,)?) => { crate::common::block("code_block", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! em {
    ($($c:expr),* $(,)?) => { crate::common::marked("em", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! strong {
    ($($c:expr),* $(,)?) => { crate::common::marked("strong", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! code {
    ($($c:expr),* $(,)?) => { crate::common::marked("code", None, vec![$(crate::common::Child::from($c)),*]) };
}
macro_rules! a {
    ($($c:expr),* $(,)?) => {
        crate::common::marked(
            "link",
            Some(crate::common::obj(serde_json::json!({"href": "foo"}))),
            vec![$(crate::common::Child::from($c)),*],
        )
    };
}

pub(crate) use {a, blockquote, code, doc_macro as doc, em, h1, h2, li, ol, p, pre, strong, ul};

/// Look a mark up in the test schema.
pub fn mark(name: &str) -> Mark {
    SCHEMA
        .mark_type(name)
        .expect("known mark type")
        .create(None)
        .expect("mark builds")
}

pub fn link(href: &str) -> Mark {
    SCHEMA
        .mark_type("link")
        .expect("known mark type")
        .create(Some(&obj(serde_json::json!({ "href": href }))))
        .expect("mark builds")
}
