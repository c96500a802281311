//! Document schemas.
//!
//! A schema is compiled once from a [`SchemaSpec`] and then shared by
//! reference. The compiled tables (node types, mark types, and the
//! content-match automaton arena) live behind a single `Arc`;
//! [`NodeType`], [`MarkType`], and [`ContentMatch`](crate::ContentMatch)
//! are lightweight handles (schema + table index) compared by identity.
//! This keeps the object graph strictly acyclic: handles point into the
//! schema, never the other way around.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::content::{self, ContentMatch, MatchData};
use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use crate::replace::ReplaceError;

/// Attribute maps attached to nodes and marks. Values are arbitrary
/// JSON-compatible data; equality is structural.
pub type Attrs = Map<String, Value>;

/// Errors reported while compiling a [`SchemaSpec`] into a [`Schema`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("The schema is missing its top node type ({0})")]
    MissingTopNode(String),
    #[error("Every schema needs a 'text' type")]
    MissingTextType,
    #[error("The text node type should not have attributes")]
    TextTypeWithAttrs,
    #[error("{0} can not be both a node and a mark")]
    NodeAndMark(String),
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),
    #[error("{message} (in content expression '{expr}')")]
    ContentExpression { message: String, expr: String },
}

/// Used to define attributes on node or mark specs. A missing `default`
/// makes the attribute required at creation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSpec {
    pub default: Option<Value>,
}

/// A compiled attribute descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub default: Option<Value>,
}

impl Attribute {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Describes a node type. Attribute declarations are kept as ordered pairs
/// so defaulting and error reporting stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// The content expression for this node. When not given, the node does
    /// not allow any content.
    pub content: Option<String>,
    /// The marks that are allowed inside of this node. A space-separated
    /// string of mark names or groups, `"_"` to explicitly allow all marks,
    /// or `""` to disallow marks. When not given, nodes with inline content
    /// default to allowing all marks, other nodes to allowing none.
    pub marks: Option<String>,
    /// The group or space-separated groups this node belongs to.
    pub group: Option<String>,
    /// Should be set to true for inline nodes. (Implied for text nodes.)
    pub inline: bool,
    /// True for nodes that, though not leaves, should be treated as a
    /// single unit.
    pub atom: bool,
    /// The attributes that nodes of this type get.
    pub attrs: Vec<(String, AttributeSpec)>,
    /// Defines how a node of this type renders in debug output.
    pub to_debug_string: Option<fn(&Node) -> String>,
}

/// Describes a mark type.
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    /// The attributes that marks of this type get.
    pub attrs: Vec<(String, AttributeSpec)>,
    /// Whether this mark should be active when the cursor is positioned at
    /// its end. Defaults to true.
    pub inclusive: Option<bool>,
    /// Determines which other marks this mark can coexist with: a
    /// space-separated string of mark names or groups, `"_"` for all marks,
    /// `""` for none. Defaults to only excluding marks of the same type.
    pub excludes: Option<String>,
    /// The group or space-separated groups this mark belongs to.
    pub group: Option<String>,
}

/// An object describing a schema. The order of node and mark declarations
/// is significant: it determines group precedence and mark ranks.
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    pub nodes: Vec<(String, NodeSpec)>,
    pub marks: Vec<(String, MarkSpec)>,
    /// The name of the default top-level node. Defaults to `"doc"`.
    pub top_node: Option<String>,
}

pub(crate) struct NodeTypeData {
    pub(crate) name: String,
    pub(crate) spec: NodeSpec,
    pub(crate) groups: Vec<String>,
    pub(crate) attrs: Vec<(String, Attribute)>,
    pub(crate) default_attrs: Option<Attrs>,
    pub(crate) content_match: usize,
    pub(crate) mark_set: Option<Vec<usize>>,
    pub(crate) inline_content: bool,
}

impl NodeTypeData {
    pub(crate) fn is_text(&self) -> bool {
        self.name == "text"
    }

    pub(crate) fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    pub(crate) fn has_required_attrs(&self) -> bool {
        self.attrs.iter().any(|(_, attr)| attr.is_required())
    }

    pub(crate) fn is_in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

pub(crate) struct MarkTypeData {
    pub(crate) name: String,
    pub(crate) spec: MarkSpec,
    pub(crate) attrs: Vec<(String, Attribute)>,
    pub(crate) default_attrs: Option<Attrs>,
    pub(crate) excluded: Vec<usize>,
}

pub(crate) struct SchemaInner {
    pub(crate) spec: SchemaSpec,
    pub(crate) nodes: Vec<NodeTypeData>,
    pub(crate) marks: Vec<MarkTypeData>,
    pub(crate) matches: Vec<MatchData>,
    pub(crate) top: usize,
    pub(crate) text: usize,
}

/// A compiled document schema. Cheap to clone; all clones share the same
/// compiled tables and compare equal.
#[derive(Clone)]
pub struct Schema {
    pub(crate) inner: Arc<SchemaInner>,
}

fn init_attrs(specs: &[(String, AttributeSpec)]) -> Vec<(String, Attribute)> {
    specs
        .iter()
        .map(|(name, spec)| {
            (
                name.clone(),
                Attribute {
                    default: spec.default.clone(),
                },
            )
        })
        .collect()
}

fn default_attrs(attrs: &[(String, Attribute)]) -> Option<Attrs> {
    let mut defaults = Attrs::new();
    for (name, attr) in attrs {
        defaults.insert(name.clone(), attr.default.clone()?);
    }
    Some(defaults)
}

pub(crate) fn compute_attrs(
    declared: &[(String, Attribute)],
    given: Option<&Attrs>,
) -> Result<Attrs, ModelError> {
    let mut built = Attrs::new();
    for (name, attr) in declared {
        let value = match given.and_then(|g| g.get(name)) {
            Some(value) => value.clone(),
            None => match &attr.default {
                Some(value) => value.clone(),
                None => return Err(ModelError::MissingAttribute(name.clone())),
            },
        };
        built.insert(name.clone(), value);
    }
    Ok(built)
}

fn split_groups(group: &Option<String>) -> Vec<String> {
    group
        .as_deref()
        .map(|g| g.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn gather_marks(marks: &[MarkTypeData], names: &str) -> Result<Vec<usize>, SchemaError> {
    let mut found = Vec::new();
    for name in names.split_whitespace() {
        let mut ok = false;
        if let Some(i) = marks.iter().position(|m| m.name == name) {
            found.push(i);
            ok = true;
        } else {
            for (i, mark) in marks.iter().enumerate() {
                if name == "_" || mark.spec.group.as_deref().map_or(false, |groups| {
                    groups.split_whitespace().any(|g| g == name)
                }) {
                    found.push(i);
                    ok = true;
                }
            }
        }
        if !ok {
            return Err(SchemaError::UnknownMarkType(name.to_string()));
        }
    }
    Ok(found)
}

impl Schema {
    /// Compile a schema from its spec. A missing `top_node` defaults to
    /// `"doc"`.
    pub fn new(spec: SchemaSpec) -> Result<Schema, SchemaError> {
        let mut spec = spec;
        let top_name = spec.top_node.get_or_insert_with(|| "doc".into()).clone();

        let mut nodes: Vec<NodeTypeData> = spec
            .nodes
            .iter()
            .map(|(name, nspec)| {
                let attrs = init_attrs(&nspec.attrs);
                let default_attrs = default_attrs(&attrs);
                NodeTypeData {
                    name: name.clone(),
                    groups: split_groups(&nspec.group),
                    spec: nspec.clone(),
                    attrs,
                    default_attrs,
                    content_match: 0,
                    mark_set: None,
                    inline_content: false,
                }
            })
            .collect();

        let top = nodes
            .iter()
            .position(|n| n.name == top_name)
            .ok_or(SchemaError::MissingTopNode(top_name))?;
        let text = nodes
            .iter()
            .position(|n| n.name == "text")
            .ok_or(SchemaError::MissingTextType)?;
        if !nodes[text].attrs.is_empty() {
            return Err(SchemaError::TextTypeWithAttrs);
        }

        let marks: Vec<MarkTypeData> = spec
            .marks
            .iter()
            .map(|(name, mspec)| {
                let attrs = init_attrs(&mspec.attrs);
                let default_attrs = default_attrs(&attrs);
                MarkTypeData {
                    name: name.clone(),
                    spec: mspec.clone(),
                    attrs,
                    default_attrs,
                    excluded: Vec::new(),
                }
            })
            .collect();

        // State 0 is the canonical empty match shared by contentless types.
        let mut matches = vec![MatchData {
            valid_end: true,
            edges: Vec::new(),
        }];
        let mut expr_cache: HashMap<String, usize> = HashMap::new();
        expr_cache.insert(String::new(), 0);

        for i in 0..nodes.len() {
            if marks.iter().any(|m| m.name == nodes[i].name) {
                return Err(SchemaError::NodeAndMark(nodes[i].name.clone()));
            }
            let expr = nodes[i].spec.content.clone().unwrap_or_default();
            let cm = match expr_cache.get(&expr) {
                Some(&cm) => cm,
                None => {
                    let cm = content::parse(&expr, &nodes, &mut matches)?;
                    expr_cache.insert(expr, cm);
                    cm
                }
            };
            nodes[i].content_match = cm;
            nodes[i].inline_content = matches[cm]
                .edges
                .first()
                .map(|&(t, _)| nodes[t].is_inline())
                .unwrap_or(false);

            nodes[i].mark_set = match nodes[i].spec.marks.clone().as_deref() {
                None => {
                    if nodes[i].inline_content {
                        None
                    } else {
                        Some(Vec::new())
                    }
                }
                Some("") => Some(Vec::new()),
                Some("_") => None,
                Some(expr) => Some(gather_marks(&marks, expr)?),
            };
        }

        let mut marks = marks;
        for i in 0..marks.len() {
            marks[i].excluded = match marks[i].spec.excludes.clone().as_deref() {
                None => vec![i],
                Some("") => Vec::new(),
                Some(expr) => gather_marks(&marks, expr)?,
            };
        }

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                spec,
                nodes,
                marks,
                matches,
                top,
                text,
            }),
        })
    }

    /// The spec this schema is based on, with `top_node` filled in.
    pub fn spec(&self) -> &SchemaSpec {
        &self.inner.spec
    }

    /// The node types in this schema, in declaration order.
    pub fn node_types(&self) -> Vec<NodeType> {
        (0..self.inner.nodes.len())
            .map(|index| NodeType {
                schema: self.clone(),
                index,
            })
            .collect()
    }

    /// The mark types in this schema, in rank order.
    pub fn mark_types(&self) -> Vec<MarkType> {
        (0..self.inner.marks.len())
            .map(|index| MarkType {
                schema: self.clone(),
                index,
            })
            .collect()
    }

    /// Look a node type up by name.
    pub fn node_type(&self, name: &str) -> Result<NodeType, SchemaError> {
        self.inner
            .nodes
            .iter()
            .position(|n| n.name == name)
            .map(|index| NodeType {
                schema: self.clone(),
                index,
            })
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_string()))
    }

    /// Look a mark type up by name.
    pub fn mark_type(&self, name: &str) -> Result<MarkType, SchemaError> {
        self.inner
            .marks
            .iter()
            .position(|m| m.name == name)
            .map(|index| MarkType {
                schema: self.clone(),
                index,
            })
            .ok_or_else(|| SchemaError::UnknownMarkType(name.to_string()))
    }

    /// The type of the schema's top-level node.
    pub fn top_node_type(&self) -> NodeType {
        NodeType {
            schema: self.clone(),
            index: self.inner.top,
        }
    }

    /// The schema's text node type.
    pub fn text_type(&self) -> NodeType {
        NodeType {
            schema: self.clone(),
            index: self.inner.text,
        }
    }

    /// Create a node in this schema, checking the content against the node
    /// type's content expression.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Node, ModelError> {
        self.node_type(name)?.create_checked(attrs, content, marks)
    }

    /// Create a text node. Empty text nodes are not allowed.
    pub fn text(&self, text: &str) -> Node {
        self.text_with_marks(text, &[])
    }

    /// Create a text node carrying the given marks.
    pub fn text_with_marks(&self, text: &str, marks: &[Mark]) -> Node {
        Node::new_text(self.text_type(), text.to_string(), Mark::set_from(marks))
    }

    /// Create a mark with the given type name and attributes.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark, ModelError> {
        self.mark_type(name)?.create(attrs)
    }

    /// Deserialize a node from its JSON representation.
    pub fn node_from_json(&self, value: &Value) -> Result<Node, ModelError> {
        Node::from_json(self, value)
    }

    /// Deserialize a mark from its JSON representation.
    pub fn mark_from_json(&self, value: &Value) -> Result<Mark, ModelError> {
        Mark::from_json(self, value)
    }

    pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
        NodeType {
            schema: self.clone(),
            index,
        }
    }

    pub(crate) fn mark_type_at(&self, index: usize) -> MarkType {
        MarkType {
            schema: self.clone(),
            index,
        }
    }

    pub(crate) fn content_match_at(&self, index: usize) -> ContentMatch {
        ContentMatch::new(self.clone(), index)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.inner.nodes.iter().map(|n| n.name.as_str()).collect();
        write!(f, "Schema({})", names.join(", "))
    }
}

/// A node type: allocated once per schema and used to tag node instances.
#[derive(Clone)]
pub struct NodeType {
    schema: Schema,
    index: usize,
}

impl NodeType {
    pub(crate) fn data(&self) -> &NodeTypeData {
        &self.schema.inner.nodes[self.index]
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// The name the node type has in this schema.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// A link back to the schema the node type belongs to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec this type is based on.
    pub fn spec(&self) -> &NodeSpec {
        &self.data().spec
    }

    /// The groups this node type belongs to.
    pub fn groups(&self) -> &[String] {
        &self.data().groups
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.data().is_in_group(group)
    }

    /// True if this is the text node type.
    pub fn is_text(&self) -> bool {
        self.data().is_text()
    }

    /// True if this is a block type.
    pub fn is_block(&self) -> bool {
        !self.data().spec.inline && !self.is_text()
    }

    /// True if this is an inline type.
    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// True if this node type allows no content.
    pub fn is_leaf(&self) -> bool {
        self.data().content_match == content::EMPTY_MATCH
    }

    /// True for block types with inline content.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.data().inline_content
    }

    /// True when this node does not have directly editable content.
    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.data().spec.atom
    }

    /// True if this node type has inline content.
    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    /// Whether this node type has any required attributes.
    pub fn has_required_attrs(&self) -> bool {
        self.data().has_required_attrs()
    }

    /// The default attribute map, present only when every declared
    /// attribute has a default.
    pub fn default_attrs(&self) -> Option<&Attrs> {
        self.data().default_attrs.as_ref()
    }

    /// The start state of this type's content expression.
    pub fn content_match(&self) -> ContentMatch {
        ContentMatch::new(self.schema.clone(), self.data().content_match)
    }

    /// The marks allowed in this node, or `None` when all marks are
    /// allowed.
    pub fn allowed_marks(&self) -> Option<Vec<MarkType>> {
        self.data().mark_set.as_ref().map(|set| {
            set.iter()
                .map(|&index| self.schema.mark_type_at(index))
                .collect()
        })
    }

    pub(crate) fn compute_attrs(&self, attrs: Option<&Attrs>) -> Result<Attrs, ModelError> {
        if attrs.map_or(true, |a| a.is_empty()) {
            if let Some(defaults) = &self.data().default_attrs {
                return Ok(defaults.clone());
            }
        }
        compute_attrs(&self.data().attrs, attrs)
    }

    /// Create a node of this type, with attributes checked and defaulted.
    /// The content is not validated; use [`NodeType::create_checked`] when
    /// it comes from an untrusted source.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Node, ModelError> {
        if self.is_text() {
            return Err(ModelError::TextNodeViaCreate);
        }
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(
            self.clone(),
            attrs,
            content,
            Mark::set_from(marks),
        ))
    }

    /// Like [`NodeType::create`], but checks the given content against the
    /// node type's content expression.
    pub fn create_checked(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Node, ModelError> {
        if !self.valid_content(&content) {
            return Err(ReplaceError::InvalidContent(self.name().to_string()).into());
        }
        self.create(attrs, content, marks)
    }

    /// Like [`NodeType::create`], but adds nodes to the start or end of the
    /// given fragment when that is necessary to make it fit. Returns `None`
    /// when no fitting wrapping exists.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: &[Mark],
    ) -> Result<Option<Node>, ModelError> {
        let attrs = self.compute_attrs(attrs)?;
        let mut content = content;
        if content.size() > 0 {
            let before = match self.content_match().fill_before(&content, false, 0)? {
                Some(before) => before,
                None => return Ok(None),
            };
            content = before.append(&content);
        }
        let matched = match self.content_match().match_fragment(&content) {
            Some(matched) => matched,
            None => return Ok(None),
        };
        let after = match matched.fill_before(&Fragment::empty(), true, 0)? {
            Some(after) => after,
            None => return Ok(None),
        };
        Ok(Some(Node::new(
            self.clone(),
            attrs,
            content.append(&after),
            Mark::set_from(marks),
        )))
    }

    /// Returns true if the given fragment is valid content for this node
    /// type.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        match self.content_match().match_fragment(content) {
            Some(result) if result.valid_end() => {}
            _ => return false,
        }
        content.iter().all(|child| self.allows_marks(child.marks()))
    }

    /// True when this type's content expression can reach the other type's
    /// content: either they are the same type, or their automatons share an
    /// edge.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }

    /// Checks whether the given mark type is allowed in this node.
    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.data().mark_set {
            None => true,
            Some(set) => set.contains(&mark_type.index()),
        }
    }

    /// Tests whether the given set of marks are allowed in this node.
    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &NodeType) -> bool {
        self.schema == other.schema && self.index == other.index
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

/// A mark type: like node types, allocated once per schema.
#[derive(Clone)]
pub struct MarkType {
    schema: Schema,
    index: usize,
}

impl MarkType {
    pub(crate) fn data(&self) -> &MarkTypeData {
        &self.schema.inner.marks[self.index]
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// The name of the mark type.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The schema this mark type is part of.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec on which the type is based.
    pub fn spec(&self) -> &MarkSpec {
        &self.data().spec
    }

    /// The position of this mark type in the schema's mark declarations,
    /// which determines its order inside mark sets.
    pub fn rank(&self) -> usize {
        self.index
    }

    /// Create a mark of this type, defaulting missing attributes.
    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark, ModelError> {
        let attrs = if attrs.map_or(true, |a| a.is_empty()) {
            match &self.data().default_attrs {
                Some(defaults) => defaults.clone(),
                None => compute_attrs(&self.data().attrs, attrs)?,
            }
        } else {
            compute_attrs(&self.data().attrs, attrs)?
        };
        Ok(Mark::new(self.clone(), attrs))
    }

    /// When there is a mark of this type in the given set, return it.
    pub fn is_in_set(&self, set: &[Mark]) -> Option<Mark> {
        set.iter().find(|m| m.mark_type() == self).cloned()
    }

    /// Queries whether the given mark type is excluded by this one.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.data().excluded.contains(&other.index)
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &MarkType) -> bool {
        self.schema == other.schema && self.index == other.index
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

fn attribute_specs_to_json(attrs: &[(String, AttributeSpec)]) -> Value {
    let mut obj = Map::new();
    for (name, spec) in attrs {
        let mut attr = Map::new();
        if let Some(default) = &spec.default {
            attr.insert("default".into(), default.clone());
        }
        obj.insert(name.clone(), Value::Object(attr));
    }
    Value::Object(obj)
}

fn attribute_specs_from_json(value: &Value) -> Result<Vec<(String, AttributeSpec)>, ModelError> {
    let obj = value.as_object().ok_or(ModelError::InvalidSchemaSpecJson)?;
    let mut attrs = Vec::new();
    for (name, raw) in obj {
        let spec = raw.as_object().ok_or(ModelError::InvalidSchemaSpecJson)?;
        attrs.push((
            name.clone(),
            AttributeSpec {
                default: spec.get("default").cloned(),
            },
        ));
    }
    Ok(attrs)
}

impl NodeSpec {
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(content) = &self.content {
            obj.insert("content".into(), Value::String(content.clone()));
        }
        if let Some(marks) = &self.marks {
            obj.insert("marks".into(), Value::String(marks.clone()));
        }
        if let Some(group) = &self.group {
            obj.insert("group".into(), Value::String(group.clone()));
        }
        if self.inline {
            obj.insert("inline".into(), Value::Bool(true));
        }
        if self.atom {
            obj.insert("atom".into(), Value::Bool(true));
        }
        if !self.attrs.is_empty() {
            obj.insert("attrs".into(), attribute_specs_to_json(&self.attrs));
        }
        Value::Object(obj)
    }

    pub fn from_json(value: &Value) -> Result<NodeSpec, ModelError> {
        let obj = value.as_object().ok_or(ModelError::InvalidSchemaSpecJson)?;
        Ok(NodeSpec {
            content: obj.get("content").and_then(Value::as_str).map(str::to_string),
            marks: obj.get("marks").and_then(Value::as_str).map(str::to_string),
            group: obj.get("group").and_then(Value::as_str).map(str::to_string),
            inline: obj.get("inline").and_then(Value::as_bool).unwrap_or(false),
            atom: obj.get("atom").and_then(Value::as_bool).unwrap_or(false),
            attrs: match obj.get("attrs") {
                Some(attrs) => attribute_specs_from_json(attrs)?,
                None => Vec::new(),
            },
            to_debug_string: None,
        })
    }
}

impl MarkSpec {
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if !self.attrs.is_empty() {
            obj.insert("attrs".into(), attribute_specs_to_json(&self.attrs));
        }
        if let Some(inclusive) = self.inclusive {
            obj.insert("inclusive".into(), Value::Bool(inclusive));
        }
        if let Some(excludes) = &self.excludes {
            obj.insert("excludes".into(), Value::String(excludes.clone()));
        }
        if let Some(group) = &self.group {
            obj.insert("group".into(), Value::String(group.clone()));
        }
        Value::Object(obj)
    }

    pub fn from_json(value: &Value) -> Result<MarkSpec, ModelError> {
        let obj = value.as_object().ok_or(ModelError::InvalidSchemaSpecJson)?;
        Ok(MarkSpec {
            attrs: match obj.get("attrs") {
                Some(attrs) => attribute_specs_from_json(attrs)?,
                None => Vec::new(),
            },
            inclusive: obj.get("inclusive").and_then(Value::as_bool),
            excludes: obj
                .get("excludes")
                .and_then(Value::as_str)
                .map(str::to_string),
            group: obj.get("group").and_then(Value::as_str).map(str::to_string),
        })
    }
}

impl SchemaSpec {
    /// Serialize the spec. Node and mark specs are carried as ordered
    /// `[name, spec]` pairs because declaration order determines mark ranks
    /// and content-expression precedence.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if !self.nodes.is_empty() {
            obj.insert(
                "nodes".into(),
                Value::Array(
                    self.nodes
                        .iter()
                        .map(|(name, spec)| {
                            Value::Array(vec![Value::String(name.clone()), spec.to_json()])
                        })
                        .collect(),
                ),
            );
        }
        if !self.marks.is_empty() {
            obj.insert(
                "marks".into(),
                Value::Array(
                    self.marks
                        .iter()
                        .map(|(name, spec)| {
                            Value::Array(vec![Value::String(name.clone()), spec.to_json()])
                        })
                        .collect(),
                ),
            );
        }
        if let Some(top_node) = &self.top_node {
            obj.insert("topNode".into(), Value::String(top_node.clone()));
        }
        Value::Object(obj)
    }

    pub fn from_json(value: &Value) -> Result<SchemaSpec, ModelError> {
        let obj = value.as_object().ok_or(ModelError::InvalidSchemaSpecJson)?;
        let mut spec = SchemaSpec::default();
        if let Some(nodes) = obj.get("nodes") {
            let nodes = nodes.as_array().ok_or(ModelError::InvalidSchemaSpecJson)?;
            for pair in nodes {
                let (name, node_spec) = spec_pair(pair)?;
                spec.nodes.push((name, NodeSpec::from_json(node_spec)?));
            }
        }
        if let Some(marks) = obj.get("marks") {
            let marks = marks.as_array().ok_or(ModelError::InvalidSchemaSpecJson)?;
            for pair in marks {
                let (name, mark_spec) = spec_pair(pair)?;
                spec.marks.push((name, MarkSpec::from_json(mark_spec)?));
            }
        }
        spec.top_node = obj.get("topNode").and_then(Value::as_str).map(str::to_string);
        Ok(spec)
    }
}

fn spec_pair(value: &Value) -> Result<(String, &Value), ModelError> {
    let pair = value.as_array().ok_or(ModelError::InvalidSchemaSpecJson)?;
    if pair.len() != 2 {
        return Err(ModelError::InvalidSchemaSpecJson);
    }
    let name = pair[0].as_str().ok_or(ModelError::InvalidSchemaSpecJson)?;
    Ok((name.to_string(), &pair[1]))
}
