mod common;

use common::{doc, p, SCHEMA};
use vellum_model::{ContentMatch, Fragment, NodeSpec, Schema, SchemaError};

/// Compile a content expression by planting it on an extra node type in the
/// test schema.
fn compile(expr: &str) -> Result<(Schema, ContentMatch), SchemaError> {
    let mut spec = common::base_spec();
    spec.nodes.push((
        "chunk".into(),
        NodeSpec {
            content: Some(expr.into()),
            ..Default::default()
        },
    ));
    let schema = Schema::new(spec)?;
    let chunk = schema.node_type("chunk").expect("chunk exists");
    let cm = chunk.content_match();
    Ok((schema, cm))
}

fn matches(expr: &str, types: &str) -> bool {
    let (schema, mut cm) = compile(expr).expect("expression compiles");
    for name in types.split_whitespace() {
        let node_type = schema.node_type(name).expect("known type");
        match cm.match_type(&node_type) {
            Some(next) => cm = next,
            None => return false,
        }
    }
    cm.valid_end()
}

fn valid(expr: &str, types: &str) {
    assert!(matches(expr, types), "{:?} should match {:?}", expr, types);
}

fn invalid(expr: &str, types: &str) {
    assert!(!matches(expr, types), "{:?} should reject {:?}", expr, types);
}

#[test]
fn match_type_accepts_and_rejects() {
    // accepts empty content for the empty expr
    valid("", "");
    // doesn't accept content in the empty expr
    invalid("", "image");

    // matches nothing to an asterisk
    valid("image*", "");
    // matches one element to an asterisk
    valid("image*", "image");
    // matches multiple elements to an asterisk
    valid("image*", "image image image image");
    // only matches appropriate elements to an asterisk
    invalid("image*", "image text");

    // matches group members to a group
    valid("inline*", "image text");
    // doesn't match non-members to a group
    invalid("inline*", "paragraph");
    // matches an element to a choice expression
    valid("(paragraph | heading)", "paragraph");
    // doesn't match unmentioned elements to a choice expr
    invalid("(paragraph | heading)", "image");

    // matches a simple sequence
    valid(
        "paragraph horizontal_rule paragraph",
        "paragraph horizontal_rule paragraph",
    );
    // fails when a sequence is too long
    invalid(
        "paragraph horizontal_rule",
        "paragraph horizontal_rule paragraph",
    );
    // fails when a sequence is too short
    invalid(
        "paragraph horizontal_rule paragraph",
        "paragraph horizontal_rule",
    );
    // fails when a sequence starts incorrectly
    invalid(
        "paragraph horizontal_rule",
        "horizontal_rule paragraph horizontal_rule",
    );

    // accepts a sequence asterisk matching zero elements
    valid("heading paragraph*", "heading");
    // accepts a sequence asterisk matching multiple elts
    valid("heading paragraph*", "heading paragraph paragraph");
    // accepts a sequence plus matching one element
    valid("heading paragraph+", "heading paragraph");
    // accepts a sequence plus matching multiple elts
    valid("heading paragraph+", "heading paragraph paragraph");
    // fails when a sequence plus has no elements
    invalid("heading paragraph+", "heading");
    // fails when a sequence plus misses its start
    invalid("heading paragraph+", "paragraph paragraph");

    // accepts an optional element being present
    valid("image?", "image");
    // accepts an optional element being missing
    valid("image?", "");
    // fails when an optional element is present twice
    invalid("image?", "image image");

    // accepts a nested repeat
    valid(
        "(heading paragraph+)+",
        "heading paragraph heading paragraph paragraph",
    );
    // fails on extra input after a nested repeat
    invalid(
        "(heading paragraph+)+",
        "heading paragraph heading paragraph paragraph horizontal_rule",
    );

    // accepts a matching count
    valid("hard_break{2}", "hard_break hard_break");
    // rejects a count that comes up short
    invalid("hard_break{2}", "hard_break");
    // rejects a count that has too many elements
    invalid("hard_break{2}", "hard_break hard_break hard_break");
    // accepts a count on the lower bound
    valid("hard_break{2, 4}", "hard_break hard_break");
    // accepts a count on the upper bound
    valid("hard_break{2, 4}", "hard_break hard_break hard_break hard_break");
    // accepts a count between the bounds
    valid("hard_break{2, 4}", "hard_break hard_break hard_break");
    // rejects a sequence with too few elements
    invalid("hard_break{2, 4}", "hard_break");
    // rejects a sequence with too many elements
    invalid(
        "hard_break{2, 4}",
        "hard_break hard_break hard_break hard_break hard_break",
    );
    // rejects a sequence with a bad element after it
    invalid("hard_break{2, 4} text*", "hard_break hard_break image");
    // accepts a sequence with a matching element after it
    valid("hard_break{2, 4} image?", "hard_break hard_break image");
    // accepts an open range
    valid("hard_break{2,}", "hard_break hard_break");
    // accepts an open range matching many
    valid("hard_break{2,}", "hard_break hard_break hard_break hard_break");
    // rejects an open range with too few elements
    invalid("hard_break{2,}", "hard_break");
}

fn fill(expr: &str, before: common::Tagged, after: common::Tagged, result: Option<common::Tagged>) {
    let (_, cm) = compile(expr).expect("expression compiles");
    let matched = cm
        .match_fragment(before.node.content())
        .expect("before content matches");
    let filled = matched
        .fill_before(after.node.content(), true, 0)
        .expect("fill computes");
    match result {
        Some(expected) => {
            let filled = filled.expect("a fill exists");
            assert_eq!(&filled, expected.node.content());
        }
        None => assert!(filled.is_none()),
    }
}

#[test]
fn fill_before_computes_fills() {
    // returns the empty fragment when things match
    fill(
        "paragraph horizontal_rule paragraph",
        doc!(p!(), common::hr()),
        doc!(p!()),
        Some(doc!()),
    );
    // adds a node when necessary
    fill(
        "paragraph horizontal_rule paragraph",
        doc!(p!()),
        doc!(p!()),
        Some(doc!(common::hr())),
    );
    // accepts an asterisk across the bound
    fill("hard_break*", p!(common::br()), p!(common::br()), Some(p!()));
    // accepts an asterisk only on the left
    fill("hard_break*", p!(common::br()), p!(), Some(p!()));
    // accepts an asterisk only on the right
    fill("hard_break*", p!(), p!(common::br()), Some(p!()));
    // accepts an asterisk with no elements
    fill("hard_break*", p!(), p!(), Some(p!()));
    // accepts a plus across the bound
    fill("hard_break+", p!(common::br()), p!(common::br()), Some(p!()));
    // adds an element for a content-less plus
    fill("hard_break+", p!(), p!(), Some(p!(common::br())));
    // fails for a mismatched plus
    fill("hard_break+", p!(), p!(common::img()), None);
    // gets the order right for sequences
    fill(
        "heading* paragraph*",
        doc!(common::block("heading", None, vec![])),
        doc!(p!()),
        Some(doc!()),
    );
}

#[test]
fn fill_adequacy_holds() {
    // If fill_before returns a fragment, matching fill then after must
    // reach a valid end.
    let (_, cm) = compile("paragraph horizontal_rule paragraph").expect("compiles");
    let after = doc!(p!());
    let fill = cm
        .fill_before(after.node.content(), true, 0)
        .expect("fill computes")
        .expect("fill exists");
    let matched = cm
        .match_fragment(&fill)
        .and_then(|m| m.match_fragment(after.node.content()))
        .expect("fill and after match");
    assert!(matched.valid_end());
}

fn compile_err(expr: &str) -> String {
    match compile(expr) {
        Ok(_) => panic!("expression {:?} should not compile", expr),
        Err(err) => err.to_string(),
    }
}

#[test]
fn reports_compile_errors() {
    assert_eq!(
        compile_err("(paragraph"),
        "Missing closing paren (in content expression '(paragraph')"
    );
    assert_eq!(
        compile_err("~paragraph"),
        "Unexpected token '~' (in content expression '~paragraph')"
    );
    assert_eq!(
        compile_err("nonexistent"),
        "No node type or group 'nonexistent' found (in content expression 'nonexistent')"
    );
    assert_eq!(
        compile_err("paragraph text*"),
        "Mixing inline and block content (in content expression 'paragraph text*')"
    );
    assert_eq!(
        compile_err("image"),
        "Only non-generatable nodes (image) in a required position (in content expression 'image')"
    );
    assert_eq!(
        compile_err("paragraph{x}"),
        "Expected number, got 'x' (in content expression 'paragraph{x}')"
    );
}

#[test]
fn empty_expression_is_a_leaf() {
    let schema = &*SCHEMA;
    assert!(schema.node_type("image").expect("image").is_leaf());
    assert!(schema.node_type("horizontal_rule").expect("hr").is_leaf());
    assert!(!schema.node_type("paragraph").expect("p").is_leaf());
    assert!(schema.node_type("paragraph").expect("p").is_textblock());
    assert!(schema.node_type("doc").expect("doc").is_block());
    assert!(!schema.node_type("doc").expect("doc").inline_content());
    assert!(schema.node_type("paragraph").expect("p").inline_content());
}

#[test]
fn compatible_content_shares_edges() {
    let schema = &*SCHEMA;
    let p_type = schema.node_type("paragraph").expect("p");
    let h_type = schema.node_type("heading").expect("h");
    let doc_type = schema.node_type("doc").expect("doc");
    assert!(p_type.compatible_content(&h_type));
    assert!(!p_type.compatible_content(&doc_type));
    assert!(doc_type.compatible_content(&doc_type));
}

#[test]
fn create_and_fill_satisfies_required_content() {
    let schema = &*SCHEMA;
    let li_type = schema.node_type("list_item").expect("li");
    let node = li_type
        .create_and_fill(None, vellum_model::Fragment::empty(), &[])
        .expect("no attr errors")
        .expect("list_item is fillable");
    assert_eq!(node.to_string(), "list_item(paragraph)");
    assert!(li_type.valid_content(node.content()));

    // An image cannot be generated: its src attribute has no default. The
    // fill search must pass it over in favor of a generatable type.
    let img_type = schema.node_type("image").expect("image");
    assert!(img_type.has_required_attrs());
    let (_, cm) = compile("image | hard_break").expect("compiles");
    let fill = cm
        .fill_before(&Fragment::empty(), true, 0)
        .expect("fill computes")
        .expect("fill exists");
    assert_eq!(fill.child_count(), 1);
    assert_eq!(
        fill.child(0).expect("filler").node_type().name(),
        "hard_break"
    );
}
