mod common;

use common::{blockquote, doc, em, h1, h2, p, strong, Tagged};

fn start(a: Tagged, b: Tagged) {
    let found = a.node.content().find_diff_start(b.node.content(), 0);
    match a.maybe_tag("a") {
        Some(expected) => assert_eq!(found, Some(expected)),
        None => assert_eq!(found, None),
    }
}

fn end(a: Tagged, b: Tagged) {
    let found = a.node.content().find_diff_end(
        b.node.content(),
        a.node.content().size(),
        b.node.content().size(),
    );
    match a.maybe_tag("a") {
        Some(expected) => {
            let found = found.expect("a difference exists");
            assert_eq!(found.a, expected);
        }
        None => assert!(found.is_none()),
    }
}

#[test]
fn find_diff_start_locates_differences() {
    // returns null for identical nodes
    start(
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
    );

    // notices when one node is longer
    start(
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye")), "<a>"),
        doc!(
            p!("a", em!("b")),
            p!("hello"),
            blockquote!(h1!("bye")),
            p!("oops")
        ),
    );

    // notices when one node is shorter
    start(
        doc!(
            p!("a", em!("b")),
            p!("hello"),
            blockquote!(h1!("bye")),
            "<a>",
            p!("oops")
        ),
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
    );

    // notices differing marks
    start(doc!(p!("a<a>", em!("b"))), doc!(p!("a", strong!("b"))));

    // stops at longer text
    start(doc!(p!("foo<a>bar", em!("b"))), doc!(p!("foo", em!("b"))));

    // stops at a different character
    start(doc!(p!("foo<a>bar")), doc!(p!("foocar")));

    // stops at a different node type
    start(doc!(p!("a"), "<a>", p!("b")), doc!(p!("a"), h1!("b")));

    // works when the difference is at the start
    start(doc!("<a>", p!("b")), doc!(h1!("b")));

    // notices a different attribute
    start(doc!(p!("a"), "<a>", h1!("foo")), doc!(p!("a"), h2!("foo")));
}

#[test]
fn find_diff_end_locates_differences() {
    // returns null when there is no difference
    end(
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
    );

    // notices when the second doc is longer
    end(
        doc!("<a>", p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
        doc!(
            p!("oops"),
            p!("a", em!("b")),
            p!("hello"),
            blockquote!(h1!("bye"))
        ),
    );

    // notices when the second doc is shorter
    end(
        doc!(
            p!("oops"),
            "<a>",
            p!("a", em!("b")),
            p!("hello"),
            blockquote!(h1!("bye"))
        ),
        doc!(p!("a", em!("b")), p!("hello"), blockquote!(h1!("bye"))),
    );

    // notices different styles
    end(
        doc!(p!("a", em!("b"), "<a>c")),
        doc!(p!("a", strong!("b"), "c")),
    );

    // spots longer text
    end(doc!(p!("bar<a>foo", em!("b"))), doc!(p!("foo", em!("b"))));

    // spots different text
    end(doc!(p!("foob<a>ar")), doc!(p!("foocar")));

    // notices different nodes
    end(doc!(p!("a"), "<a>", p!("b")), doc!(h1!("a"), p!("b")));

    // notices a difference at the end
    end(doc!(p!("b"), "<a>"), doc!(h1!("b")));

    // handles a similar start
    end(doc!("<a>", p!("hello")), doc!(p!("hey"), p!("hello")));
}
