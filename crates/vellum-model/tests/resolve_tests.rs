mod common;

use common::{blockquote, doc, em, p};
use vellum_model::Node;

/// Either a node (compared by identity with an ancestor), a text content
/// string (for text nodes around a position), or nothing.
#[derive(Clone)]
enum Expect {
    Node(Node),
    Text(&'static str),
    None,
}

fn check_neighbor(actual: Option<Node>, expected: &Expect) {
    match expected {
        Expect::Node(node) => {
            let actual = actual.expect("a node");
            assert_eq!(&actual, node);
        }
        Expect::Text(text) => {
            let actual = actual.expect("a node");
            assert_eq!(actual.text_content(), *text);
        }
        Expect::None => assert!(actual.is_none()),
    }
}

#[test]
fn resolve_reflects_document_structure() {
    let tagged = doc!(p!("ab"), blockquote!(p!(em!("cd"), "ef")));
    let root = tagged.node.clone();

    let p1 = root.child(0).expect("p1").clone();
    let blk = root.child(1).expect("blk").clone();
    let p2 = blk.child(0).expect("p2").clone();

    // One row per position: the ancestor chain as (node, start, end)
    // triples, then the parent offset, then node-before / node-after.
    struct Row {
        ancestors: Vec<(Node, usize, usize)>,
        parent_offset: usize,
        before: Expect,
        after: Expect,
    }
    let rdoc = (root.clone(), 0, 12);
    let rp1 = (p1.clone(), 1, 3);
    let rblk = (blk.clone(), 5, 11);
    let rp2 = (p2.clone(), 6, 10);

    let rows = vec![
        Row {
            ancestors: vec![rdoc.clone()],
            parent_offset: 0,
            before: Expect::None,
            after: Expect::Node(p1.clone()),
        },
        Row {
            ancestors: vec![rdoc.clone(), rp1.clone()],
            parent_offset: 0,
            before: Expect::None,
            after: Expect::Text("ab"),
        },
        Row {
            ancestors: vec![rdoc.clone(), rp1.clone()],
            parent_offset: 1,
            before: Expect::Text("a"),
            after: Expect::Text("b"),
        },
        Row {
            ancestors: vec![rdoc.clone(), rp1.clone()],
            parent_offset: 2,
            before: Expect::Text("ab"),
            after: Expect::None,
        },
        Row {
            ancestors: vec![rdoc.clone()],
            parent_offset: 4,
            before: Expect::Node(p1.clone()),
            after: Expect::Node(blk.clone()),
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone()],
            parent_offset: 0,
            before: Expect::None,
            after: Expect::Node(p2.clone()),
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone(), rp2.clone()],
            parent_offset: 0,
            before: Expect::None,
            after: Expect::Text("cd"),
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone(), rp2.clone()],
            parent_offset: 1,
            before: Expect::Text("c"),
            after: Expect::Text("d"),
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone(), rp2.clone()],
            parent_offset: 2,
            before: Expect::Text("cd"),
            after: Expect::Text("ef"),
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone(), rp2.clone()],
            parent_offset: 3,
            before: Expect::Text("e"),
            after: Expect::Text("f"),
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone(), rp2.clone()],
            parent_offset: 4,
            before: Expect::Text("ef"),
            after: Expect::None,
        },
        Row {
            ancestors: vec![rdoc.clone(), rblk.clone()],
            parent_offset: 6,
            before: Expect::Node(p2.clone()),
            after: Expect::None,
        },
        Row {
            ancestors: vec![rdoc.clone()],
            parent_offset: 12,
            before: Expect::Node(blk.clone()),
            after: Expect::None,
        },
    ];

    for (pos, row) in rows.iter().enumerate() {
        let rpos = root.resolve(pos).expect("resolves");
        assert_eq!(rpos.depth(), row.ancestors.len() - 1, "depth at {}", pos);
        for (d, (node, start, end)) in row.ancestors.iter().enumerate() {
            assert_eq!(rpos.node(d), node, "node at {} depth {}", pos, d);
            assert_eq!(rpos.start(d), *start, "start at {} depth {}", pos, d);
            assert_eq!(rpos.end(d), *end, "end at {} depth {}", pos, d);
            if d > 0 {
                assert_eq!(rpos.before(d).expect("before"), start - 1);
                assert_eq!(rpos.after(d).expect("after"), end + 1);
            }
        }
        assert_eq!(rpos.parent_offset(), row.parent_offset, "offset at {}", pos);
        check_neighbor(rpos.node_before(), &row.before);
        check_neighbor(rpos.node_after(), &row.after);
    }
}

#[test]
fn resolve_rejects_out_of_range_positions() {
    let tagged = doc!(p!("ab"));
    let err = tagged.node.resolve(99).expect_err("out of range");
    assert_eq!(err.to_string(), "Position 99 out of range");
}

#[test]
fn before_and_after_fail_at_the_top() {
    let tagged = doc!(p!("ab"));
    let rpos = tagged.node.resolve(0).expect("resolves");
    assert_eq!(
        rpos.before(0).expect_err("no before").to_string(),
        "There is no position before the top-level node"
    );
    assert_eq!(
        rpos.after(0).expect_err("no after").to_string(),
        "There is no position after the top-level node"
    );
}

#[test]
fn positions_stay_monotonic_through_the_ancestor_chain() {
    let tagged = doc!(
        p!("one"),
        blockquote!(p!("two"), blockquote!(p!("three", em!("four"))))
    );
    let root = tagged.node;
    for pos in 0..=root.content().size() {
        let rpos = root.resolve(pos).expect("resolves");
        for d in 0..=rpos.depth() {
            assert!(rpos.start(d) <= rpos.pos());
            assert!(rpos.pos() <= rpos.end(d));
            assert!(rpos.end(d) <= root.content().size());
        }
    }
}

#[test]
fn cached_resolution_matches_uncached() {
    let tagged = doc!(p!("ab"), blockquote!(p!("cd")));
    let root = tagged.node;
    for pos in 0..=root.content().size() {
        let cached = root.resolve(pos).expect("cached resolves");
        let plain = root.resolve_no_cache(pos).expect("plain resolves");
        assert_eq!(cached.pos(), plain.pos());
        assert_eq!(cached.depth(), plain.depth());
        assert_eq!(cached.parent_offset(), plain.parent_offset());
        // Hitting the cache again must give the same answer.
        let again = root.resolve(pos).expect("resolves again");
        assert_eq!(again.depth(), plain.depth());
        assert_eq!(again.parent_offset(), plain.parent_offset());
    }
}

#[test]
fn resolve_depth_interprets_negative_depths() {
    let tagged = doc!(blockquote!(p!("a<a>b")));
    let rpos = tagged.node.resolve(tagged.tag("a")).expect("resolves");
    assert_eq!(rpos.depth(), 2);
    assert_eq!(rpos.resolve_depth(-1), 1);
    assert_eq!(rpos.node(rpos.resolve_depth(-1)).node_type().name(), "blockquote");
    assert_eq!(rpos.resolve_depth(0), 0);
    assert_eq!(rpos.resolve_depth(1), 1);
}

#[test]
fn shared_depth_finds_common_ancestors() {
    let tagged = doc!(blockquote!(p!("a<a>b"), p!("c<b>d")), p!("x<c>y"));
    let ra = tagged.node.resolve(tagged.tag("a")).expect("resolves");
    assert_eq!(ra.shared_depth(tagged.tag("b")), 1);
    assert_eq!(ra.shared_depth(tagged.tag("c")), 0);
    assert_eq!(ra.shared_depth(tagged.tag("a")), 2);
}
