//! Shape guarantees the evaluator relies on, checked over a spread of formulas

use fieldformula_syntax::{parse, NodeKind, ParseTree};
use pretty_assertions::assert_eq;

const FORMULAS: &[&str] = &[
    "11 + 1",
    "IF(Amount > 1000, \"High\", \"Low\")",
    "FirstName & \" \" & LastName",
    "CASE(3, 1, \"One\", 2, \"Two\", 3, \"Three\", \"Other\")",
    "NOT(a.b.c = null) && (x || undefined)",
    "ROUND(-12.5 * (2 - .5) / 3, -1)",
    "AND(true, false) OR false",
    "PI()",
];

fn check(tree: &ParseTree, source: &str) {
    for (id, node) in tree.preorder() {
        assert!(node.span.from <= node.span.to, "{}: {:?}", source, node);
        assert!(node.span.to <= source.len(), "{}: {:?}", source, node);

        for &child in &node.children {
            assert!(child < id, "{}: child {} after parent {}", source, child, id);
        }

        match node.kind {
            kind if kind.is_chain() => {
                assert!(node.children.len() >= 3, "{}: short {}", source, kind);
                assert_eq!(node.children.len() % 2, 1, "{}", source);
                for (i, &child) in node.children.iter().enumerate() {
                    assert_eq!(tree.node(child).kind.is_operator(), i % 2 == 1, "{}", source);
                }
            }
            NodeKind::Function | NodeKind::Variable => {
                let first = node.children[0];
                assert_eq!(tree.node(first).kind, NodeKind::Identifier, "{}", source);
            }
            NodeKind::String => {
                let text = tree.text(id, source);
                assert!(text.starts_with('"') && text.ends_with('"'), "{}", text);
            }
            NodeKind::Boolean => {
                let text = tree.text(id, source);
                assert!(text == "true" || text == "false", "{}", text);
            }
            _ => {}
        }
    }
}

#[test]
fn test_trees_satisfy_contract() {
    for source in FORMULAS {
        let tree = parse(source).unwrap_or_else(|e| panic!("{}: {}", source, e));
        assert_eq!(tree.node(tree.root()).kind, NodeKind::Expression);
        check(&tree, source);
    }
}

#[test]
fn test_variable_segments() {
    let source = "a.b.c";
    let tree = parse(source).unwrap();
    let variable = tree
        .preorder()
        .find(|(_, node)| node.kind == NodeKind::Variable)
        .map(|(id, _)| id)
        .unwrap();
    let segments: Vec<&str> = tree
        .node(variable)
        .children
        .iter()
        .map(|&child| tree.text(child, source))
        .collect();
    assert_eq!(segments, vec!["a", "b", "c"]);
}

#[test]
fn test_function_arguments_follow_name() {
    let source = "MID(\"abc\", 1, 2)";
    let tree = parse(source).unwrap();
    let (_, call) = tree
        .preorder()
        .find(|(_, node)| node.kind == NodeKind::Function)
        .unwrap();
    assert_eq!(tree.text(call.children[0], source), "MID");
    let args: Vec<&str> = call.children[1..]
        .iter()
        .map(|&child| tree.text(child, source))
        .collect();
    assert_eq!(args, vec!["\"abc\"", "1", "2"]);
}
