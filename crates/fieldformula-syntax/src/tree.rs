//! Parse tree contract
//!
//! Nodes live in a flat arena and refer to their children by index. Chain
//! nodes keep their operands and operator tokens interleaved, so a run of
//! same-precedence binary operators is one node rather than a nested tree.

use crate::error::{SyntaxError, SyntaxResult};

/// Index of a node inside its [`ParseTree`]
pub type NodeId = usize;

/// Byte range of a node in the formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

/// Node kinds a parse tree may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Pass-through wrappers
    Expression,
    Term,
    ParenExpr,

    // Chains of `[operand, operator, operand, ...]`
    Expr,
    OrExpr,
    AndExpr,
    CompExpr,
    AddExpr,
    MulExpr,

    // Leaves and calls
    Number,
    String,
    Boolean,
    Variable,
    Identifier,
    Function,

    // Operator tokens
    MulOperator,
    AddOperator,
    CompOperator,
    AndOperator,
    OrOperator,

    /// Placeholder left where the parser recovered from a missing operator
    Error,
}

impl NodeKind {
    /// Whether children alternate between operands and operators
    pub fn is_chain(self) -> bool {
        matches!(
            self,
            NodeKind::Expr
                | NodeKind::OrExpr
                | NodeKind::AndExpr
                | NodeKind::CompExpr
                | NodeKind::AddExpr
                | NodeKind::MulExpr
        )
    }

    /// Whether the node may sit in an operator slot of a chain
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            NodeKind::MulOperator
                | NodeKind::AddOperator
                | NodeKind::CompOperator
                | NodeKind::AndOperator
                | NodeKind::OrOperator
                | NodeKind::Error
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Expression => "Expression",
            NodeKind::Term => "Term",
            NodeKind::ParenExpr => "ParenExpr",
            NodeKind::Expr => "Expr",
            NodeKind::OrExpr => "OrExpr",
            NodeKind::AndExpr => "AndExpr",
            NodeKind::CompExpr => "CompExpr",
            NodeKind::AddExpr => "AddExpr",
            NodeKind::MulExpr => "MulExpr",
            NodeKind::Number => "Number",
            NodeKind::String => "String",
            NodeKind::Boolean => "Boolean",
            NodeKind::Variable => "Variable",
            NodeKind::Identifier => "Identifier",
            NodeKind::Function => "Function",
            NodeKind::MulOperator => "MulOperator",
            NodeKind::AddOperator => "AddOperator",
            NodeKind::CompOperator => "CompOperator",
            NodeKind::AndOperator => "AndOperator",
            NodeKind::OrOperator => "OrOperator",
            NodeKind::Error => "Error",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single node of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<NodeId>,
}

/// An immutable parse tree
///
/// Every child is stored before its parent, which keeps the arena acyclic
/// and lets the root be the last node pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    root: NodeId,
}

impl ParseTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node. Ids come from this tree, so out-of-range ids are a
    /// caller bug.
    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&ParseNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Source text covered by a node
    ///
    /// Returns an empty string when the span does not fit the source.
    pub fn text<'s>(&self, id: NodeId, source: &'s str) -> &'s str {
        let span = self.nodes[id].span;
        source.get(span.from..span.to).unwrap_or("")
    }

    /// Depth-first, pre-order walk starting at the root
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![self.root],
        }
    }
}

/// Iterator returned by [`ParseTree::preorder`]
pub struct Preorder<'t> {
    tree: &'t ParseTree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Preorder<'t> {
    type Item = (NodeId, &'t ParseNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

/// Incremental builder for [`ParseTree`]
///
/// Used by the bundled parser, and by any other producer that wants its
/// output checked against the node shape rules.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<ParseNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        self.nodes.push(ParseNode {
            kind,
            span,
            children,
        });
        self.nodes.len() - 1
    }

    pub fn leaf(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.push(kind, span, Vec::new())
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes.get(id).map(|n| n.span).unwrap_or_default()
    }

    /// Validate the collected nodes and seal them into a tree
    pub fn finish(self, root: NodeId) -> SyntaxResult<ParseTree> {
        if root >= self.nodes.len() {
            return Err(SyntaxError::MalformedTree(format!(
                "root {} is not a node",
                root
            )));
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(&child) = node.children.iter().find(|&&c| c >= id) {
                return Err(SyntaxError::MalformedTree(format!(
                    "{} node {} refers to child {} that is not stored before it",
                    node.kind, id, child
                )));
            }

            if node.kind.is_chain() {
                if node.children.len() % 2 == 0 {
                    return Err(SyntaxError::MalformedTree(format!(
                        "{} node {} has {} children, expected an odd count",
                        node.kind,
                        id,
                        node.children.len()
                    )));
                }
                for (i, &child) in node.children.iter().enumerate() {
                    let is_operator = self.nodes[child].kind.is_operator();
                    if is_operator != (i % 2 == 1) {
                        return Err(SyntaxError::MalformedTree(format!(
                            "{} node {} has {} at position {}",
                            node.kind, id, self.nodes[child].kind, i
                        )));
                    }
                }
            }

            if matches!(node.kind, NodeKind::Variable | NodeKind::Function) {
                let first = node.children.first().map(|&c| self.nodes[c].kind);
                if first != Some(NodeKind::Identifier) {
                    return Err(SyntaxError::MalformedTree(format!(
                        "{} node {} does not start with an identifier",
                        node.kind, id
                    )));
                }
            }
        }

        Ok(ParseTree {
            nodes: self.nodes,
            root,
        })
    }
}
