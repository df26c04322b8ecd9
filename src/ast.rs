use std::fmt::Display;

use crate::tokenizer::{Keyword, Token, TokenKind};

/// Grammar symbols that label interior nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Program,
    Begin,
    Descriptions,
    Descr,
    Type,
    VarList,
    Operators,
    Op,
    Arguments,
    Expr,
    SimpleExpr,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Symbol(Symbol),
    Leaf(TokenKind),
}

/// A node of the syntax tree. Interior nodes carry a grammar symbol, leaves
/// carry the token they were built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub label: Label,
    pub value: String,
    pub line: usize,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(symbol: Symbol, line: usize) -> Self {
        Node {
            label: Label::Symbol(symbol),
            value: String::new(),
            line,
            children: Vec::new(),
        }
    }

    pub fn leaf(token: &Token) -> Self {
        Node {
            label: Label::Leaf(token.kind),
            value: token.lexeme.clone(),
            line: token.line,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn is(&self, symbol: Symbol) -> bool {
        self.label == Label::Symbol(symbol)
    }

    pub fn is_leaf(&self, kind: TokenKind) -> bool {
        self.label == Label::Leaf(kind)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.is_leaf(TokenKind::Keyword(keyword))
    }

    /// First immediate child labelled `symbol`.
    pub fn child(&self, symbol: Symbol) -> Option<&Node> {
        self.children.iter().find(|c| c.is(symbol))
    }

    pub fn children_of(&self, symbol: Symbol) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.is(symbol))
    }

    /// First immediate leaf child of the given kind.
    pub fn leaf_child(&self, kind: TokenKind) -> Option<&Node> {
        self.children.iter().find(|c| c.is_leaf(kind))
    }

    fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        let indent = "  ".repeat(depth);
        match self.label {
            Label::Symbol(symbol) => writeln!(f, "{indent}{symbol}")?,
            Label::Leaf(_) => writeln!(f, "{indent}'{}'", self.value)?,
        }
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Symbol(symbol) => write!(f, "{}", symbol),
            Label::Leaf(kind) => write!(f, "{}", kind),
        }
    }
}

/// Renders the tree as the parse trace: one line per node, two spaces of
/// indentation per level, leaves quoted.
impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Node {
        let mut begin = Node::new(Symbol::Begin, 1);
        begin.push(Node::leaf(&Token::new(
            "PROGRAM",
            TokenKind::Keyword(Keyword::Program),
            1,
        )));
        begin.push(Node::leaf(&Token::new("p", TokenKind::Identifier, 1)));

        let mut program = Node::new(Symbol::Program, 1);
        program.push(begin);
        program.push(Node::new(Symbol::Descriptions, 2));
        program
    }

    #[test]
    fn test_trace() {
        let expected = "Program\n  Begin\n    'PROGRAM'\n    'p'\n  Descriptions\n";
        assert_eq!(sample().to_string(), expected);
    }

    #[test]
    fn test_lookup_helpers() {
        let program = sample();
        let begin = program.child(Symbol::Begin).unwrap();
        assert!(begin.leaf_child(TokenKind::Keyword(Keyword::Program)).is_some());
        assert_eq!(begin.leaf_child(TokenKind::Identifier).unwrap().value, "p");
        assert!(program.child(Symbol::End).is_none());
        assert_eq!(begin.label.to_string(), "Begin");
        assert_eq!(begin.children[1].label.to_string(), "IDENTIFIER");
    }
}
