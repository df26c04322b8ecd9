use std::fmt::Display;

use crate::{
    ast::{Label, Node, Symbol},
    diagnostic::{CompileError, Diagnostic},
    symbol_table::{SymbolTable, DEFAULT_CAPACITY},
    tokenizer::{Keyword, TokenKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Integer,
    Real,
    Unknown,
}

impl Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Integer => write!(f, "INTEGER"),
            VarType::Real => write!(f, "REAL"),
            VarType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: VarType,
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("AST is empty")]
    MissingTree,
    #[error("Variable '{0}' is not declared")]
    Undeclared(String),
    #[error("Variable '{0}' is already declared")]
    Redeclared(String),
    #[error("Type mismatch. Cannot assign {found} to {expected} variable")]
    TypeMismatch { found: VarType, expected: VarType },
    #[error("Expression mixes INTEGER and REAL operands")]
    MixedOperands,
    #[error("Program name mismatch. Expected '{expected}', got '{found}'")]
    ProgramNameMismatch { expected: String, found: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpressionType {
    Untyped,
    Uniform(VarType),
    Mixed,
}

#[derive(Debug)]
pub struct Analysis {
    pub program_name: Option<String>,
    pub variables: SymbolTable<Variable>,
    pub postfix: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.lookup(name)
    }
}

pub fn analyze(tree: Option<&Node>) -> Analysis {
    Analyzer::new().analyze(tree)
}

/// Checks declarations and types over a parsed program and emits postfix code.
pub struct Analyzer {
    variables: SymbolTable<Variable>,
    program_name: Option<String>,
    postfix: Vec<String>,
    errors: Vec<Diagnostic>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Analyzer {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Analyzer {
        Analyzer {
            variables: SymbolTable::with_capacity(capacity),
            program_name: None,
            postfix: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn analyze(mut self, tree: Option<&Node>) -> Analysis {
        match tree {
            Some(root) => {
                self.declarations(root);
                self.operators(root);
                self.end(root);
            }
            None => self.error(0, SemanticError::MissingTree),
        }

        Analysis {
            program_name: self.program_name,
            variables: self.variables,
            postfix: self.postfix,
            diagnostics: self.errors,
        }
    }

    fn declarations(&mut self, node: &Node) {
        if node.is(Symbol::Begin) {
            self.begin(node);
        } else if node.is(Symbol::Descriptions) {
            for descr in node.children_of(Symbol::Descr) {
                let ty = descr
                    .child(Symbol::Type)
                    .map_or(VarType::Unknown, declared_type);
                for var_list in descr.children_of(Symbol::VarList) {
                    self.declare(var_list, ty);
                }
            }
        }

        for child in &node.children {
            self.declarations(child);
        }
    }

    fn begin(&mut self, node: &Node) {
        if let Some(name) = node.leaf_child(TokenKind::Identifier) {
            self.program_name = Some(name.value.clone());
            self.emit(&[name.value.as_str(), "PROGRAM"]);
        }
    }

    fn declare(&mut self, var_list: &Node, ty: VarType) {
        let mut declared = Vec::new();

        for name in var_list.children.iter().filter(|c| c.is_leaf(TokenKind::Identifier)) {
            if self.variables.contains(&name.value) {
                self.error(name.line, SemanticError::Redeclared(name.value.clone()));
                continue;
            }

            let variable = Variable {
                name: name.value.clone(),
                ty,
                initialized: false,
            };
            match self.variables.insert(&name.value, variable) {
                Ok(_) => declared.push(name.value.as_str()),
                Err(e) => self.error(name.line, e),
            }
        }

        if !declared.is_empty() {
            let ty = ty.to_string();
            let count = (declared.len() + 1).to_string();
            let mut parts = vec![ty.as_str()];
            parts.extend(declared);
            parts.extend([count.as_str(), "DECL"]);
            self.emit(&parts);
        }
    }

    fn operators(&mut self, node: &Node) {
        if node.is(Symbol::Operators) {
            for op in node.children_of(Symbol::Op) {
                self.op(op);
            }
        }

        for child in &node.children {
            self.operators(child);
        }
    }

    fn op(&mut self, op: &Node) {
        if op.children.iter().any(|c| c.is_keyword(Keyword::Call)) {
            self.call(op);
        } else if let (Some(target), Some(expr)) =
            (op.leaf_child(TokenKind::Identifier), op.child(Symbol::Expr))
        {
            self.assignment(target, expr);
        }
    }

    fn assignment(&mut self, target: &Node, expr: &Node) {
        let slot = self.variables.find(&target.value);
        if slot.is_none() {
            self.error(target.line, SemanticError::Undeclared(target.value.clone()));
        }

        let postfix = self.postfix(expr);
        let expression_type = self.expression_type(expr);

        // nothing survived recovery, so there is no value to assign
        let Some(slot) = slot.filter(|_| !postfix.is_empty()) else {
            return;
        };
        let declared = self.variables.get(slot).map_or(VarType::Unknown, |v| v.ty);

        match expression_type {
            ExpressionType::Mixed => self.error(target.line, SemanticError::MixedOperands),
            ExpressionType::Uniform(found) if declared != VarType::Unknown && found != declared => {
                self.error(
                    target.line,
                    SemanticError::TypeMismatch {
                        found,
                        expected: declared,
                    },
                )
            }
            _ => {}
        }

        if let Some(variable) = self.variables.get_mut(slot) {
            variable.initialized = true;
        }
        self.emit(&[target.value.as_str(), postfix.as_str(), "="]);
    }

    fn call(&mut self, op: &Node) {
        let Some(callee) = op.leaf_child(TokenKind::Identifier) else {
            return;
        };

        let mut arguments = Vec::new();
        if let Some(args) = op.child(Symbol::Arguments) {
            for expr in args.children_of(Symbol::Expr) {
                let argument = self.postfix(expr);
                if !argument.is_empty() {
                    arguments.push(argument);
                }
            }
        }

        let count = (arguments.len() + 1).to_string();
        let mut parts = vec![callee.value.as_str()];
        parts.extend(arguments.iter().map(String::as_str));
        parts.extend([count.as_str(), "CALL"]);
        self.emit(&parts);
    }

    fn end(&mut self, node: &Node) {
        if node.is(Symbol::End) {
            if let Some(name) = node.leaf_child(TokenKind::Identifier) {
                if let Some(expected) = &self.program_name {
                    if expected != &name.value {
                        let error = SemanticError::ProgramNameMismatch {
                            expected: expected.clone(),
                            found: name.value.clone(),
                        };
                        self.error(name.line, error);
                    }
                }
                self.emit(&[name.value.as_str(), "END"]);
            }
        }

        for child in &node.children {
            self.end(child);
        }
    }

    /// Renders an expression in postfix order, reporting undeclared
    /// identifiers along the way.
    fn postfix(&mut self, expr: &Node) -> String {
        let mut output = Vec::new();
        let mut operators = Vec::new();
        self.convert(expr, &mut output, &mut operators);
        while let Some(operator) = operators.pop() {
            output.push(operator);
        }
        output.join(" ")
    }

    // '+' and '-' share one precedence level, so a new operator first flushes
    // the stacked ones down to the nearest '('.
    fn convert<'n>(
        &mut self,
        node: &'n Node,
        output: &mut Vec<&'n str>,
        operators: &mut Vec<&'n str>,
    ) {
        match node.label {
            Label::Leaf(TokenKind::Identifier) => {
                if !self.variables.contains(&node.value) {
                    self.error(node.line, SemanticError::Undeclared(node.value.clone()));
                }
                output.push(&node.value);
            }
            Label::Leaf(TokenKind::Integer | TokenKind::Real) => output.push(&node.value),
            Label::Leaf(TokenKind::Plus | TokenKind::Minus) => {
                while let Some(&top) = operators.last() {
                    if top == "(" {
                        break;
                    }
                    output.push(top);
                    operators.pop();
                }
                operators.push(&node.value);
            }
            Label::Leaf(TokenKind::LeftParen) => operators.push("("),
            Label::Leaf(TokenKind::RightParen) => {
                while let Some(top) = operators.pop() {
                    if top == "(" {
                        break;
                    }
                    output.push(top);
                }
            }
            _ => {}
        }

        for child in &node.children {
            self.convert(child, output, operators);
        }
    }

    fn expression_type(&self, expr: &Node) -> ExpressionType {
        let mut integer = false;
        let mut real = false;
        self.operand_types(expr, &mut integer, &mut real);
        match (integer, real) {
            (true, true) => ExpressionType::Mixed,
            (true, false) => ExpressionType::Uniform(VarType::Integer),
            (false, true) => ExpressionType::Uniform(VarType::Real),
            (false, false) => ExpressionType::Untyped,
        }
    }

    fn operand_types(&self, node: &Node, integer: &mut bool, real: &mut bool) {
        let ty = match node.label {
            Label::Leaf(TokenKind::Integer) => VarType::Integer,
            Label::Leaf(TokenKind::Real) => VarType::Real,
            Label::Leaf(TokenKind::Identifier) => self
                .variables
                .lookup(&node.value)
                .map_or(VarType::Unknown, |v| v.ty),
            _ => VarType::Unknown,
        };
        match ty {
            VarType::Integer => *integer = true,
            VarType::Real => *real = true,
            VarType::Unknown => {}
        }

        for child in &node.children {
            self.operand_types(child, integer, real);
        }
    }

    fn emit(&mut self, parts: &[&str]) {
        let line = parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        self.postfix.push(line);
    }

    fn error(&mut self, line: usize, error: impl Into<CompileError>) {
        self.errors.push(Diagnostic::new(line, error));
    }
}

fn declared_type(ty: &Node) -> VarType {
    if ty.leaf_child(TokenKind::Keyword(Keyword::Integer)).is_some() {
        VarType::Integer
    } else if ty.leaf_child(TokenKind::Keyword(Keyword::Real)).is_some() {
        VarType::Real
    } else {
        VarType::Unknown
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{parser::parse, tokenizer::tokenize};

    fn analyze_source(source: &str) -> Analysis {
        let tokens = tokenize(source).valid_tokens();
        let (tree, _) = parse(&tokens);
        analyze(Some(&tree))
    }

    fn errors(analysis: &Analysis) -> Vec<SemanticError> {
        analysis
            .diagnostics
            .iter()
            .map(|d| match &d.error {
                CompileError::Semantic(e) => e.clone(),
                other => panic!("unexpected diagnostic {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_postfix_program() {
        let analysis = analyze_source(
            "PROGRAM demo\nINTEGER a, b\nREAL r\na = 1\nb = a + (2 - a)\nr = 2.5 - r\nCALL show(a, b + 1)\nEND demo",
        );
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(
            analysis.postfix,
            vec![
                "demo PROGRAM",
                "INTEGER a b 3 DECL",
                "REAL r 2 DECL",
                "a 1 =",
                "b a 2 a - + =",
                "r 2.5 r - =",
                "show a b 1 + 3 CALL",
                "demo END",
            ]
        );
    }

    #[test]
    fn test_left_associative_postfix() {
        let analysis = analyze_source("PROGRAM p INTEGER a, b, c a = a - b + c END p");
        assert_eq!(analysis.postfix[2], "a a b - c + =");
    }

    #[test]
    fn test_broken_statements_emit_only_what_parsed() {
        let analysis = analyze_source("PROGRAM p INTEGER a CALL f(, 2) CALL g(= 1) a = = END p");
        assert_eq!(
            analysis.postfix,
            vec!["p PROGRAM", "INTEGER a 2 DECL", "f 2 2 CALL", "g 1 2 CALL", "p END"]
        );
        assert!(!analysis.variable("a").unwrap().initialized);
    }

    #[test]
    fn test_call_without_arguments() {
        let analysis = analyze_source("PROGRAM p CALL tick() END p");
        assert_eq!(analysis.postfix, vec!["p PROGRAM", "tick 1 CALL", "p END"]);
    }

    #[test]
    fn test_variable_table() {
        let analysis = analyze_source("PROGRAM p INTEGER a, b a = 1 END p");
        assert_eq!(
            analysis.variable("a"),
            Some(&Variable {
                name: "a".to_string(),
                ty: VarType::Integer,
                initialized: true,
            })
        );
        assert!(!analysis.variable("b").unwrap().initialized);
        assert_eq!(analysis.variables.len(), 2);
    }

    #[test]
    fn test_redeclaration() {
        let analysis = analyze_source("PROGRAM p INTEGER x REAL x, y END p");
        assert_eq!(errors(&analysis), vec![SemanticError::Redeclared("x".to_string())]);
        assert_eq!(analysis.variable("x").unwrap().ty, VarType::Integer);
        assert_eq!(analysis.postfix[2], "REAL y 2 DECL");
    }

    #[test]
    fn test_fully_redeclared_group_emits_nothing() {
        let analysis = analyze_source("PROGRAM p INTEGER x INTEGER x END p");
        assert_eq!(analysis.postfix, vec!["p PROGRAM", "INTEGER x 2 DECL", "p END"]);
    }

    #[test]
    fn test_undeclared() {
        let analysis = analyze_source("PROGRAM p INTEGER a\nb = a + c\nCALL f(d)\nEND p");
        assert_eq!(
            errors(&analysis),
            vec![
                SemanticError::Undeclared("b".to_string()),
                SemanticError::Undeclared("c".to_string()),
                SemanticError::Undeclared("d".to_string()),
            ]
        );
        let lines: Vec<_> = analysis.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![2, 2, 3]);
        // no instruction for the undeclared target
        assert_eq!(analysis.postfix, vec!["p PROGRAM", "INTEGER a 2 DECL", "f d 2 CALL", "p END"]);
    }

    #[test]
    fn test_type_mismatch() {
        let analysis = analyze_source("PROGRAM p REAL a a = 1 END p");
        assert_eq!(
            errors(&analysis),
            vec![SemanticError::TypeMismatch {
                found: VarType::Integer,
                expected: VarType::Real,
            }]
        );
        assert_eq!(
            analysis.diagnostics[0].to_string(),
            "SEMANTIC ERROR at line 1: Type mismatch. Cannot assign INTEGER to REAL variable"
        );
        assert!(analysis.variable("a").unwrap().initialized);
    }

    #[test]
    fn test_mixed_operands() {
        let analysis = analyze_source("PROGRAM p INTEGER i REAL r r = i + 1.5 END p");
        assert_eq!(errors(&analysis), vec![SemanticError::MixedOperands]);
        assert_eq!(analysis.postfix[3], "r i 1.5 + =");
    }

    #[test]
    fn test_undeclared_operands_skip_type_check() {
        let analysis = analyze_source("PROGRAM p REAL r r = q END p");
        assert_eq!(errors(&analysis), vec![SemanticError::Undeclared("q".to_string())]);
    }

    #[test]
    fn test_program_name_mismatch() {
        let analysis = analyze_source("PROGRAM p END q");
        assert_eq!(
            errors(&analysis),
            vec![SemanticError::ProgramNameMismatch {
                expected: "p".to_string(),
                found: "q".to_string(),
            }]
        );
        assert_eq!(analysis.postfix, vec!["p PROGRAM", "q END"]);
    }

    #[test]
    fn test_missing_tree() {
        let analysis = analyze(None);
        assert_eq!(errors(&analysis), vec![SemanticError::MissingTree]);
        assert!(analysis.postfix.is_empty());
    }

    #[test]
    fn test_full_variable_table() {
        let tokens = tokenize("PROGRAM p INTEGER a, b, c END p").valid_tokens();
        let (tree, _) = parse(&tokens);
        let analysis = Analyzer::with_capacity(2).analyze(Some(&tree));
        assert_eq!(analysis.variables.len(), 2);
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.postfix[1], "INTEGER a b 3 DECL");
    }
}
