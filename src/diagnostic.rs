use std::fmt::Display;

use crate::{
    parser::SyntaxError, semantic::SemanticError, symbol_table::SymbolTableError,
    tokenizer::LexicalError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexical,
    Syntax,
    Semantic,
    Capacity,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Lexical => write!(f, "LEXICAL"),
            Phase::Syntax => write!(f, "SYNTAX"),
            Phase::Semantic => write!(f, "SEMANTIC"),
            Phase::Capacity => write!(f, "CAPACITY"),
        }
    }
}

/// What a syntax error ran into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    Token(String),
    EndOfFile,
    EmptyFile,
}

impl Display for Found {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Found::Token(lexeme) => write!(f, "(found '{}')", lexeme),
            Found::EndOfFile => write!(f, "(unexpected end of file)"),
            Found::EmptyFile => write!(f, "(file is empty)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error("{error} {found}")]
    Syntax { error: SyntaxError, found: Found },
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Capacity(#[from] SymbolTableError),
}

impl CompileError {
    pub fn phase(&self) -> Phase {
        match self {
            CompileError::Lexical(_) => Phase::Lexical,
            CompileError::Syntax { .. } => Phase::Syntax,
            CompileError::Semantic(_) => Phase::Semantic,
            CompileError::Capacity(_) => Phase::Capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: CompileError,
}

impl Diagnostic {
    pub fn new(line: usize, error: impl Into<CompileError>) -> Self {
        Diagnostic {
            line,
            error: error.into(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.error.phase()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.phase() {
            Phase::Lexical => write!(f, "LEXICAL ERROR: {}", self.error),
            phase => write!(f, "{} ERROR at line {}: {}", phase, self.line, self.error),
        }
    }
}
