//! Human-readable listings for each stage.

use std::fmt::Display;

use crate::{ast::Node, diagnostic::Diagnostic, semantic::Analysis, tokenizer::Tokenized};

/// Lexical errors, then every distinct lexeme in table-slot order.
pub struct LexicalListing<'a>(pub &'a Tokenized);

/// The syntax tree followed by the syntax errors and a summary.
pub struct ParseTrace<'a> {
    pub tree: &'a Node,
    pub diagnostics: &'a [Diagnostic],
}

/// Postfix instructions followed by the semantic errors and a summary.
pub struct SemanticListing<'a>(pub &'a Analysis);

impl Display for LexicalListing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokenized = self.0;
        for diagnostic in &tokenized.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        for (slot, lexeme, token) in tokenized.lexemes.iter() {
            writeln!(f, "{} | {} | {}", token.kind, lexeme, slot)?;
        }
        summary(f, "Lexical analysis", tokenized.diagnostics.len())
    }
}

impl Display for ParseTrace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tree)?;
        for diagnostic in self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        summary(f, "Parsing", self.diagnostics.len())
    }
}

impl Display for SemanticListing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let analysis = self.0;
        for line in &analysis.postfix {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        if !analysis.diagnostics.is_empty() {
            writeln!(f, "ERRORS:")?;
            for diagnostic in &analysis.diagnostics {
                writeln!(f, "{}", diagnostic)?;
            }
            writeln!(f)?;
        }
        summary(f, "Semantic analysis", analysis.diagnostics.len())
    }
}

fn summary(f: &mut std::fmt::Formatter<'_>, stage: &str, errors: usize) -> std::fmt::Result {
    if errors == 0 {
        writeln!(f, "{} completed successfully!", stage)
    } else {
        writeln!(f, "{} completed with {} error(s)", stage, errors)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{parser::parse, semantic::analyze, tokenizer::tokenize};

    #[test]
    fn test_lexical_listing() {
        let tokenized = tokenize("a = 007 + a");
        let expected = "\
LEXICAL ERROR: 007
PLUS | + | 43
ASSIGN | = | 61
IDENTIFIER | a | 97
ERROR | 007 | 208
Lexical analysis completed with 1 error(s)
";
        assert_eq!(LexicalListing(&tokenized).to_string(), expected);
    }

    #[test]
    fn test_parse_trace_with_errors() {
        let tokens = tokenize("PROGRAM t END").valid_tokens();
        let (tree, diagnostics) = parse(&tokens);
        let expected = "\
Program
  Begin
    'PROGRAM'
    't'
  Descriptions
  Operators
  End
    'END'
SYNTAX ERROR at line 1: Expected identifier after END (unexpected end of file)
Parsing completed with 1 error(s)
";
        let trace = ParseTrace {
            tree: &tree,
            diagnostics: &diagnostics,
        };
        assert_eq!(trace.to_string(), expected);
    }

    #[test]
    fn test_semantic_listing() {
        let tokens = tokenize("PROGRAM t INTEGER a a = 1 END t").valid_tokens();
        let (tree, _) = parse(&tokens);
        let analysis = analyze(Some(&tree));
        let expected = "\
t PROGRAM
INTEGER a 2 DECL
a 1 =
t END

Semantic analysis completed successfully!
";
        assert_eq!(SemanticListing(&analysis).to_string(), expected);

        let tokens = tokenize("PROGRAM t END u").valid_tokens();
        let (tree, _) = parse(&tokens);
        let analysis = analyze(Some(&tree));
        let expected = "\
t PROGRAM
u END

ERRORS:
SEMANTIC ERROR at line 1: Program name mismatch. Expected 't', got 'u'

Semantic analysis completed with 1 error(s)
";
        assert_eq!(SemanticListing(&analysis).to_string(), expected);
    }
}
