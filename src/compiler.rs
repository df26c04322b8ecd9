use crate::{
    ast::Node,
    diagnostic::Diagnostic,
    listing::{LexicalListing, ParseTrace, SemanticListing},
    parser,
    semantic::{Analysis, Analyzer},
    symbol_table::DEFAULT_CAPACITY,
    tokenizer::{Tokenized, Tokenizer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Slots in the lexeme table and in the variable table.
    pub capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Output of a full front-end run over one source unit.
#[derive(Debug)]
pub struct Compilation {
    pub tokenized: Tokenized,
    pub tree: Node,
    pub syntax_errors: Vec<Diagnostic>,
    pub analysis: Analysis,
}

impl Compilation {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.tokenized
            .diagnostics
            .iter()
            .chain(&self.syntax_errors)
            .chain(&self.analysis.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().next().is_some()
    }

    pub fn lexical_listing(&self) -> String {
        LexicalListing(&self.tokenized).to_string()
    }

    pub fn parse_trace(&self) -> String {
        ParseTrace {
            tree: &self.tree,
            diagnostics: &self.syntax_errors,
        }
        .to_string()
    }

    pub fn semantic_listing(&self) -> String {
        SemanticListing(&self.analysis).to_string()
    }
}

pub fn compile(source: &str) -> Compilation {
    compile_with(source, &Options::default())
}

/// Runs tokenizer, parser and analyzer in sequence. Every stage runs to
/// completion however many diagnostics the earlier ones recorded.
pub fn compile_with(source: &str, options: &Options) -> Compilation {
    let tokenized = Tokenizer::with_capacity(source, options.capacity).run();
    #[cfg(feature = "trace")]
    eprintln!(
        "[tokenize] {} tokens, {} distinct lexemes, {} error(s)",
        tokenized.tokens.len(),
        tokenized.lexemes.len(),
        tokenized.diagnostics.len()
    );

    let tokens = tokenized.valid_tokens();
    let (tree, syntax_errors) = parser::parse(&tokens);
    #[cfg(feature = "trace")]
    eprintln!(
        "[parse] {} tokens parsed, {} error(s)",
        tokens.len(),
        syntax_errors.len()
    );

    let analysis = Analyzer::with_capacity(options.capacity).analyze(Some(&tree));
    #[cfg(feature = "trace")]
    eprintln!(
        "[analyze] {} instructions, {} variables, {} error(s)",
        analysis.postfix.len(),
        analysis.variables.len(),
        analysis.diagnostics.len()
    );

    Compilation {
        tokenized,
        tree,
        syntax_errors,
        analysis,
    }
}
