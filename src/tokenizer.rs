use std::fmt::Display;

use rustc_hash::FxHashMap;

use crate::{
    diagnostic::Diagnostic,
    symbol_table::{SymbolTable, DEFAULT_CAPACITY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Program,
    Integer,
    Real,
    End,
    Call,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Program => "PROGRAM",
            Keyword::Integer => "INTEGER",
            Keyword::Real => "REAL",
            Keyword::End => "END",
            Keyword::Call => "CALL",
        }
    }
}

const KEYWORDS: [Keyword; 5] = [
    Keyword::Program,
    Keyword::Integer,
    Keyword::Real,
    Keyword::End,
    Keyword::Call,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    Integer,
    Real,
    Assign,
    Plus,
    Minus,
    Comma,
    LeftParen,
    RightParen,
    Error,
    Unknown,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Integer => "INTEGER",
            TokenKind::Real => "REAL",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Comma => "COMMA",
            TokenKind::LeftParen => "LPAREN",
            TokenKind::RightParen => "RPAREN",
            TokenKind::Error => "ERROR",
            TokenKind::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(lexeme: impl Into<String>, kind: TokenKind, line: usize) -> Self {
        Token {
            lexeme: lexeme.into(),
            kind,
            line,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Error and Unknown tokens never reach the parser.
    pub fn is_valid(&self) -> bool {
        !matches!(self.kind, TokenKind::Error | TokenKind::Unknown)
    }

    fn is_end_of_input(&self) -> bool {
        self.kind == TokenKind::Unknown && self.lexeme.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexicalError {
    #[error("{0}")]
    MalformedNumber(String),
    #[error("{0}")]
    UnexpectedCharacter(char),
}

/// Everything a tokenizer run produces.
#[derive(Debug)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
    pub lexemes: SymbolTable<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Tokenized {
    /// The token stream with Error and Unknown tokens filtered out.
    pub fn valid_tokens(&self) -> Vec<Token> {
        self.tokens.iter().filter(|t| t.is_valid()).cloned().collect()
    }
}

pub struct Tokenizer<'a> {
    rest: &'a str,
    line: usize,
    keywords: FxHashMap<&'static str, Keyword>,
    lexemes: SymbolTable<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: &'a str, capacity: usize) -> Self {
        Tokenizer {
            rest: source,
            line: 1,
            keywords: KEYWORDS.iter().map(|k| (k.as_str(), *k)).collect(),
            lexemes: SymbolTable::with_capacity(capacity),
        }
    }

    pub fn run(mut self) -> Tokenized {
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();

        loop {
            let token = self.next_token();
            if token.is_end_of_input() {
                break;
            }

            if token.kind == TokenKind::Error {
                diagnostics.push(Diagnostic::new(token.line, lexical_error(&token.lexeme)));
            }
            if let Err(e) = self.lexemes.insert(&token.lexeme, token.clone()) {
                diagnostics.push(Diagnostic::new(token.line, e));
            }
            tokens.push(token);
        }

        Tokenized {
            tokens,
            lexemes: self.lexemes,
            diagnostics,
        }
    }

    /// Scans one token. Past the end of input this keeps returning an empty
    /// Unknown token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some(first) = self.rest.chars().next() else {
            return Token::new("", TokenKind::Unknown, self.line);
        };

        if first.is_ascii_alphabetic() {
            let word = self.take_while(|c| c.is_ascii_alphabetic());
            let upper = word.to_ascii_uppercase();
            return match self.keywords.get(upper.as_str()) {
                Some(keyword) => Token::new(upper, TokenKind::Keyword(*keyword), self.line),
                None => Token::new(word, TokenKind::Identifier, self.line),
            };
        }

        if first.is_ascii_digit() {
            return self.number();
        }

        self.rest = &self.rest[first.len_utf8()..];
        let kind = match first {
            '=' => TokenKind::Assign,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            _ => TokenKind::Error,
        };
        Token::new(first.to_string(), kind, self.line)
    }

    // A leading zero followed by more digits, or a '.' with no digit after
    // it, marks the literal as an error. The digits are consumed either way.
    fn number(&mut self) -> Token {
        let start = self.rest;
        let mut malformed = false;

        let integer_part = self.take_while(|c| c.is_ascii_digit());
        if integer_part.len() > 1 && integer_part.starts_with('0') {
            malformed = true;
        }

        let mut real = false;
        if self.rest.starts_with('.') {
            real = true;
            self.rest = &self.rest[1..];
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                malformed = true;
            }
        }

        let lexeme = &start[..start.len() - self.rest.len()];
        let kind = match (malformed, real) {
            (true, _) => TokenKind::Error,
            (false, true) => TokenKind::Real,
            (false, false) => TokenKind::Integer,
        };
        Token::new(lexeme, kind, self.line)
    }

    fn skip_whitespace(&mut self) {
        let skipped = self.take_while(char::is_whitespace);
        self.line += skipped.matches('\n').count();
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let len = self
            .rest
            .chars()
            .take_while(|c| predicate(*c))
            .map(char::len_utf8)
            .sum();
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        taken
    }
}

fn lexical_error(lexeme: &str) -> LexicalError {
    let mut chars = lexeme.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_ascii_digit() => LexicalError::UnexpectedCharacter(c),
        _ => LexicalError::MalformedNumber(lexeme.to_string()),
    }
}

pub fn tokenize(source: &str) -> Tokenized {
    Tokenizer::new(source).run()
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    #[test]
    fn test_tokens() {
        let source = "PROGRAM p INTEGER x x = 5 END p";
        let expected = vec![
            (TokenKind::Keyword(Keyword::Program), "PROGRAM".to_string()),
            (TokenKind::Identifier, "p".to_string()),
            (TokenKind::Keyword(Keyword::Integer), "INTEGER".to_string()),
            (TokenKind::Identifier, "x".to_string()),
            (TokenKind::Identifier, "x".to_string()),
            (TokenKind::Assign, "=".to_string()),
            (TokenKind::Integer, "5".to_string()),
            (TokenKind::Keyword(Keyword::End), "END".to_string()),
            (TokenKind::Identifier, "p".to_string()),
        ];
        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let tokens = tokenize("program Real eNd Foo").tokens;
        assert!(tokens[0].is_keyword(Keyword::Program));
        assert_eq!(tokens[0].lexeme, "PROGRAM");
        assert!(tokens[1].is_keyword(Keyword::Real));
        assert!(tokens[2].is_keyword(Keyword::End));
        assert_eq!(tokens[3].kind, TokenKind::Identifier);
        assert_eq!(tokens[3].lexeme, "Foo");
    }

    #[test]
    fn test_identifiers_stop_at_digits() {
        let expected = vec![
            (TokenKind::Identifier, "ab".to_string()),
            (TokenKind::Integer, "12".to_string()),
        ];
        assert_eq!(kinds("ab12"), expected);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("0"), vec![(TokenKind::Integer, "0".to_string())]);
        assert_eq!(kinds("3.5"), vec![(TokenKind::Real, "3.5".to_string())]);
        assert_eq!(kinds("0.25"), vec![(TokenKind::Real, "0.25".to_string())]);
        assert_eq!(kinds("007"), vec![(TokenKind::Error, "007".to_string())]);
        assert_eq!(kinds("3."), vec![(TokenKind::Error, "3.".to_string())]);
        assert_eq!(kinds("01.5"), vec![(TokenKind::Error, "01.5".to_string())]);
    }

    #[test]
    fn test_operators_and_unknown_characters() {
        let expected = vec![
            (TokenKind::LeftParen, "(".to_string()),
            (TokenKind::Identifier, "a".to_string()),
            (TokenKind::Plus, "+".to_string()),
            (TokenKind::Identifier, "b".to_string()),
            (TokenKind::Minus, "-".to_string()),
            (TokenKind::Integer, "1".to_string()),
            (TokenKind::RightParen, ")".to_string()),
            (TokenKind::Comma, ",".to_string()),
            (TokenKind::Error, ";".to_string()),
        ];
        assert_eq!(kinds("(a+b-1),;"), expected);
    }

    #[test]
    fn test_lines_are_tracked() {
        let tokens = tokenize("PROGRAM p\n\nINTEGER x\r\nEND p\n").tokens;
        let lines: Vec<_> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 1, 3, 3, 4, 4]);
    }

    #[test]
    fn test_errors_are_reported_and_kept() {
        let tokenized = tokenize("a = 007 $\nb = 3.");
        let errors: Vec<_> = tokenized
            .diagnostics
            .iter()
            .map(|d| (d.line, d.to_string()))
            .collect();
        assert_eq!(
            errors,
            vec![
                (1, "LEXICAL ERROR: 007".to_string()),
                (1, "LEXICAL ERROR: $".to_string()),
                (2, "LEXICAL ERROR: 3.".to_string()),
            ]
        );
        assert_eq!(tokenized.tokens.len(), 7);
        assert_eq!(tokenized.valid_tokens().len(), 4);
    }

    #[test]
    fn test_lexemes_are_deduplicated() {
        let tokenized = tokenize("x = x + x");
        assert_eq!(tokenized.lexemes.len(), 3);
        let slot = tokenized.lexemes.find("x").unwrap();
        assert_eq!(tokenized.lexemes.get(slot).unwrap().kind, TokenKind::Identifier);
    }

    #[test]
    fn test_full_lexeme_table_is_reported() {
        let tokenized = Tokenizer::with_capacity("a b c", 2).run();
        assert_eq!(tokenized.tokens.len(), 3);
        assert_eq!(tokenized.lexemes.len(), 2);
        assert_eq!(tokenized.diagnostics.len(), 1);
        assert!(tokenized.diagnostics[0].to_string().starts_with("CAPACITY ERROR"));
    }

    #[test]
    fn test_end_of_input_is_sticky() {
        let mut tokenizer = Tokenizer::new("  ");
        assert!(tokenizer.next_token().is_end_of_input());
        assert!(tokenizer.next_token().is_end_of_input());
        assert!(tokenize("").tokens.is_empty());
    }
}
