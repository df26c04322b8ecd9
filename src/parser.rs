use crate::{
    ast::{Node, Symbol},
    diagnostic::{CompileError, Diagnostic, Found},
    tokenizer::{Keyword, Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("Expected 'PROGRAM'")]
    ExpectedProgram,
    #[error("Expected identifier after PROGRAM")]
    ExpectedProgramName,
    #[error("Expected 'INTEGER' or 'REAL'")]
    ExpectedType,
    #[error("Expected identifier in variable list")]
    ExpectedVariable,
    #[error("Expected identifier after comma")]
    ExpectedVariableAfterComma,
    #[error("Expected '=' in assignment")]
    ExpectedAssign,
    #[error("Unexpected '=' after expression")]
    UnexpectedAssign,
    #[error("Expected identifier after CALL")]
    ExpectedCallee,
    #[error("Expected '(' after CALL identifier")]
    ExpectedArgumentsStart,
    #[error("Expected ')' after arguments")]
    ExpectedArgumentsEnd,
    #[error("Expected ')' after expression")]
    ExpectedGroupEnd,
    #[error("Expression nested too deeply")]
    NestingTooDeep,
    #[error("Unexpected end of input in expression")]
    UnexpectedEndOfExpression,
    #[error("Missing operand in expression")]
    MissingOperand,
    #[error("Expected identifier, constant, or '('")]
    ExpectedOperand,
    #[error("Expected 'END'")]
    ExpectedEnd,
    #[error("Expected identifier after END")]
    ExpectedProgramNameAfterEnd,
    #[error("Unexpected token(s) after END")]
    TrailingTokens,
}

/// Deepest parenthesized group the parser descends into.
pub const MAX_NESTING: usize = 256;

/// Parses a token stream that no longer holds Error or Unknown tokens.
///
/// A tree is always returned. Grammar violations are recorded and the parser
/// resynchronizes past them, so the tree may be partial.
pub fn parse(tokens: &[Token]) -> (Node, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let tree = parser.program();
    (tree, parser.errors)
}

struct Parser<'a> {
    all: &'a [Token],
    tokens: &'a [Token],
    depth: usize,
    errors: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            all: tokens,
            tokens,
            depth: 0,
            errors: Vec::new(),
        }
    }

    // Program -> Begin Descriptions Operators End
    fn program(&mut self) -> Node {
        let mut node = Node::new(Symbol::Program, self.line());

        let begin = self.begin();
        node.push(begin);
        let descriptions = self.descriptions();
        node.push(descriptions);
        let operators = self.operators();
        node.push(operators);
        let end = self.end();
        node.push(end);

        if !self.tokens.is_empty() {
            self.error(SyntaxError::TrailingTokens);
        }

        node
    }

    // Begin -> 'PROGRAM' Identifier
    fn begin(&mut self) -> Node {
        let mut node = Node::new(Symbol::Begin, self.line());

        match self.match_keyword(Keyword::Program) {
            Some(program) => {
                node.push(program);
                match self.match_kind(TokenKind::Identifier) {
                    Some(name) => node.push(name),
                    None => {
                        self.error(SyntaxError::ExpectedProgramName);
                        self.recover();
                    }
                }
            }
            None => {
                self.error(SyntaxError::ExpectedProgram);
                self.recover();
            }
        }

        node
    }

    // Descriptions -> { Descr }
    fn descriptions(&mut self) -> Node {
        let mut node = Node::new(Symbol::Descriptions, self.line());
        while self.at_type() {
            let descr = self.descr();
            node.push(descr);
        }
        node
    }

    // Descr -> Type VarList
    fn descr(&mut self) -> Node {
        let mut node = Node::new(Symbol::Descr, self.line());
        let ty = self.ty();
        node.push(ty);
        let var_list = self.var_list();
        node.push(var_list);
        node
    }

    // Type -> 'INTEGER' | 'REAL'
    fn ty(&mut self) -> Node {
        let mut node = Node::new(Symbol::Type, self.line());
        let keyword = self
            .match_keyword(Keyword::Integer)
            .or_else(|| self.match_keyword(Keyword::Real));
        match keyword {
            Some(keyword) => node.push(keyword),
            None => {
                self.error(SyntaxError::ExpectedType);
                self.recover();
            }
        }
        node
    }

    // VarList -> Identifier { ',' Identifier }
    fn var_list(&mut self) -> Node {
        let mut node = Node::new(Symbol::VarList, self.line());

        let Some(first) = self.match_kind(TokenKind::Identifier) else {
            self.error(SyntaxError::ExpectedVariable);
            self.recover();
            return node;
        };
        node.push(first);

        while let Some(comma) = self.match_kind(TokenKind::Comma) {
            node.push(comma);
            match self.match_kind(TokenKind::Identifier) {
                Some(name) => node.push(name),
                None => {
                    self.error(SyntaxError::ExpectedVariableAfterComma);
                    self.recover();
                    break;
                }
            }
        }

        node
    }

    // Operators -> { Op }
    fn operators(&mut self) -> Node {
        let mut node = Node::new(Symbol::Operators, self.line());
        while self.at_kind(TokenKind::Identifier) || self.at_keyword(Keyword::Call) {
            let op = self.op();
            node.push(op);
        }
        node
    }

    // Op -> Identifier '=' Expr | 'CALL' Identifier '(' Arguments ')'
    fn op(&mut self) -> Node {
        let mut node = Node::new(Symbol::Op, self.line());

        if let Some(target) = self.match_kind(TokenKind::Identifier) {
            node.push(target);
            self.assignment(&mut node);
        } else if let Some(call) = self.match_keyword(Keyword::Call) {
            node.push(call);
            self.call(&mut node);
        }

        node
    }

    fn assignment(&mut self, node: &mut Node) {
        let Some(assign) = self.match_kind(TokenKind::Assign) else {
            self.error(SyntaxError::ExpectedAssign);
            self.recover();
            return;
        };
        node.push(assign);

        let errors = self.errors.len();
        let expr = self.expr();
        node.push(expr);
        if self.errors.len() > errors {
            self.sync_to_end_of_expression();
        }

        if self.at_kind(TokenKind::Assign) {
            self.error(SyntaxError::UnexpectedAssign);
            self.recover();
        }
    }

    fn call(&mut self, node: &mut Node) {
        let Some(callee) = self.match_kind(TokenKind::Identifier) else {
            self.error(SyntaxError::ExpectedCallee);
            self.recover();
            return;
        };
        node.push(callee);

        let Some(left_paren) = self.match_kind(TokenKind::LeftParen) else {
            self.error(SyntaxError::ExpectedArgumentsStart);
            self.recover();
            return;
        };
        node.push(left_paren);

        let arguments = self.arguments();
        node.push(arguments);

        match self.match_kind(TokenKind::RightParen) {
            Some(right_paren) => node.push(right_paren),
            None => {
                self.error(SyntaxError::ExpectedArgumentsEnd);
                self.recover();
            }
        }
    }

    // Arguments -> [ Expr { ',' Expr } ]
    fn arguments(&mut self) -> Node {
        let mut node = Node::new(Symbol::Arguments, self.line());
        if self.tokens.is_empty() || self.at_kind(TokenKind::RightParen) {
            return node;
        }

        loop {
            let errors = self.errors.len();
            let argument = self.expr();
            node.push(argument);

            if self.errors.len() > errors {
                self.sync_to_next_argument();
                if self.at_operand() && !self.at_construct_start() {
                    continue;
                }
            }

            match self.match_kind(TokenKind::Comma) {
                Some(comma) => node.push(comma),
                None => break,
            }
        }

        node
    }

    // Expr -> SimpleExpr { ('+' | '-') SimpleExpr }
    fn expr(&mut self) -> Node {
        let mut node = Node::new(Symbol::Expr, self.line());

        let operand = self.simple_expr();
        node.push(operand);

        while let Some(operator) = self
            .match_kind(TokenKind::Plus)
            .or_else(|| self.match_kind(TokenKind::Minus))
        {
            node.push(operator);
            let operand = self.simple_expr();
            node.push(operand);
        }

        node
    }

    // SimpleExpr -> Identifier | IntegerLiteral | RealLiteral | '(' Expr ')'
    fn simple_expr(&mut self) -> Node {
        let mut node = Node::new(Symbol::SimpleExpr, self.line());

        let tokens = self.tokens;
        let Some(token) = tokens.first() else {
            self.error(SyntaxError::UnexpectedEndOfExpression);
            return node;
        };

        match token.kind {
            TokenKind::Identifier | TokenKind::Integer | TokenKind::Real => {
                node.push(Node::leaf(token));
                self.advance();
            }
            TokenKind::LeftParen if self.depth >= MAX_NESTING => {
                self.error(SyntaxError::NestingTooDeep);
                self.skip_group();
            }
            TokenKind::LeftParen => {
                node.push(Node::leaf(token));
                self.advance();
                self.depth += 1;
                let expr = self.expr();
                self.depth -= 1;
                node.push(expr);
                match self.match_kind(TokenKind::RightParen) {
                    Some(right_paren) => node.push(right_paren),
                    None => self.error(SyntaxError::ExpectedGroupEnd),
                }
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::RightParen | TokenKind::Comma => {
                self.error(SyntaxError::MissingOperand)
            }
            _ => self.error(SyntaxError::ExpectedOperand),
        }

        node
    }

    // End -> 'END' Identifier
    fn end(&mut self) -> Node {
        let mut node = Node::new(Symbol::End, self.line());

        match self.match_keyword(Keyword::End) {
            Some(end) => {
                node.push(end);
                match self.match_kind(TokenKind::Identifier) {
                    Some(name) => node.push(name),
                    None => {
                        self.error(SyntaxError::ExpectedProgramNameAfterEnd);
                        self.recover();
                    }
                }
            }
            None => {
                self.error(SyntaxError::ExpectedEnd);
                self.recover();
            }
        }

        node
    }

    fn advance(&mut self) {
        if !self.tokens.is_empty() {
            self.tokens = &self.tokens[1..];
        }
    }

    fn match_kind(&mut self, kind: TokenKind) -> Option<Node> {
        let token = self.tokens.first().filter(|t| t.kind == kind)?;
        let leaf = Node::leaf(token);
        self.advance();
        Some(leaf)
    }

    fn match_keyword(&mut self, keyword: Keyword) -> Option<Node> {
        self.match_kind(TokenKind::Keyword(keyword))
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.tokens.first().is_some_and(|t| t.kind == kind)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.at_kind(TokenKind::Keyword(keyword))
    }

    fn at_type(&self) -> bool {
        self.at_keyword(Keyword::Integer) || self.at_keyword(Keyword::Real)
    }

    /// `INTEGER`, `REAL`, `CALL`, `END`, or an identifier followed by `=`.
    fn at_construct_start(&self) -> bool {
        match self.tokens {
            [first, ..] if self.at_type() || first.is_keyword(Keyword::Call) => true,
            [first, ..] if first.is_keyword(Keyword::End) => true,
            [first, second, ..] => {
                first.kind == TokenKind::Identifier && second.kind == TokenKind::Assign
            }
            _ => false,
        }
    }

    fn at_operand(&self) -> bool {
        self.tokens.first().is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::Identifier | TokenKind::Integer | TokenKind::Real | TokenKind::LeftParen
            )
        })
    }

    fn at_argument_boundary(&self) -> bool {
        self.at_kind(TokenKind::Comma)
            || self.at_kind(TokenKind::RightParen)
            || self.at_operand()
            || self.at_construct_start()
    }

    fn line(&self) -> usize {
        self.tokens
            .first()
            .or_else(|| self.all.last())
            .map_or(1, |t| t.line)
    }

    /// Records `error` against the current token. Recovery is left to the
    /// caller, which knows where parsing can resume.
    fn error(&mut self, error: SyntaxError) {
        let found = match (self.tokens.first(), self.all.is_empty()) {
            (Some(token), _) => Found::Token(token.lexeme.clone()),
            (None, false) => Found::EndOfFile,
            (None, true) => Found::EmptyFile,
        };
        self.errors.push(Diagnostic::new(
            self.line(),
            CompileError::Syntax { error, found },
        ));
    }

    /// Drops the offending token, then skips to the next construct start.
    fn recover(&mut self) {
        self.advance();
        self.skip_until(Self::at_construct_start);
    }

    // Expression and argument failures leave the offending token in place:
    // it is usually the ')' or ',' the enclosing rule is waiting for.
    fn sync_to_end_of_expression(&mut self) {
        self.skip_until(Self::at_construct_start);
    }

    fn sync_to_next_argument(&mut self) {
        self.skip_until(Self::at_argument_boundary);
    }

    // Consumes a group through its matching ')', stopping early at a construct
    // start so an unbalanced group cannot swallow the next statement.
    fn skip_group(&mut self) {
        let mut open = 0usize;
        while let Some(kind) = self.tokens.first().map(|t| t.kind) {
            let paren = matches!(kind, TokenKind::LeftParen | TokenKind::RightParen);
            if !paren && self.at_construct_start() {
                return;
            }
            self.advance();
            match kind {
                TokenKind::LeftParen => open += 1,
                TokenKind::RightParen => {
                    open = open.saturating_sub(1);
                    if open == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_until(&mut self, stop: fn(&Self) -> bool) {
        while !self.tokens.is_empty() && !stop(self) {
            self.advance();
        }
    }
}
