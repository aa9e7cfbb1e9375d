//! Formula parser
//!
//! A recursive descent parser producing a [`ParseTree`]. Each precedence
//! level collects a flat chain of operands and operator tokens; chains with
//! a single operand are collapsed into that operand.

use crate::error::{SyntaxError, SyntaxResult};
use crate::tree::{NodeId, NodeKind, ParseTree, Span, TreeBuilder};

/// Parse formula text into a tree rooted at an `Expression` node
///
/// # Example
/// ```rust
/// use fieldformula_syntax::{parse, NodeKind};
///
/// let tree = parse("IF(Amount > 1000, \"High\", \"Low\")").unwrap();
/// let root = tree.node(tree.root());
/// assert_eq!(root.kind, NodeKind::Expression);
/// assert_eq!(tree.node(root.children[0]).kind, NodeKind::Function);
/// ```
pub fn parse(formula: &str) -> SyntaxResult<ParseTree> {
    let mut parser = FormulaParser::new(formula)?;

    let mut children = Vec::new();
    if !matches!(parser.current_token(), Token::Eof) {
        children.push(parser.parse_expression()?);
    }

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(parser.unexpected("end of formula"));
    }

    let root = parser
        .builder
        .push(NodeKind::Expression, Span::new(0, formula.len()), children);
    parser.builder.finish(root)
}

/// Token types
#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    // Literals
    Number,
    String,
    Boolean,

    Identifier,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Equal,
    DoubleEqual,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    AndAnd,
    OrOr,
    And,
    Or,

    // Delimiters
    Dot,
    Comma,
    LeftParen,
    RightParen,

    // End of input
    Eof,
}

impl Token {
    fn starts_operand(self) -> bool {
        matches!(
            self,
            Token::Number | Token::String | Token::Boolean | Token::Identifier | Token::LeftParen
        )
    }
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<(Token, Span)>,
    builder: TreeBuilder,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> SyntaxResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
            builder: TreeBuilder::new(),
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> SyntaxResult<()> {
        self.skip_whitespace();
        let start = self.pos;
        let token = self.scan_token()?;
        self.current_token = Some((token, Span::new(start, self.pos)));
        Ok(())
    }

    fn scan_token(&mut self) -> SyntaxResult<Token> {
        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // One or two character operators
        match c {
            '&' => {
                self.advance();
                if self.peek_char() == Some('&') {
                    self.advance();
                    return Ok(Token::AndAnd);
                }
                return Ok(Token::Ampersand);
            }
            '|' => {
                if self.peek_char_at(1) == Some('|') {
                    self.advance();
                    self.advance();
                    return Ok(Token::OrOr);
                }
            }
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token::DoubleEqual);
                }
                return Ok(Token::Equal);
            }
            '!' => {
                if self.peek_char_at(1) == Some('=') {
                    self.advance();
                    self.advance();
                    return Ok(Token::NotEqual);
                }
            }
            '<' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token::LessEqual);
                }
                return Ok(Token::LessThan);
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token::GreaterEqual);
                }
                return Ok(Token::GreaterThan);
            }
            _ => {}
        }

        // String literal
        if c == '"' {
            return self.scan_string();
        }

        // Number, or the dot of a variable path
        if c.is_ascii_digit() {
            self.scan_number();
            return Ok(Token::Number);
        }
        if c == '.' {
            if self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()) {
                self.scan_number();
                return Ok(Token::Number);
            }
            self.advance();
            return Ok(Token::Dot);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        Err(SyntaxError::UnexpectedCharacter {
            found: c,
            position: self.pos,
        })
    }

    fn scan_string(&mut self) -> SyntaxResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        while let Some(c) = self.peek_char() {
            match c {
                '"' => {
                    self.advance();
                    return Ok(Token::String);
                }
                // Escaped character
                '\\' => {
                    self.advance();
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        Err(SyntaxError::UnterminatedString(start))
    }

    fn scan_number(&mut self) {
        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = self.peek_char_at(1).map_or(false, |c| c == '+' || c == '-');
            let digit_at = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;

        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        // Keywords, unless directly followed by '(' which makes them a call
        if self.peek_char() == Some('(') {
            return Token::Identifier;
        }
        match &self.input[start..self.pos] {
            "true" | "false" => Token::Boolean,
            "AND" => Token::And,
            "OR" => Token::Or,
            _ => Token::Identifier,
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> Token {
        self.current_token.map_or(Token::Eof, |(t, _)| t)
    }

    fn current_span(&self) -> Span {
        self.current_token
            .map_or(Span::new(self.pos, self.pos), |(_, s)| s)
    }

    fn consume(&mut self) -> SyntaxResult<(Token, Span)> {
        let token = self.current_token.take().unwrap_or((
            Token::Eof,
            Span::new(self.pos, self.pos),
        ));
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> SyntaxResult<Span> {
        if self.current_token() == expected {
            Ok(self.consume()?.1)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &'static str) -> SyntaxError {
        let span = self.current_span();
        match self.current_token() {
            Token::Eof => SyntaxError::UnexpectedEnd { expected },
            _ => SyntaxError::UnexpectedToken {
                found: self.input[span.from..span.to].to_string(),
                position: span.from,
            },
        }
    }

    fn leaf(&mut self, kind: NodeKind) -> SyntaxResult<NodeId> {
        let (_, span) = self.consume()?;
        Ok(self.builder.leaf(kind, span))
    }

    /// Close a chain, collapsing it when it holds a single operand
    fn close_chain(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        if let [only] = children.as_slice() {
            return *only;
        }
        let from = children
            .first()
            .map_or(self.pos, |&c| self.builder.span(c).from);
        let to = children.last().map_or(self.pos, |&c| self.builder.span(c).to);
        self.builder.push(kind, Span::new(from, to), children)
    }

    fn parse_chain(
        &mut self,
        kind: NodeKind,
        operator: fn(Token) -> Option<NodeKind>,
        operand: fn(&mut Self) -> SyntaxResult<NodeId>,
    ) -> SyntaxResult<NodeId> {
        let mut children = vec![operand(self)?];

        while let Some(op_kind) = operator(self.current_token()) {
            children.push(self.leaf(op_kind)?);
            children.push(operand(self)?);
        }

        Ok(self.close_chain(kind, children))
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Logical or: ||, OR
    // 2. Logical and: &&, AND
    // 3. Comparison: ==, =, !=, <, <=, >, >=
    // 4. Additive: +, -, &
    // 5. Multiplicative: *, /
    // 6. Primary: literals, variables, function calls, parentheses

    /// Top level of a formula, a parenthesised group or a call argument
    ///
    /// Operands that follow each other with no operator in between are kept
    /// in an `Expr` chain joined by `Error` nodes, so the problem surfaces
    /// when the chain is evaluated.
    fn parse_expression(&mut self) -> SyntaxResult<NodeId> {
        let mut children = vec![self.parse_or()?];

        while self.current_token().starts_operand() {
            let at = self.current_span().from;
            children.push(self.builder.leaf(NodeKind::Error, Span::new(at, at)));
            children.push(self.parse_or()?);
        }

        Ok(self.close_chain(NodeKind::Expr, children))
    }

    fn parse_or(&mut self) -> SyntaxResult<NodeId> {
        self.parse_chain(
            NodeKind::OrExpr,
            |t| match t {
                Token::OrOr | Token::Or => Some(NodeKind::OrOperator),
                _ => None,
            },
            Self::parse_and,
        )
    }

    fn parse_and(&mut self) -> SyntaxResult<NodeId> {
        self.parse_chain(
            NodeKind::AndExpr,
            |t| match t {
                Token::AndAnd | Token::And => Some(NodeKind::AndOperator),
                _ => None,
            },
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> SyntaxResult<NodeId> {
        self.parse_chain(
            NodeKind::CompExpr,
            |t| match t {
                Token::Equal
                | Token::DoubleEqual
                | Token::NotEqual
                | Token::LessThan
                | Token::LessEqual
                | Token::GreaterThan
                | Token::GreaterEqual => Some(NodeKind::CompOperator),
                _ => None,
            },
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> SyntaxResult<NodeId> {
        self.parse_chain(
            NodeKind::AddExpr,
            |t| match t {
                Token::Plus | Token::Minus | Token::Ampersand => Some(NodeKind::AddOperator),
                _ => None,
            },
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> SyntaxResult<NodeId> {
        self.parse_chain(
            NodeKind::MulExpr,
            |t| match t {
                Token::Star | Token::Slash => Some(NodeKind::MulOperator),
                _ => None,
            },
            Self::parse_primary,
        )
    }

    fn parse_primary(&mut self) -> SyntaxResult<NodeId> {
        match self.current_token() {
            Token::Number => self.leaf(NodeKind::Number),
            Token::String => self.leaf(NodeKind::String),
            Token::Boolean => self.leaf(NodeKind::Boolean),

            Token::Minus => self.parse_negative_number(),

            Token::LeftParen => {
                let (_, open) = self.consume()?;
                let inner = self.parse_expression()?;
                let close = self.expect(Token::RightParen, "')'")?;
                Ok(self
                    .builder
                    .push(NodeKind::ParenExpr, Span::new(open.from, close.to), vec![inner]))
            }

            Token::Identifier => {
                let name = self.leaf(NodeKind::Identifier)?;
                // Check if it's a function call
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    self.parse_variable(name)
                }
            }

            _ => Err(self.unexpected("an operand")),
        }
    }

    /// A minus sign in operand position only introduces a negative literal
    fn parse_negative_number(&mut self) -> SyntaxResult<NodeId> {
        let (_, minus) = self.current_token.unwrap_or((Token::Minus, self.current_span()));
        let digit_follows = match self.peek_char() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        };
        if !digit_follows {
            return Err(self.unexpected("an operand"));
        }

        self.scan_number();
        let span = Span::new(minus.from, self.pos);
        self.current_token = None;
        self.advance_token()?;
        Ok(self.builder.leaf(NodeKind::Number, span))
    }

    fn parse_variable(&mut self, first: NodeId) -> SyntaxResult<NodeId> {
        let mut segments = vec![first];

        while matches!(self.current_token(), Token::Dot) {
            self.consume()?;
            if !matches!(self.current_token(), Token::Identifier) {
                return Err(self.unexpected("a field name"));
            }
            segments.push(self.leaf(NodeKind::Identifier)?);
        }

        let from = self.builder.span(first).from;
        let to = segments
            .last()
            .map_or(from, |&last| self.builder.span(last).to);
        Ok(self
            .builder
            .push(NodeKind::Variable, Span::new(from, to), segments))
    }

    fn parse_function_call(&mut self, name: NodeId) -> SyntaxResult<NodeId> {
        self.expect(Token::LeftParen, "'('")?;

        let mut children = vec![name];

        // Parse arguments, each wrapped in a Term
        if !matches!(self.current_token(), Token::RightParen) {
            children.push(self.parse_argument()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume()?;
                children.push(self.parse_argument()?);
            }
        }

        let close = self.expect(Token::RightParen, "')'")?;
        let from = self.builder.span(name).from;

        Ok(self
            .builder
            .push(NodeKind::Function, Span::new(from, close.to), children))
    }

    fn parse_argument(&mut self) -> SyntaxResult<NodeId> {
        let expr = self.parse_expression()?;
        let span = self.builder.span(expr);
        Ok(self.builder.push(NodeKind::Term, span, vec![expr]))
    }
}
