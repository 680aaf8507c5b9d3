//! Recursive-descent parser over the token stream from `lexer`, building
//! the `ast::Expr` tree `eval` walks. Grounded on the production grammar
//! the original `XPathParser` implements by hand (operator precedence
//! climbing through `Or` → `And` → equality → relational → additive →
//! multiplicative → unary → union → path), not a parser-generator table.

use crate::ast::{Axis, BinOp, Expr, NodeTest, NodeType};
use crate::lexer::{tokenize, LexError, Token};
use crate::value::LiteralKind;

#[derive(Debug, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xpath parse error: {}", self.0)
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError(e.0)
    }
}

/// Compiles an XPath expression string into an `Expr` tree.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(ParseError(format!("unexpected trailing tokens near {:?}", self.peek())))
        }
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_name(&mut self, expected: &str) -> Result<(), ParseError> {
        match self.advance() {
            Token::Name(n) if n == expected => Ok(()),
            other => Err(ParseError(format!("expected keyword '{expected}', found {other:?}"))),
        }
    }

    fn peek_is_name(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == name)
    }

    // ---- expression grammar, lowest precedence first ----

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.peek_is_name("if") {
            return self.parse_if();
        }
        if self.peek_is_name("for") {
            return self.parse_for();
        }
        if self.peek_is_name("some") || self.peek_is_name("every") {
            return self.parse_quantified();
        }
        self.parse_or()
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        self.expect_name("if")?;
        if !self.eat(&Token::LParen) {
            return Err(ParseError("expected '(' after 'if'".into()));
        }
        let cond = self.parse_expr()?;
        if !self.eat(&Token::RParen) {
            return Err(ParseError("expected ')' closing if-condition".into()));
        }
        self.expect_name("then")?;
        let then_branch = self.parse_expr()?;
        self.expect_name("else")?;
        let else_branch = self.parse_expr()?;
        Ok(Expr::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch: Box::new(else_branch) })
    }

    fn parse_for(&mut self) -> Result<Expr, ParseError> {
        self.expect_name("for")?;
        let variable = match self.advance() {
            Token::VarRef(name) => name,
            other => return Err(ParseError(format!("expected variable after 'for', found {other:?}"))),
        };
        self.expect_name("in")?;
        let sequence = self.parse_or()?;
        self.expect_name("return")?;
        let body = self.parse_expr()?;
        Ok(Expr::For { variable, sequence: Box::new(sequence), body: Box::new(body) })
    }

    fn parse_quantified(&mut self) -> Result<Expr, ParseError> {
        let every = match self.advance() {
            Token::Name(n) if n == "some" => false,
            Token::Name(n) if n == "every" => true,
            _ => unreachable!("caller checked peek_is_name"),
        };
        let variable = match self.advance() {
            Token::VarRef(name) => name,
            other => return Err(ParseError(format!("expected variable after quantifier, found {other:?}"))),
        };
        self.expect_name("in")?;
        let sequence = self.parse_or()?;
        self.expect_name("satisfies")?;
        let predicate = self.parse_expr()?;
        Ok(Expr::Quantified { every, variable, sequence: Box::new(sequence), predicate: Box::new(predicate) })
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.peek_is_name("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::BinaryOp { op: BinOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.peek_is_name("and") {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::BinaryOp { op: BinOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.peek() == &Token::Star {
                BinOp::Mul
            } else if self.peek_is_name("div") {
                BinOp::Div
            } else if self.peek_is_name("mod") {
                BinOp::Mod
            } else {
                break;
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::UnaryMinus(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_path()?;
        if self.peek() != &Token::Pipe {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(&Token::Pipe) {
            parts.push(self.parse_path()?);
        }
        Ok(Expr::Union(parts))
    }

    // ---- path / step grammar ----

    fn parse_path(&mut self) -> Result<Expr, ParseError> {
        // A PathExpr may begin with '/' or '//' (absolute), or be a bare
        // PrimaryExpr optionally followed by steps (a filter expression
        // such as a function call used as the left side of a path).
        if self.peek() == &Token::Slash || self.peek() == &Token::SlashSlash {
            let absolute_double = self.peek() == &Token::SlashSlash;
            self.advance();
            if absolute_double {
                let mut steps = vec![descendant_or_self_step()];
                steps.extend(self.parse_relative_path()?);
                return Ok(Expr::Path { steps, absolute: true });
            }
            if self.is_step_start() {
                let steps = self.parse_relative_path()?;
                return Ok(Expr::Path { steps, absolute: true });
            }
            return Ok(Expr::Path { steps: Vec::new(), absolute: true });
        }

        if self.is_step_start() {
            let steps = self.parse_relative_path()?;
            return Ok(Expr::Path { steps, absolute: false });
        }

        // Not a location path: a primary expression, possibly followed by
        // a predicate filter (FilterExpr) and/or further `/`-separated steps.
        let primary = self.parse_primary()?;
        let mut predicates = Vec::new();
        while self.peek() == &Token::LBracket {
            predicates.push(self.parse_predicate()?);
        }
        if predicates.is_empty() && self.peek() != &Token::Slash && self.peek() != &Token::SlashSlash {
            return Ok(primary);
        }
        let mut steps = vec![Expr::Filter { expr: Box::new(primary), predicates }];
        if self.peek() == &Token::Slash || self.peek() == &Token::SlashSlash {
            let double = self.peek() == &Token::SlashSlash;
            self.advance();
            if double {
                steps.push(descendant_or_self_step());
            }
            steps.extend(self.parse_relative_path()?);
        }
        Ok(Expr::Path { steps, absolute: false })
    }

    fn is_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_)
        )
    }

    fn parse_relative_path(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                Token::Slash => {
                    self.advance();
                    steps.push(self.parse_step()?);
                }
                Token::SlashSlash => {
                    self.advance();
                    steps.push(descendant_or_self_step());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }
        Ok(steps)
    }

    fn parse_step(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Dot) {
            return Ok(Expr::Step { axis: Axis::SelfAxis, test: NodeTest::Type(NodeType::Node), predicates: Vec::new() });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Expr::Step { axis: Axis::Parent, test: NodeTest::Type(NodeType::Node), predicates: Vec::new() });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let Token::Name(name) = self.peek().clone() {
            if self.tokens.get(self.pos + 1) == Some(&Token::ColonColon) {
                let axis = axis_from_name(&name)
                    .ok_or_else(|| ParseError(format!("unknown axis '{name}'")))?;
                self.advance();
                self.advance();
                axis
            } else {
                Axis::Child
            }
        } else {
            Axis::Child
        };

        let test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.peek() == &Token::LBracket {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Expr::Step { axis, test, predicates })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, ParseError> {
        if self.eat(&Token::Star) {
            return Ok(NodeTest::Any);
        }
        match self.advance() {
            Token::Name(name) => {
                if self.peek() == &Token::LParen {
                    if let Some(node_type) = node_type_from_name(&name) {
                        self.advance();
                        self.eat(&Token::RParen);
                        return Ok(NodeTest::Type(node_type));
                    }
                }
                Ok(NodeTest::Name(name))
            }
            other => Err(ParseError(format!("expected node test, found {other:?}"))),
        }
    }

    fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // '['
        let expr = self.parse_expr()?;
        if !self.eat(&Token::RBracket) {
            return Err(ParseError("expected ']' closing predicate".into()));
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(LiteralKind::Number(n))),
            Token::String(s) => Ok(Expr::Literal(LiteralKind::String(s))),
            Token::VarRef(name) => Ok(Expr::VariableRef(name)),
            Token::LParen => {
                let expr = self.parse_expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(ParseError("expected ')' closing parenthesised expression".into()));
                }
                Ok(expr)
            }
            Token::Name(name) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if self.peek() != &Token::RParen {
                        args.push(self.parse_expr()?);
                        while self.eat(&Token::Comma) {
                            args.push(self.parse_expr()?);
                        }
                    }
                    if !self.eat(&Token::RParen) {
                        return Err(ParseError("expected ')' closing function call".into()));
                    }
                    Ok(Expr::FunctionCall { name, args })
                } else {
                    Err(ParseError(format!("unexpected bare name '{name}' in expression position")))
                }
            }
            other => Err(ParseError(format!("unexpected token {other:?}"))),
        }
    }
}

fn descendant_or_self_step() -> Expr {
    Expr::Step { axis: Axis::DescendantOrSelf, test: NodeTest::Type(NodeType::Node), predicates: Vec::new() }
}

fn axis_from_name(name: &str) -> Option<Axis> {
    Some(match name {
        "child" => Axis::Child,
        "parent" => Axis::Parent,
        "self" => Axis::SelfAxis,
        "attribute" => Axis::Attribute,
        "descendant" => Axis::Descendant,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "ancestor" => Axis::Ancestor,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        "following-sibling" => Axis::FollowingSibling,
        "preceding-sibling" => Axis::PrecedingSibling,
        "following" => Axis::Following,
        "preceding" => Axis::Preceding,
        _ => return None,
    })
}

fn node_type_from_name(name: &str) -> Option<NodeType> {
    Some(match name {
        "node" => NodeType::Node,
        "text" => NodeType::Text,
        "comment" => NodeType::Comment,
        "processing-instruction" => NodeType::ProcessingInstruction,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_an_absolute_descendant_path() {
        let expr = parse("//item").unwrap();
        match expr {
            Expr::Path { steps, absolute } => {
                assert!(absolute);
                assert_eq!(steps.len(), 2);
            }
            other => panic!("expected Path, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_call_with_args() {
        let expr = parse("concat('a', 'b')").unwrap();
        match expr {
            Expr::FunctionCall { name, args } => {
                assert_eq!(name, "concat");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected FunctionCall, got {other:?}"),
        }
    }

    #[test]
    fn parses_predicate_and_axis() {
        let expr = parse("child::item[1]/@id").unwrap();
        match expr {
            Expr::Path { steps, .. } => assert_eq!(steps.len(), 2),
            other => panic!("expected Path, got {other:?}"),
        }
    }

    #[test]
    fn parses_arithmetic_with_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::BinaryOp { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("expected Add at the top, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        assert!(parse("concat('a'").is_err());
    }
}
