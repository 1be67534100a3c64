use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use std::iter::Peekable;
use std::ops::Range;
use std::rc::Rc;
use std::str::Chars;

/// Deepest expression nesting accepted before parsing gives up
const MAX_NESTING: usize = 64;

/// Recursive-descent parser for the script language
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a sequence of statements up to the end of input
    pub fn parse_program(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// Parse exactly one expression, allowing a trailing semicolon
    pub fn parse_standalone_expression(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression()?;
        self.match_token(Token::Semi);
        if !self.is_at_end() {
            return Err(self.error_here("end of expression"));
        }
        Ok(expr)
    }

    // Statements

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let Some(token) = self.peek_token() else {
            return Err(ParseError::unexpected_eof("statement"));
        };

        match token {
            Token::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            Token::Let | Token::Const | Token::Var => {
                let stmt = self.parse_var_decl()?;
                self.match_token(Token::Semi);
                Ok(stmt)
            }
            Token::Function if matches!(self.peek_token_at(1), Some(Token::Ident(_))) => {
                Ok(Stmt::Function(self.parse_function_expression()?))
            }
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::While => {
                self.advance();
                self.expect(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            Token::Return => {
                self.advance();
                let value = if self.check(Token::Semi) || self.check(Token::RBrace) || self.is_at_end()
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.match_token(Token::Semi);
                Ok(Stmt::Return(value))
            }
            Token::Break => {
                self.advance();
                self.match_token(Token::Semi);
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.advance();
                self.match_token(Token::Semi);
                Ok(Stmt::Continue)
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.match_token(Token::Semi);
                Ok(Stmt::Throw(value))
            }
            Token::Try => self.parse_try(),
            Token::Semi => {
                self.advance();
                Ok(Stmt::Empty)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.match_token(Token::Semi);
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(Token::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(body)
    }

    fn parse_var_kind(&mut self) -> ParseResult<VarKind> {
        let kind = match self.peek_token() {
            Some(Token::Let) => VarKind::Let,
            Some(Token::Const) => VarKind::Const,
            Some(Token::Var) => VarKind::Var,
            _ => return Err(self.error_here("'let', 'const' or 'var'")),
        };
        self.advance();
        Ok(kind)
    }

    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let kind = self.parse_var_kind()?;
        let mut declarations = Vec::new();
        loop {
            let pattern = self.parse_pattern()?;
            let init = if self.match_token(Token::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push((pattern, init));
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        Ok(Stmt::VarDecl { kind, declarations })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.match_token(Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;

        let declares = matches!(
            self.peek_token(),
            Some(Token::Let | Token::Const | Token::Var)
        );
        let bare_head = matches!(
            (self.peek_token(), self.peek_token_at(1)),
            (Some(Token::Ident(_)), Some(Token::Of | Token::In))
        );

        if declares || bare_head {
            let checkpoint = self.pos;
            if declares {
                self.advance();
            }
            let pattern = self.parse_pattern()?;
            if self.match_token(Token::Of) {
                let iterable = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForOf {
                    pattern,
                    iterable,
                    body,
                });
            }
            if self.match_token(Token::In) {
                let object = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForIn {
                    pattern,
                    object,
                    body,
                });
            }
            self.pos = checkpoint;
        }

        let init = if self.check(Token::Semi) {
            None
        } else if declares {
            Some(Box::new(self.parse_var_decl()?))
        } else {
            Some(Box::new(Stmt::Expression(self.parse_expression()?)))
        };
        self.expect(Token::Semi)?;

        let test = if self.check(Token::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::Semi)?;

        let update = if self.check(Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::RParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let span = self.peek_span();
        self.expect(Token::Try)?;
        let block = self.parse_block()?;

        let mut param = None;
        let mut handler = None;
        if self.match_token(Token::Catch) {
            if self.match_token(Token::LParen) {
                param = Some(self.parse_pattern()?);
                self.expect(Token::RParen)?;
            }
            handler = Some(self.parse_block()?);
        }

        let finalizer = if self.match_token(Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(ParseError::invalid_syntax(
                span,
                "'try' needs a 'catch' or 'finally' block",
            ));
        }

        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        match self.peek_token() {
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(Pattern::Identifier(name.to_string()))
            }
            Some(Token::LBracket) => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(Token::RBracket) {
                    if self.match_token(Token::Comma) {
                        items.push(None);
                        continue;
                    }
                    items.push(Some(self.parse_pattern()?));
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Pattern::Array(items))
            }
            Some(Token::LBrace) => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(Token::RBrace) {
                    let key = self.expect_property_name()?;
                    let pattern = if self.match_token(Token::Colon) {
                        self.parse_pattern()?
                    } else {
                        Pattern::Identifier(key.clone())
                    };
                    entries.push((key, pattern));
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBrace)?;
                Ok(Pattern::Object(entries))
            }
            _ => Err(self.error_here("binding pattern")),
        }
    }

    // Functions

    fn parse_function_expression(&mut self) -> ParseResult<Rc<FunctionDecl>> {
        self.expect(Token::Function)?;
        let name = match self.peek_token() {
            Some(Token::Ident(name)) => {
                self.advance();
                Some(name.to_string())
            }
            _ => None,
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
        }))
    }

    fn parse_arrow_function(&mut self) -> ParseResult<Rc<FunctionDecl>> {
        let params = match self.peek_token() {
            Some(Token::Ident(name)) => {
                self.advance();
                vec![Param {
                    pattern: Pattern::Identifier(name.to_string()),
                    default: None,
                    rest: false,
                }]
            }
            _ => self.parse_params()?,
        };
        self.expect(Token::Arrow)?;

        let body = if self.check(Token::LBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Rc::new(FunctionDecl {
            name: None,
            params,
            body,
            is_arrow: true,
        }))
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        while !self.check(Token::RParen) {
            let rest = self.match_token(Token::Spread);
            let pattern = self.parse_pattern()?;
            let default = if !rest && self.match_token(Token::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                default,
                rest,
            });
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    /// `x =>` or `( ... ) =>`, decided by scanning to the matching paren
    fn is_arrow_ahead(&self) -> bool {
        match self.peek_token() {
            Some(Token::Ident(_)) => matches!(self.peek_token_at(1), Some(Token::Arrow)),
            Some(Token::LParen) => {
                let mut depth = 0usize;
                let mut offset = 0;
                while let Some(token) = self.peek_token_at(offset) {
                    match token {
                        Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                        Token::RParen | Token::RBracket | Token::RBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return matches!(token, Token::RParen)
                                    && matches!(self.peek_token_at(offset + 1), Some(Token::Arrow));
                            }
                        }
                        _ => {}
                    }
                    offset += 1;
                }
                false
            }
            _ => false,
        }
    }

    // Expressions

    /// Full expression including the comma operator. Argument, element and
    /// property lists use [`Self::parse_assignment`] instead.
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        let first = self.parse_assignment()?;
        if !self.check(Token::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.match_token(Token::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(expressions))
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.nested(|parser| {
            if parser.is_arrow_ahead() {
                return parser.parse_arrow_function().map(Expr::Function);
            }

            let span = parser.peek_span();
            let left = parser.parse_conditional()?;

            if let Some(operator) = parser.match_assign_op() {
                if !left.is_assignable() {
                    return Err(ParseError::invalid_syntax(span, "invalid assignment target"));
                }
                let value = parser.parse_assignment()?;
                return Ok(Expr::Assign {
                    target: Box::new(left),
                    operator,
                    value: Box::new(value),
                });
            }

            Ok(left)
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_logical_or()?;
        if self.match_token(Token::Question) {
            let consequent = self.parse_assignment()?;
            self.expect(Token::Colon)?;
            let alternate = self.parse_assignment()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(test)
    }

    /// `||` and `??` share a precedence level
    fn parse_logical_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_logical_and()?;
        loop {
            let operator = if self.match_token(Token::Or) {
                LogicalOp::Or
            } else if self.match_token(Token::Nullish) {
                LogicalOp::Nullish
            } else {
                break;
            };
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.match_token(Token::And) {
            let right = self.parse_equality()?;
            left = Expr::Logical {
                left: Box::new(left),
                operator: LogicalOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_relational()?;
        while let Some(operator) = self.match_equality_op() {
            let right = self.parse_relational()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        while let Some(operator) = self.match_relational_op() {
            let right = self.parse_additive()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        while let Some(operator) = self.match_additive_op() {
            let right = self.parse_multiplicative()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_exponent()?;
        while let Some(operator) = self.match_multiplicative_op() {
            let right = self.parse_exponent()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    /// Right associative
    fn parse_exponent(&mut self) -> ParseResult<Expr> {
        let base = self.parse_unary()?;
        if self.match_token(Token::StarStar) {
            let exponent = self.parse_exponent()?;
            return Ok(binary(base, BinaryOp::Exponent, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let operator = match self.peek_token() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Negate),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Typeof) => Some(UnaryOp::Typeof),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance();
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
            });
        }

        let update = match self.peek_token() {
            Some(Token::PlusPlus) => Some(UpdateOp::Increment),
            Some(Token::MinusMinus) => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            let span = self.peek_span();
            self.advance();
            let target = self.nested(Self::parse_unary)?;
            if !target.is_assignable() {
                return Err(ParseError::invalid_syntax(span, "invalid update target"));
            }
            return Ok(Expr::Update {
                operator,
                prefix: true,
                target: Box::new(target),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_call_member()?;
        let operator = match self.peek_token() {
            Some(Token::PlusPlus) => UpdateOp::Increment,
            Some(Token::MinusMinus) => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        if !expr.is_assignable() {
            return Err(ParseError::invalid_syntax(
                self.peek_span(),
                "invalid update target",
            ));
        }
        self.advance();
        Ok(Expr::Update {
            operator,
            prefix: false,
            target: Box::new(expr),
        })
    }

    /// Member access, indexing and calls. Once a chain has gone through `?.`
    /// every later link short-circuits on a nullish object as well.
    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = if self.check(Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut optional_chain = false;

        loop {
            match self.peek_token() {
                Some(Token::Dot) => {
                    self.advance();
                    let property = self.expect_property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: optional_chain,
                    };
                }
                Some(Token::QuestionDot) => {
                    self.advance();
                    optional_chain = true;
                    if self.check(Token::LParen) {
                        let arguments = self.parse_arguments()?;
                        expr = Expr::Call {
                            callee: Box::new(expr),
                            arguments,
                            optional: true,
                        };
                    } else if self.match_token(Token::LBracket) {
                        let index = self.parse_expression()?;
                        self.expect(Token::RBracket)?;
                        expr = Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: true,
                        };
                    } else {
                        let property = self.expect_property_name()?;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property,
                            optional: true,
                        };
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: optional_chain,
                    };
                }
                Some(Token::LParen) => {
                    let arguments = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        arguments,
                        optional: optional_chain,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        self.expect(Token::New)?;
        let mut callee = self.parse_primary()?;
        while self.match_token(Token::Dot) {
            let property = self.expect_property_name()?;
            callee = Expr::Member {
                object: Box::new(callee),
                property,
                optional: false,
            };
        }
        let arguments = if self.check(Token::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<ArrayElement>> {
        self.expect(Token::LParen)?;
        self.parse_element_list(Token::RParen)
    }

    fn parse_element_list(&mut self, close: Token<'src>) -> ParseResult<Vec<ArrayElement>> {
        let mut elements = Vec::new();
        while !self.check(close.clone()) {
            if self.match_token(Token::Spread) {
                elements.push(ArrayElement::Spread(self.parse_assignment()?));
            } else {
                elements.push(ArrayElement::Item(self.parse_assignment()?));
            }
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(elements)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek_token() else {
            return Err(ParseError::unexpected_eof("expression"));
        };
        let span = self.peek_span();

        match token {
            Token::Number(raw) => {
                self.advance();
                raw.parse::<f64>().map(Expr::Number).map_err(|_| {
                    ParseError::invalid_syntax(span, format!("invalid number '{}'", raw))
                })
            }
            Token::String(raw) => {
                self.advance();
                Ok(Expr::String(unescape(raw)))
            }
            Token::Template(raw) => {
                self.advance();
                parse_template(raw, span)
            }
            Token::True => {
                self.advance();
                Ok(Expr::Boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Boolean(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            Token::Undefined => {
                self.advance();
                Ok(Expr::Undefined)
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Identifier(name.to_string()))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                Ok(Expr::Array(self.parse_element_list(Token::RBracket)?))
            }
            Token::LBrace => self.parse_object(),
            Token::Function => Ok(Expr::Function(self.parse_function_expression()?)),
            _ => Err(self.error_here("expression")),
        }
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        self.expect(Token::LBrace)?;
        let mut properties = Vec::new();

        while !self.check(Token::RBrace) {
            if self.match_token(Token::Spread) {
                properties.push(ObjectProperty::Spread(self.parse_assignment()?));
            } else {
                let (key, shorthand) = match self.peek_token() {
                    Some(Token::LBracket) => {
                        self.advance();
                        let key = self.parse_assignment()?;
                        self.expect(Token::RBracket)?;
                        (PropertyKey::Computed(key), None)
                    }
                    Some(Token::String(raw)) => {
                        self.advance();
                        (PropertyKey::Static(unescape(raw)), None)
                    }
                    Some(Token::Number(raw)) => {
                        self.advance();
                        (PropertyKey::Static(raw.to_string()), None)
                    }
                    _ => {
                        let name = self.expect_property_name()?;
                        (PropertyKey::Static(name.clone()), Some(name))
                    }
                };

                let value = if self.match_token(Token::Colon) {
                    self.parse_assignment()?
                } else if self.check(Token::LParen) {
                    let params = self.parse_params()?;
                    let body = self.parse_block()?;
                    Expr::Function(Rc::new(FunctionDecl {
                        name: shorthand.clone(),
                        params,
                        body: FunctionBody::Block(body),
                        is_arrow: false,
                    }))
                } else if let Some(name) = shorthand {
                    Expr::Identifier(name)
                } else {
                    return Err(self.error_here("':'"));
                };

                properties.push(ObjectProperty::Property { key, value });
            }

            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(Expr::Object(properties))
    }

    // Operator matching

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek_token()? {
            Token::Eq => AssignOp::Assign,
            Token::PlusEq => AssignOp::Add,
            Token::MinusEq => AssignOp::Subtract,
            Token::StarEq => AssignOp::Multiply,
            Token::SlashEq => AssignOp::Divide,
            Token::PercentEq => AssignOp::Modulo,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_equality_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::StrictEq => BinaryOp::StrictEquals,
            Token::StrictNotEq => BinaryOp::StrictNotEquals,
            Token::EqEq => BinaryOp::Equals,
            Token::NotEq => BinaryOp::NotEquals,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_relational_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::Lt => BinaryOp::LessThan,
            Token::Lte => BinaryOp::LessThanOrEqual,
            Token::Gt => BinaryOp::GreaterThan,
            Token::Gte => BinaryOp::GreaterThanOrEqual,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Subtract,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::Star => BinaryOp::Multiply,
            Token::Slash => BinaryOp::Divide,
            Token::Percent => BinaryOp::Modulo,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    // Helper methods

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::invalid_syntax(
                self.peek_span(),
                "expression nested too deeply",
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek_token(&self) -> Option<Token<'src>> {
        self.peek_token_at(0)
    }

    fn peek_token_at(&self, offset: usize) -> Option<Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token.clone())
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token<'_>) -> bool {
        match self.tokens.get(self.pos) {
            Some((t, _)) => std::mem::discriminant(t) == std::mem::discriminant(&token),
            None => false,
        }
    }

    fn match_token(&mut self, token: Token<'_>) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token<'_>) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&token.to_string()))
        }
    }

    fn expect_property_name(&mut self) -> ParseResult<String> {
        match self.peek_token().and_then(|token| token.as_property_name()) {
            Some(name) => {
                self.advance();
                Ok(name.to_string())
            }
            None => Err(self.error_here("property name")),
        }
    }

    /// Span of the next token, or an empty span at the end of input
    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                end..end
            })
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some((token, span)) => {
                ParseError::unexpected_token(span.clone(), expected, token.to_string())
            }
            None => ParseError::unexpected_eof(expected),
        }
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

/// Split a template literal body into literal text and `${}` substitutions
fn parse_template(raw: &str, span: Range<usize>) -> ParseResult<Expr> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => read_escape(&mut chars, &mut literal),
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }

                let mut source = String::new();
                let mut depth = 1;
                loop {
                    match chars.next() {
                        Some('{') => {
                            depth += 1;
                            source.push('{');
                        }
                        Some('}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            source.push('}');
                        }
                        Some(c) => source.push(c),
                        None => {
                            return Err(ParseError::invalid_syntax(
                                span,
                                "unterminated template substitution",
                            ))
                        }
                    }
                }

                let expr = parse_expression(&source).map_err(|err| {
                    ParseError::invalid_syntax(
                        span.clone(),
                        format!("in template substitution: {}", err),
                    )
                })?;
                parts.push(TemplatePart::Expression(expr));
            }
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    Ok(Expr::Template(parts))
}

/// Resolve escape sequences in a string literal body
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            read_escape(&mut chars, &mut out);
        } else {
            out.push(ch);
        }
    }
    out
}

fn read_escape(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    let Some(next) = chars.next() else {
        out.push('\\');
        return;
    };
    match next {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        '0' => out.push('\0'),
        'b' => out.push('\u{8}'),
        'f' => out.push('\u{c}'),
        'v' => out.push('\u{b}'),
        'u' => {
            let code: String = if chars.peek() == Some(&'{') {
                chars.next();
                chars.by_ref().take_while(|c| *c != '}').collect()
            } else {
                chars.by_ref().take(4).collect()
            };
            push_code_point(out, "\\u", &code);
        }
        'x' => {
            let code: String = chars.by_ref().take(2).collect();
            push_code_point(out, "\\x", &code);
        }
        // line continuation
        '\n' => {}
        other => out.push(other),
    }
}

fn push_code_point(out: &mut String, prefix: &str, code: &str) {
    match u32::from_str_radix(code, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push_str(prefix);
            out.push_str(code);
        }
    }
}

/// Parse a single expression such as the body of `$exp` or `{{ }}`
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    Parser::new(source)?.parse_standalone_expression()
}

/// Parse a function expression (arrow or `function`), as used by methods and effects
pub fn parse_function(source: &str) -> ParseResult<Rc<FunctionDecl>> {
    match parse_expression(source)? {
        Expr::Function(decl) => Ok(decl),
        _ => Err(ParseError::invalid_syntax(
            0..source.len(),
            "expected a function expression",
        )),
    }
}

/// Parse a statement list
pub fn parse_program(source: &str) -> ParseResult<Vec<Stmt>> {
    Parser::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary {
                operator: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                }
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let expr = parse_expression("2 ** 3 ** 2").unwrap();
        match expr {
            Expr::Binary { left, right, .. } => {
                assert_eq!(*left, Expr::Number(2.0));
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        operator: BinaryOp::Exponent,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_arrow_detection() {
        assert!(matches!(
            parse_expression("() => 1").unwrap(),
            Expr::Function(_)
        ));
        assert!(matches!(
            parse_expression("x => x * 2").unwrap(),
            Expr::Function(_)
        ));
        assert!(matches!(
            parse_expression("(a, b = 2) => { return a + b; }").unwrap(),
            Expr::Function(_)
        ));
        // Parenthesised expression, not a function
        assert!(matches!(
            parse_expression("(a + b) * 2").unwrap(),
            Expr::Binary { .. }
        ));
    }

    #[test]
    fn test_optional_chain_propagates() {
        let expr = parse_expression("user?.profile.name").unwrap();
        match expr {
            Expr::Member {
                optional, object, ..
            } => {
                assert!(optional);
                assert!(matches!(*object, Expr::Member { optional: true, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_forms() {
        let expr = parse_expression("({ a, 'b': 1, [k]: 2, ...rest, m() { return 1 } })").unwrap();
        match expr {
            Expr::Object(props) => assert_eq!(props.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_template_literal() {
        let expr = parse_expression("`Hello ${name}!`").unwrap();
        assert_eq!(
            expr,
            Expr::Template(vec![
                TemplatePart::Literal("Hello ".to_string()),
                TemplatePart::Expression(Expr::Identifier("name".to_string())),
                TemplatePart::Literal("!".to_string()),
            ])
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"it\'s"), "it's");
        assert_eq!(unescape(r"\u0041\x42"), "AB");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_expression("1 = 2").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("a + b;").is_ok());
    }

    #[test]
    fn test_function_requires_function() {
        assert!(parse_function("() => setState('count', count + 1)").is_ok());
        assert!(parse_function("function (a) { return a }").is_ok());
        assert!(parse_function("count + 1").is_err());
    }

    #[test]
    fn test_for_loop_forms() {
        let program = parse_program(
            "for (let i = 0; i < 3; i++) {} for (const x of xs) {} for (k in obj) {}",
        )
        .unwrap();
        assert!(matches!(program[0], Stmt::For { .. }));
        assert!(matches!(program[1], Stmt::ForOf { .. }));
        assert!(matches!(program[2], Stmt::ForIn { .. }));
    }

    #[test]
    fn test_comma_operator() {
        match parse_expression("(a.push(x), a.length)").unwrap() {
            Expr::Sequence(expressions) => {
                assert_eq!(expressions.len(), 2);
                assert!(matches!(expressions[0], Expr::Call { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }

        // Lists keep their own commas
        match parse_expression("f(a, b)").unwrap() {
            Expr::Call { arguments, .. } => assert_eq!(arguments.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match parse_expression("[(1, 2), 3]").unwrap() {
            Expr::Array(elements) => assert_eq!(elements.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_expression("(a, b) => a").unwrap(),
            Expr::Function(_)
        ));

        let program = parse_program("for (i = 0, j = 9; i < j; i++, j--) {} let p = 1, q = 2;").unwrap();
        match &program[0] {
            Stmt::For { update, .. } => assert!(matches!(update, Some(Expr::Sequence(_)))),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&program[1], Stmt::VarDecl { declarations, .. } if declarations.len() == 2));
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(parse_expression(&source).is_err());
    }
}
