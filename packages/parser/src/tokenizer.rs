use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;

/// Token types for the script language used by `$exp` values, methods and effects
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'src> {
    // Keywords
    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("var")]
    Var,

    #[token("function")]
    Function,

    #[token("return")]
    Return,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("for")]
    For,

    #[token("of")]
    Of,

    #[token("in")]
    In,

    #[token("while")]
    While,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("new")]
    New,

    #[token("typeof")]
    Typeof,

    #[token("throw")]
    Throw,

    #[token("try")]
    Try,

    #[token("catch")]
    Catch,

    #[token("finally")]
    Finally,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("undefined")]
    Undefined,

    // Identifiers
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // Literals
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    #[regex(r"'([^'\\]|\\.)*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    String(&'src str),

    #[regex(r"`([^`\\]|\\.)*`", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Template(&'src str),

    // Operators
    #[token("=>")]
    Arrow,

    #[token("...")]
    Spread,

    #[token("?.")]
    QuestionDot,

    #[token("??")]
    Nullish,

    #[token("?")]
    Question,

    #[token("===")]
    StrictEq,

    #[token("!==")]
    StrictNotEq,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    Lte,

    #[token(">=")]
    Gte,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("!")]
    Bang,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,

    #[token("+=")]
    PlusEq,

    #[token("-=")]
    MinusEq,

    #[token("*=")]
    StarEq,

    #[token("/=")]
    SlashEq,

    #[token("%=")]
    PercentEq,

    #[token("**")]
    StarStar,

    #[token("=")]
    Eq,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    // Punctuation
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(";")]
    Semi,

    #[token(".")]
    Dot,
}

impl<'src> Token<'src> {
    /// Keywords may still appear as property names (`obj.new`, `{ default: 1 }`)
    pub fn as_property_name(&self) -> Option<&'src str> {
        let name = match self {
            Token::Ident(name) => return Some(name),
            Token::Let => "let",
            Token::Const => "const",
            Token::Var => "var",
            Token::Function => "function",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::For => "for",
            Token::Of => "of",
            Token::In => "in",
            Token::While => "while",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::New => "new",
            Token::Typeof => "typeof",
            Token::Throw => "throw",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Finally => "finally",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Undefined => "undefined",
            _ => return None,
        };
        Some(name)
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.as_property_name() {
            return match self {
                Token::Ident(_) => write!(f, "identifier '{}'", name),
                _ => write!(f, "'{}'", name),
            };
        }
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string \"{}\"", s),
            Token::Template(_) => write!(f, "template literal"),
            Token::Arrow => write!(f, "'=>'"),
            Token::Spread => write!(f, "'...'"),
            Token::QuestionDot => write!(f, "'?.'"),
            Token::Nullish => write!(f, "'??'"),
            Token::Question => write!(f, "'?'"),
            Token::StrictEq => write!(f, "'==='"),
            Token::StrictNotEq => write!(f, "'!=='"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::Lte => write!(f, "'<='"),
            Token::Gte => write!(f, "'>='"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Bang => write!(f, "'!'"),
            Token::PlusPlus => write!(f, "'++'"),
            Token::MinusMinus => write!(f, "'--'"),
            Token::PlusEq => write!(f, "'+='"),
            Token::MinusEq => write!(f, "'-='"),
            Token::StarEq => write!(f, "'*='"),
            Token::SlashEq => write!(f, "'/='"),
            Token::PercentEq => write!(f, "'%='"),
            Token::StarStar => write!(f, "'**'"),
            Token::Eq => write!(f, "'='"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::Semi => write!(f, "';'"),
            Token::Dot => write!(f, "'.'"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Tokenize source text, failing on the first character the lexer cannot match
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, std::ops::Range<usize>)>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let found = source.get(span.clone()).unwrap_or("").to_string();
                return Err(ParseError::lex_error(
                    span,
                    format!("Unexpected character '{}'", found),
                ));
            }
        }
    }
    Ok(tokens)
}
