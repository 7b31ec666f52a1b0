//! Condition-expression parsing and normalization.
//!
//! Directive conditions (`#if`/`#elif` expressions, `#ifdef` names) are
//! normalized into a canonical token alphabet so that signatures written
//! differently in different files can be compared textually. The parser is a
//! plain tokenizer plus layered recursive descent, one layer per precedence
//! class:
//!
//! 1. `defined(x)` and unary `!` (right-associative)
//! 2. `* / % & | << >> + -` (one class, left-associative)
//! 3. `< > <= >= == !=` (left-associative)
//! 4. `&&`
//! 5. `||`
//!
//! Normalization is a pure function of each operator: `defined` is dropped,
//! `!x` becomes `&not(x)`, `&&`/`||` become `&and`/`&or`, `==` becomes `=`,
//! and the bit/shift/modulo operators are rewritten into two-argument form
//! (`mod(a,b)`, `band(a,b)`, `bor(a,b)`, `shl(a,b)`, `shr(a,b)`).
//! Hexadecimal literals are normalized to decimal text.
//!
//! Parsing is best-effort: text that does not match the grammar, or nests
//! past the configured depth bound, falls back to the raw text so the
//! signature algebra downstream always has a string to work with.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use vartex_core::{AnalysisError, Result};

/// A parsed and normalized condition expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpression {
    /// Canonical rendition of the expression.
    pub normalized: String,
    /// Identifiers referenced by the expression, in occurrence order.
    /// These are the feature constants the condition depends on.
    pub identifiers: Vec<String>,
}

/// A function-like macro definition, `#define NAME(params) expansion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMacro {
    pub name: String,
    pub parameters: Vec<String>,
    pub expansion: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(String),
    CharLit(String),
    LParen,
    RParen,
    Comma,
    Not,
    AndAnd,
    OrOr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Shl,
    Shr,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '@' | '$')
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '$' | '-')
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '\'' => {
                chars.next();
                let mut lit = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, esc)) = chars.next() {
                                lit.push(esc);
                            }
                        }
                        '\'' => {
                            closed = true;
                            break;
                        }
                        other => lit.push(other),
                    }
                }
                if !closed {
                    return Err(AnalysisError::parse(text));
                }
                tokens.push(Token::CharLit(lit));
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '&'))) {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    tokens.push(Token::Amp);
                }
            }
            '|' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '|'))) {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    tokens.push(Token::Pipe);
                }
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some((_, '=')) => {
                        chars.next();
                        tokens.push(Token::Le);
                    }
                    Some((_, '<')) => {
                        chars.next();
                        tokens.push(Token::Shl);
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                match chars.peek() {
                    Some((_, '=')) => {
                        chars.next();
                        tokens.push(Token::Ge);
                    }
                    Some((_, '>')) => {
                        chars.next();
                        tokens.push(Token::Shr);
                    }
                    _ => tokens.push(Token::Gt),
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::Eq);
                } else {
                    return Err(AnalysisError::parse(text));
                }
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '~' | '0'..='9' => {
                tokens.push(lex_number(text, &mut chars)?);
            }
            c if is_ident_start(c) => {
                let mut end = pos;
                while let Some(&(p, c)) = chars.peek() {
                    if is_ident_continue(c) {
                        end = p + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(text[pos..end].to_string()));
            }
            _ => return Err(AnalysisError::parse(text)),
        }
    }
    Ok(tokens)
}

/// Lex a numeric literal: `0x…` hexadecimal (normalized to decimal) or a
/// decimal integer with an optional leading `~`, each with optional `U`/`L`
/// suffixes which are dropped.
fn lex_number(
    text: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<Token> {
    let mut prefix = String::new();
    if matches!(chars.peek(), Some((_, '~'))) {
        chars.next();
        prefix.push('~');
    }

    let mut digits = String::new();
    let hex = {
        let mut probe = chars.clone();
        matches!(probe.next(), Some((_, '0'))) && matches!(probe.next(), Some((_, 'x' | 'X')))
    };
    if hex {
        chars.next();
        chars.next();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_hexdigit() {
                digits.push(c);
                chars.next();
            } else {
                break;
            }
        }
        let value = u128::from_str_radix(&digits, 16).map_err(|_| AnalysisError::parse(text))?;
        digits = value.to_string();
    } else {
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                chars.next();
            } else {
                break;
            }
        }
    }
    if digits.is_empty() {
        return Err(AnalysisError::parse(text));
    }

    // suffixes: at most one U and two L, any case
    let mut seen = 0;
    while let Some(&(_, c)) = chars.peek() {
        if matches!(c, 'u' | 'U' | 'l' | 'L') && seen < 3 {
            seen += 1;
            chars.next();
        } else {
            break;
        }
    }

    Ok(Token::Number(format!("{prefix}{digits}")))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
    identifiers: Vec<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            Err(AnalysisError::parse("recursion bound exceeded"))
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> Result<String> {
        self.enter()?;
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = format!("({lhs} &or {rhs})");
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<String> {
        let mut lhs = self.parse_cmp()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.parse_cmp()?;
            lhs = format!("({lhs} &and {rhs})");
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<String> {
        let mut lhs = self.parse_calc()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => "<",
                Some(Token::Gt) => ">",
                Some(Token::Le) => "<=",
                Some(Token::Ge) => ">=",
                Some(Token::Eq) => "=",
                Some(Token::Ne) => "!=",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_calc()?;
            lhs = format!("({lhs} {op} {rhs})");
        }
        Ok(lhs)
    }

    /// One precedence class for all arithmetic, bit, and shift operators.
    fn parse_calc(&mut self) -> Result<String> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                Some(Token::Percent) => Token::Percent,
                Some(Token::Amp) => Token::Amp,
                Some(Token::Pipe) => Token::Pipe,
                Some(Token::Shl) => Token::Shl,
                Some(Token::Shr) => Token::Shr,
                Some(Token::Plus) => Token::Plus,
                Some(Token::Minus) => Token::Minus,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = match op {
                Token::Percent => format!("mod({lhs},{rhs})"),
                Token::Amp => format!("band({lhs},{rhs})"),
                Token::Pipe => format!("bor({lhs},{rhs})"),
                Token::Shl => format!("shl({lhs},{rhs})"),
                Token::Shr => format!("shr({lhs},{rhs})"),
                Token::Star => format!("({lhs} * {rhs})"),
                Token::Slash => format!("({lhs} / {rhs})"),
                Token::Plus => format!("({lhs} + {rhs})"),
                Token::Minus => format!("({lhs} - {rhs})"),
                _ => unreachable!(),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<String> {
        self.enter()?;
        let out = match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(format!("&not({operand})"))
            }
            // `defined X` / `defined(X)`: the wrapper is dropped, only the
            // operand survives into the canonical form.
            Some(Token::Ident(name)) if name.as_str() == "defined" => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        };
        self.leave();
        out
    }

    fn parse_primary(&mut self) -> Result<String> {
        match self.bump() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(AnalysisError::parse("missing closing parenthesis"))
                }
            }
            Some(Token::Number(n)) => Ok(n.clone()),
            Some(Token::CharLit(s)) => Ok(s.clone()),
            Some(Token::Ident(name)) => {
                // function-macro invocation keeps its shape; a plain
                // identifier is a referenced feature constant
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    loop {
                        match self.bump() {
                            Some(Token::Ident(arg)) => args.push(arg.clone()),
                            Some(Token::Number(n)) => args.push(n.clone()),
                            _ => return Err(AnalysisError::parse("malformed macro argument")),
                        }
                        match self.bump() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            _ => return Err(AnalysisError::parse("unterminated macro call")),
                        }
                    }
                    Ok(format!("{}({})", name, args.join(",")))
                } else {
                    self.identifiers.push(name.clone());
                    Ok(name.clone())
                }
            }
            _ => Err(AnalysisError::parse("expected an operand")),
        }
    }
}

/// Parser and normalizer for directive condition expressions.
#[derive(Debug, Clone)]
pub struct ExpressionParser {
    max_depth: usize,
}

impl ExpressionParser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parse and normalize `text`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartex_analysis::expr::ExpressionParser;
    ///
    /// let parser = ExpressionParser::new(64);
    /// let parsed = parser.parse("defined(A) && B > 0x10").unwrap();
    /// assert_eq!(parsed.normalized, "(A &and (B > 16))");
    /// assert_eq!(parsed.identifiers, vec!["A".to_string(), "B".to_string()]);
    /// ```
    pub fn parse(&self, text: &str) -> Result<ParsedExpression> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(AnalysisError::parse(text));
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            max_depth: self.max_depth,
            identifiers: Vec::new(),
        };
        let normalized = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(AnalysisError::parse(text));
        }
        Ok(ParsedExpression {
            normalized,
            identifiers: parser.identifiers,
        })
    }

    /// Parse with raw-text fallback.
    ///
    /// On grammar mismatch or depth exhaustion the original text is returned
    /// unchanged and the referenced identifiers are recovered with a token
    /// scan, so downstream signature matching and scattering still work.
    /// Returns `(expression, parse_failed)`.
    pub fn parse_lossy(&self, text: &str) -> (ParsedExpression, bool) {
        match self.parse(text) {
            Ok(parsed) => (parsed, false),
            Err(err) => {
                warn!(text, %err, "cannot parse condition expression, keeping raw text");
                (
                    ParsedExpression {
                        normalized: text.to_string(),
                        identifiers: scan_identifiers(text),
                    },
                    true,
                )
            }
        }
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new(vartex_core::AnalysisConfig::default().max_expression_depth)
    }
}

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_@$][A-Za-z0-9_@$\-]*").expect("valid pattern"));

/// Fallback identifier scan for unparsable expressions.
fn scan_identifiers(text: &str) -> Vec<String> {
    IDENT_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|word| *word != "defined")
        .map(str::to_string)
        .collect()
}

/// Parse a flattened `#define` directive body and recognize function-like
/// macros. Object-like macros return `None`; only function-like definitions
/// are needed, to exclude their names from object-macro counts.
pub fn parse_define(text: &str) -> Option<FunctionMacro> {
    let body = text.trim_start();
    let body = body.strip_prefix('#').map_or(body, str::trim_start);
    let body = body.strip_prefix("define").map_or(body, str::trim_start);

    let name_end = body.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))?;
    if name_end == 0 {
        return None;
    }
    let (name, rest) = body.split_at(name_end);
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return None;
    }

    // function-like only when the parenthesis follows the name directly
    let rest = rest.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (params, expansion) = rest.split_at(close);
    let parameters: Vec<String> = params
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parameters.is_empty() {
        return None;
    }

    Some(FunctionMacro {
        name: name.to_string(),
        parameters,
        expansion: expansion[1..].trim().to_string(),
    })
}
