//! Functional-syntax deserialisation of axiom text.
//!
//! The [`AxiomDeserialiser`] trait is the seam between expression text and the
//! [`Axiom`] model. [`FunctionalSyntaxDeserialiser`] implements it for the OWL
//! functional-syntax subset found in the OWL axiom reference set:
//!
//! ```text
//! SubClassOf(:1230000010 ObjectIntersectionOf(:404684003
//!     ObjectSomeValuesFrom(:609096000 ObjectSomeValuesFrom(:116676008 :50960005))))
//! ```
//!
//! The lexer runs first and tracks byte offsets so syntax errors point at the
//! offending token. Term annotations (`|...|`) must be stripped beforehand.

use crate::concept::ConceptId;
use crate::error::{SyntaxError, SyntaxResult};

use super::{Axiom, AxiomKind, ClassExpression, Literal};

/// Converts expression text into an [`Axiom`].
pub trait AxiomDeserialiser {
    /// Parse `expression`, tagging the result with `identifier` for provenance.
    fn deserialise(&self, expression: &str, identifier: &str) -> SyntaxResult<Axiom>;
}

/// Recursive-descent parser for the functional-syntax subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionalSyntaxDeserialiser;

impl FunctionalSyntaxDeserialiser {
    pub fn new() -> Self {
        Self
    }
}

impl AxiomDeserialiser for FunctionalSyntaxDeserialiser {
    fn deserialise(&self, expression: &str, identifier: &str) -> SyntaxResult<Axiom> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser { tokens, pos: 0 };
        let kind = parser.axiom()?;
        if let Some(tok) = parser.peek() {
            return Err(SyntaxError::TrailingInput { offset: tok.offset });
        }
        Ok(Axiom::new(kind).with_source(identifier))
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    /// Construct keyword or prefixed name such as `owl:Thing`.
    Word(String),
    Concept(ConceptId),
    Literal(Literal),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Open => "`(`".into(),
            TokenKind::Close => "`)`".into(),
            TokenKind::Word(w) => format!("`{w}`"),
            TokenKind::Concept(id) => format!("concept :{id}"),
            TokenKind::Literal(lit) => format!("literal {lit}"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn tokenize(input: &str) -> SyntaxResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment to end of line.
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Open, offset });
            }
            ')' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Close, offset });
            }
            '<' => {
                chars.next();
                let mut iri = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '>' {
                        closed = true;
                        break;
                    }
                    iri.push(c);
                }
                if !closed {
                    return Err(SyntaxError::Unterminated { what: "IRI", offset });
                }
                tokens.push(Token {
                    kind: TokenKind::Concept(concept_from_iri(&iri, offset)?),
                    offset,
                });
            }
            ':' => {
                chars.next();
                let mut digits = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    digits.push(c);
                    chars.next();
                }
                let id = digits
                    .parse::<u64>()
                    .ok()
                    .and_then(ConceptId::new)
                    .ok_or_else(|| SyntaxError::InvalidConcept {
                        text: format!(":{digits}"),
                        offset,
                    })?;
                tokens.push(Token { kind: TokenKind::Concept(id), offset });
            }
            '"' => {
                chars.next();
                let mut lexical = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                lexical.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        c => lexical.push(c),
                    }
                }
                if !closed {
                    return Err(SyntaxError::Unterminated { what: "literal", offset });
                }
                let mut datatype = None;
                if next_is_caret_pair(&mut chars) {
                    let mut dt = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if !(is_word_char(c) || matches!(c, '<' | '>' | '/' | '#')) {
                            break;
                        }
                        dt.push(c);
                        chars.next();
                    }
                    datatype = Some(dt);
                }
                tokens.push(Token {
                    kind: TokenKind::Literal(Literal { lexical, datatype }),
                    offset,
                });
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token { kind: TokenKind::Word(word), offset });
            }
            other => {
                return Err(SyntaxError::UnexpectedToken {
                    found: format!("character {other:?}"),
                    expected: "an axiom construct".into(),
                    offset,
                });
            }
        }
    }
    Ok(tokens)
}

/// Consume `^^` if it immediately follows.
fn next_is_caret_pair(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> bool {
    let mut probe = chars.clone();
    if matches!(probe.next(), Some((_, '^'))) && matches!(probe.next(), Some((_, '^'))) {
        chars.next();
        chars.next();
        true
    } else {
        false
    }
}

fn concept_from_iri(iri: &str, offset: usize) -> SyntaxResult<ConceptId> {
    iri.rsplit(['/', '#'])
        .next()
        .and_then(|tail| tail.parse::<u64>().ok())
        .and_then(ConceptId::new)
        .ok_or_else(|| SyntaxError::InvalidConcept {
            text: format!("<{iri}>"),
            offset,
        })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &str) -> SyntaxResult<Token> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| SyntaxError::UnexpectedEnd {
                expected: expected.into(),
            })?;
        self.pos += 1;
        Ok(tok)
    }

    fn unexpected(tok: &Token, expected: &str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            found: tok.kind.describe(),
            expected: expected.into(),
            offset: tok.offset,
        }
    }

    fn open(&mut self) -> SyntaxResult<()> {
        let tok = self.next("`(`")?;
        match tok.kind {
            TokenKind::Open => Ok(()),
            _ => Err(Self::unexpected(&tok, "`(`")),
        }
    }

    fn close(&mut self) -> SyntaxResult<()> {
        let tok = self.next("`)`")?;
        match tok.kind {
            TokenKind::Close => Ok(()),
            _ => Err(Self::unexpected(&tok, "`)`")),
        }
    }

    fn at_close(&self) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Close, .. }))
    }

    fn concept(&mut self, expected: &str) -> SyntaxResult<ConceptId> {
        let tok = self.next(expected)?;
        match tok.kind {
            TokenKind::Concept(id) => Ok(id),
            _ => Err(Self::unexpected(&tok, expected)),
        }
    }

    fn axiom(&mut self) -> SyntaxResult<AxiomKind> {
        let tok = self.next("an axiom")?;
        let TokenKind::Word(name) = &tok.kind else {
            return Err(Self::unexpected(&tok, "an axiom"));
        };
        self.open()?;
        let kind = match name.as_str() {
            "SubClassOf" => {
                let sub = self.class_expression()?;
                let sup = self.class_expression()?;
                AxiomKind::SubClassOf { sub, sup }
            }
            "EquivalentClasses" => {
                let operands = self.operands(2)?;
                AxiomKind::EquivalentClasses(operands)
            }
            "SubObjectPropertyOf" => {
                let sub = self.property_or_chain()?;
                let sup = self.concept("a super property")?;
                AxiomKind::SubObjectPropertyOf { sub, sup }
            }
            "SubDataPropertyOf" => {
                let sub = self.concept("a data property")?;
                let sup = self.concept("a super data property")?;
                AxiomKind::SubDataPropertyOf { sub, sup }
            }
            "TransitiveObjectProperty" => {
                AxiomKind::TransitiveObjectProperty(self.concept("an object property")?)
            }
            "ReflexiveObjectProperty" => {
                AxiomKind::ReflexiveObjectProperty(self.concept("an object property")?)
            }
            _ => {
                return Err(SyntaxError::UnknownConstruct {
                    name: name.clone(),
                    offset: tok.offset,
                });
            }
        };
        self.close()?;
        Ok(kind)
    }

    fn property_or_chain(&mut self) -> SyntaxResult<Vec<ConceptId>> {
        let tok = self.next("an object property")?;
        match &tok.kind {
            TokenKind::Concept(id) => Ok(vec![*id]),
            TokenKind::Word(w) if w == "ObjectPropertyChain" => {
                self.open()?;
                let mut chain = vec![self.concept("a chained property")?];
                while !self.at_close() {
                    chain.push(self.concept("a chained property")?);
                }
                self.close()?;
                if chain.len() < 2 {
                    return Err(SyntaxError::UnexpectedToken {
                        found: "`)`".into(),
                        expected: "at least two chained properties".into(),
                        offset: tok.offset,
                    });
                }
                Ok(chain)
            }
            _ => Err(Self::unexpected(&tok, "an object property")),
        }
    }

    /// At least `min` class expressions up to the closing parenthesis.
    fn operands(&mut self, min: usize) -> SyntaxResult<Vec<ClassExpression>> {
        let mut operands = Vec::new();
        while !self.at_close() {
            operands.push(self.class_expression()?);
        }
        if operands.len() < min {
            return match self.peek() {
                Some(tok) => Err(Self::unexpected(tok, "another class expression")),
                None => Err(SyntaxError::UnexpectedEnd {
                    expected: "another class expression".into(),
                }),
            };
        }
        Ok(operands)
    }

    fn class_expression(&mut self) -> SyntaxResult<ClassExpression> {
        let tok = self.next("a class expression")?;
        match &tok.kind {
            TokenKind::Concept(id) => Ok(ClassExpression::Named(*id)),
            TokenKind::Word(w) if w == "owl:Thing" => Ok(ClassExpression::Thing),
            TokenKind::Word(w) => {
                let expr = match w.as_str() {
                    "ObjectIntersectionOf" => {
                        self.open()?;
                        ClassExpression::Intersection(self.operands(2)?)
                    }
                    "ObjectSomeValuesFrom" => {
                        self.open()?;
                        let property = self.concept("an object property")?;
                        let filler = self.class_expression()?;
                        ClassExpression::SomeValuesFrom {
                            property,
                            filler: Box::new(filler),
                        }
                    }
                    "DataHasValue" => {
                        self.open()?;
                        let property = self.concept("a data property")?;
                        let lit_tok = self.next("a literal")?;
                        let TokenKind::Literal(value) = lit_tok.kind.clone() else {
                            return Err(Self::unexpected(&lit_tok, "a literal"));
                        };
                        ClassExpression::HasValue { property, value }
                    }
                    _ => {
                        return Err(SyntaxError::UnknownConstruct {
                            name: w.clone(),
                            offset: tok.offset,
                        });
                    }
                };
                self.close()?;
                Ok(expr)
            }
            _ => Err(Self::unexpected(&tok, "a class expression")),
        }
    }
}
