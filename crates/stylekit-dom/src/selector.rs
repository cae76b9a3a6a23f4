//! Selector parsing and matching.
//!
//! Supports the subset the inspector produces and stores: type selectors,
//! `*`, `#id`, `.class`, `:nth-of-type(n)`, descendant and child combinators,
//! and comma-separated lists. Identifiers accept CSS escapes so utility class
//! names such as `md:flex` or `w-1/2` survive a round trip.

use std::fmt;

use smallvec::SmallVec;

use crate::{Document, DomError, NodeId};

/// Selector specificity as (ids, classes, types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

/// Relationship between two adjacent compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Whitespace.
    Descendant,
    /// `>`.
    Child,
}

/// A compound selector: everything between two combinators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// Lowercased tag name, or `None` for `*`/omitted.
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: SmallVec<[String; 2]>,
    /// 1-based `:nth-of-type()` ordinal.
    pub nth_of_type: Option<usize>,
}

impl CompoundSelector {
    pub fn specificity(&self) -> Specificity {
        Specificity(
            self.id.is_some() as u32,
            self.classes.len() as u32 + self.nth_of_type.is_some() as u32,
            self.tag.is_some() as u32,
        )
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(element) = doc.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(element.tag_name()) {
                return false;
            }
        }
        if let Some(sel_id) = &self.id {
            if element.id() != Some(sel_id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        if let Some(n) = self.nth_of_type {
            if doc.index_of_type(id) != Some(n) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.id.is_none() && self.classes.is_empty() && self.nth_of_type.is_none() => {
                f.write_str("*")?
            }
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", escape_identifier(id))?;
        }
        for class in &self.classes {
            write!(f, ".{}", escape_identifier(class))?;
        }
        if let Some(n) = self.nth_of_type {
            write!(f, ":nth-of-type({})", n)?;
        }
        Ok(())
    }
}

/// A chain of compound selectors joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    parts: Vec<CompoundSelector>,
    /// `combinators[i]` joins `parts[i]` and `parts[i + 1]`.
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    pub fn parts(&self) -> &[CompoundSelector] {
        &self.parts
    }

    pub fn combinators(&self) -> &[Combinator] {
        &self.combinators
    }

    pub fn specificity(&self) -> Specificity {
        self.parts.iter().fold(Specificity::default(), |acc, part| {
            let s = part.specificity();
            Specificity(acc.0 + s.0, acc.1 + s.1, acc.2 + s.2)
        })
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.matches_at(doc, id, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, id: NodeId, idx: usize) -> bool {
        if !self.parts[idx].matches(doc, id) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => doc
                .parent_element(id)
                .is_some_and(|p| self.matches_at(doc, p, idx - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent_element(id);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, idx - 1) {
                        return true;
                    }
                    current = doc.parent_element(ancestor);
                }
                false
            }
        }
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.parts.iter().enumerate() {
            if idx > 0 {
                match self.combinators[idx - 1] {
                    Combinator::Child => f.write_str(" > ")?,
                    Combinator::Descendant => f.write_str(" ")?,
                }
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// A comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let mut parser = Parser::new(input);
        let mut selectors = vec![parser.complex()?];
        loop {
            parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.bump();
                    selectors.push(parser.complex()?);
                }
                Some(c) => {
                    return Err(DomError::InvalidSelector(format!(
                        "unexpected '{}' in {:?}",
                        c, input
                    )))
                }
            }
        }
        Ok(Self(selectors))
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(doc, id))
    }

    /// Highest specificity among the selectors that match `id`.
    pub fn matching_specificity(&self, doc: &Document, id: NodeId) -> Option<Specificity> {
        self.0
            .iter()
            .filter(|s| s.matches(doc, id))
            .map(ComplexSelector::specificity)
            .max()
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, selector) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}

/// Escape an identifier for use in a selector.
pub fn escape_identifier(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (idx, c) in ident.chars().enumerate() {
        let leading_digit = idx == 0 && c.is_ascii_digit();
        if leading_digit {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn error(&self, msg: &str) -> DomError {
        DomError::InvalidSelector(format!("{} at {} in {:?}", msg, self.pos, self.input))
    }

    fn complex(&mut self) -> Result<ComplexSelector, DomError> {
        self.skip_whitespace();
        let mut parts = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let saw_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if saw_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.error(&format!("unexpected '{}'", c))),
            };
            combinators.push(combinator);
            parts.push(self.compound()?);
        }
        Ok(ComplexSelector { parts, combinators })
    }

    fn compound(&mut self) -> Result<CompoundSelector, DomError> {
        let mut compound = CompoundSelector::default();
        let mut empty = true;

        match self.peek() {
            Some('*') => {
                self.bump();
                empty = false;
            }
            Some(c) if is_ident_char(c) || c == '\\' => {
                compound.tag = Some(self.identifier()?.to_ascii_lowercase());
                empty = false;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.identifier()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.identifier()?);
                }
                Some(':') => {
                    self.bump();
                    compound.nth_of_type = Some(self.nth_of_type()?);
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(self.error("expected selector"));
        }
        Ok(compound)
    }

    fn nth_of_type(&mut self) -> Result<usize, DomError> {
        let name = self.identifier()?;
        if !name.eq_ignore_ascii_case("nth-of-type") || self.bump() != Some('(') {
            return Err(self.error(&format!("unsupported pseudo-class :{}", name)));
        }
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.pos += 1;
        }
        if self.bump() != Some(')') {
            return Err(self.error("expected ')'"));
        }
        match digits.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.error("expected positive ordinal")),
        }
    }

    fn identifier(&mut self) -> Result<String, DomError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                ident.push(self.escape()?);
            } else if is_ident_char(c) {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(ident)
    }

    fn escape(&mut self) -> Result<char, DomError> {
        let mut hex = String::new();
        while hex.len() < 6 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            return self.bump().ok_or_else(|| self.error("dangling escape"));
        }
        // A single whitespace terminates a hex escape.
        if self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid escape"))
    }
}
