//! Gene-reaction rules (boolean expressions over gene ids).
//!
//! Rules are parsed into a small expression tree (`and` binds tighter
//! than `or`, keywords are case-insensitive). The disjunctive normal form
//! of a rule is its list of complexes: gene sets that are jointly
//! sufficient for the reaction.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::translation::NOT_FOUND;

/// Suffix marking an untranslated gene in a mixed rule.
pub const UNTRANSLATED_SUFFIX: &str = "_not_found";

/// Largest disjunctive normal form [`Gpr::complexes`] will build.
///
/// An AND of ORs expands multiplicatively, so deeply nested rules are
/// refused instead of expanded.
pub const MAX_COMPLEXES: usize = 4096;

/// Gene rule parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GprError {
    /// Parentheses do not pair up.
    #[error("Unbalanced parenthesis in gene rule '{rule}'")]
    UnbalancedParenthesis {
        /// The rule.
        rule: String,
    },

    /// A token in the wrong position.
    #[error("Unexpected token '{token}' in gene rule '{rule}'")]
    UnexpectedToken {
        /// The token.
        token: String,
        /// The rule.
        rule: String,
    },

    /// An operator without a right operand.
    #[error("Gene rule '{rule}' ends unexpectedly")]
    UnexpectedEnd {
        /// The rule.
        rule: String,
    },

    /// The disjunctive normal form would be too large.
    #[error("Gene rule expands to more than {limit} complexes")]
    TooManyComplexes {
        /// Largest allowed complex count.
        limit: usize,
    },
}

/// Parsed gene rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gpr {
    /// A single gene id.
    Gene(String),
    /// All operands required.
    And(Vec<Gpr>),
    /// Any operand suffices.
    Or(Vec<Gpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Gene(String),
}

fn tokenize(rule: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if word.is_empty() {
            return;
        }
        let token = match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            _ => Token::Gene(word.clone()),
        };
        tokens.push(token);
        word.clear();
    };
    for ch in rule.chars() {
        match ch {
            '(' | ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(if ch == '(' { Token::Open } else { Token::Close });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    rule: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn unexpected(&self, token: &Token) -> GprError {
        let token = match token {
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
            Token::And => "and".to_string(),
            Token::Or => "or".to_string(),
            Token::Gene(g) => g.clone(),
        };
        GprError::UnexpectedToken {
            token,
            rule: self.rule.to_string(),
        }
    }

    fn expr(&mut self) -> Result<Gpr, GprError> {
        let mut terms = vec![self.term()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.term()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Gpr::Or(terms) })
    }

    fn term(&mut self) -> Result<Gpr, GprError> {
        let mut factors = vec![self.factor()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            factors.push(self.factor()?);
        }
        Ok(if factors.len() == 1 { factors.remove(0) } else { Gpr::And(factors) })
    }

    fn factor(&mut self) -> Result<Gpr, GprError> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(GprError::UnexpectedEnd {
                rule: self.rule.to_string(),
            });
        };
        self.pos += 1;
        match token {
            Token::Gene(id) => Ok(Gpr::Gene(id)),
            Token::Open => {
                let inner = self.expr()?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(GprError::UnbalancedParenthesis {
                        rule: self.rule.to_string(),
                    }),
                }
            }
            other => Err(self.unexpected(&other)),
        }
    }
}

impl Gpr {
    /// Parses a rule. An empty or blank rule yields `Ok(None)`.
    pub fn parse(rule: &str) -> Result<Option<Self>, GprError> {
        let tokens = tokenize(rule);
        if tokens.is_empty() {
            return Ok(None);
        }
        let mut parser = Parser { tokens, pos: 0, rule };
        let gpr = parser.expr()?;
        match parser.peek().cloned() {
            None => Ok(Some(gpr)),
            Some(Token::Close) => Err(GprError::UnbalancedParenthesis { rule: rule.to_string() }),
            Some(other) => Err(parser.unexpected(&other)),
        }
    }

    /// Gene ids in order of first appearance.
    #[must_use]
    pub fn genes(&self) -> Vec<&str> {
        let mut out: IndexSet<&str> = IndexSet::new();
        self.collect_genes(&mut out);
        out.into_iter().collect()
    }

    fn collect_genes<'a>(&'a self, out: &mut IndexSet<&'a str>) {
        match self {
            Self::Gene(id) => {
                out.insert(id);
            }
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_genes(out);
                }
            }
        }
    }

    /// Rewrites gene ids; `None` from `f` removes the gene.
    ///
    /// Operators left without operands disappear; an operator left with
    /// one operand collapses into it.
    #[must_use]
    pub fn substitute<F>(&self, f: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::Gene(id) => f(id).map(Self::Gene),
            Self::And(children) | Self::Or(children) => {
                let mut kept: Vec<Self> = children.iter().filter_map(|c| c.substitute(f)).collect();
                match kept.len() {
                    0 => None,
                    1 => kept.pop(),
                    _ if matches!(self, Self::And(_)) => Some(Self::And(kept)),
                    _ => Some(Self::Or(kept)),
                }
            }
        }
    }

    /// Disjunctive normal form: deduplicated complexes, each sorted.
    ///
    /// # Errors
    /// The expansion grows past [`MAX_COMPLEXES`].
    pub fn complexes(&self) -> Result<Vec<Vec<String>>, GprError> {
        let too_many = || GprError::TooManyComplexes { limit: MAX_COMPLEXES };
        let raw = match self {
            Self::Gene(id) => vec![vec![id.clone()]],
            Self::Or(children) => {
                let mut out = Vec::new();
                for child in children {
                    out.extend(child.complexes()?);
                    if out.len() > MAX_COMPLEXES {
                        return Err(too_many());
                    }
                }
                out
            }
            Self::And(children) => {
                let mut acc: Vec<Vec<String>> = vec![Vec::new()];
                for child in children {
                    let child_complexes = child.complexes()?;
                    if acc.len().saturating_mul(child_complexes.len()) > MAX_COMPLEXES {
                        return Err(too_many());
                    }
                    let mut next = Vec::with_capacity(acc.len() * child_complexes.len());
                    for left in &acc {
                        for right in &child_complexes {
                            let mut merged = left.clone();
                            merged.extend(right.iter().cloned());
                            next.push(merged);
                        }
                    }
                    acc = next;
                }
                acc
            }
        };
        Ok(normalize_complexes(raw))
    }

    /// Builds `c1 or c2 or ...` from complexes. Empty input yields `None`.
    #[must_use]
    pub fn from_complexes(complexes: &[Vec<String>]) -> Option<Self> {
        let mut terms: Vec<Self> = complexes
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| {
                if c.len() == 1 {
                    Self::Gene(c[0].clone())
                } else {
                    Self::And(c.iter().cloned().map(Self::Gene).collect())
                }
            })
            .collect();
        match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Self::Or(terms)),
        }
    }
}

pub(crate) fn normalize_complexes(raw: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut seen: IndexSet<Vec<String>> = IndexSet::new();
    for mut complex in raw {
        complex.sort();
        complex.dedup();
        seen.insert(complex);
    }
    seen.into_iter().collect()
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gene(id) => f.write_str(id),
            Self::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    match child {
                        Self::Or(_) => write!(f, "({child})")?,
                        _ => write!(f, "{child}")?,
                    }
                }
                Ok(())
            }
            Self::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    match child {
                        Self::And(_) => write!(f, "({child})")?,
                        _ => write!(f, "{child}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Substitutes gene ids in a rule.
///
/// Returns the fully translated rule (genes translated to [`NOT_FOUND`]
/// dropped; `None` if nothing remains) and the mixed rule, where those
/// genes keep their old id with [`UNTRANSLATED_SUFFIX`]. Genes absent from
/// `substitution` are kept unchanged in both.
pub fn rewrite_rule(
    old_rule: &str,
    substitution: &IndexMap<String, String>,
) -> Result<(Option<String>, String), GprError> {
    let Some(parsed) = Gpr::parse(old_rule)? else {
        return Ok((None, String::new()));
    };
    let translated = parsed.substitute(&|g: &str| match substitution.get(g) {
        Some(new_id) if new_id == NOT_FOUND => None,
        Some(new_id) => Some(new_id.clone()),
        None => Some(g.to_string()),
    });
    let mixed = parsed.substitute(&|g: &str| match substitution.get(g) {
        Some(new_id) if new_id == NOT_FOUND => Some(format!("{g}{UNTRANSLATED_SUFFIX}")),
        Some(new_id) => Some(new_id.clone()),
        None => Some(g.to_string()),
    });
    Ok((
        translated.map(|r| r.to_string()),
        mixed.map(|r| r.to_string()).unwrap_or_default(),
    ))
}

/// Unites rules with `or`, in disjunctive normal form without duplicate complexes.
pub fn union_rules<S: AsRef<str>>(rules: &[S]) -> Result<Option<String>, GprError> {
    let mut complexes = Vec::new();
    for rule in rules {
        if let Some(parsed) = Gpr::parse(rule.as_ref())? {
            complexes.extend(parsed.complexes()?);
        }
    }
    let complexes = normalize_complexes(complexes);
    Ok(Gpr::from_complexes(&complexes).map(|g| g.to_string()))
}
