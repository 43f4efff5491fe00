use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::constraint::Constraint;
use crate::errors::SemanticError;

/// Source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Repetition suffix on a grammar element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// A quoted terminal string (already unescaped).
    Literal(String),
    /// A `<name>` reference to another rule.
    Reference(String),
    /// A parenthesized sub-alternation.
    Group(Vec<Alternative>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub repeat: Repeat,
}

/// One branch of an alternation: a concatenation of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub elements: Vec<Element>,
    pub span: Span,
}

/// An inline `:= name(args…)` hook. The snippet is never executed by the
/// parser; it is resolved through a generator table at generation time.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHook {
    pub name: String,
    pub args: Vec<f64>,
    pub source: String,
    pub span: Span,
}

/// A single named rule: `<name> ::= alternatives [:= hook]` plus any
/// `where` constraints attached on the following lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub name: String,
    pub alternatives: Vec<Alternative>,
    pub hook: Option<SemanticHook>,
    pub constraints: Vec<Constraint>,
    pub span: Span,
}

/// A parsed grammar: an ordered map of rule name to production. The first
/// rule is the start symbol. Grammar values are immutable; the splicing
/// operations return new versions.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    pub rules: IndexMap<String, Production>,
}

impl Grammar {
    /// The distinguished start non-terminal (the first rule).
    pub fn start(&self) -> &str {
        self.rules
            .get_index(0)
            .map(|(name, _)| name.as_str())
            .unwrap_or("")
    }

    pub fn nonterminals(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Check that references resolve and that every rule can terminate.
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.rules.is_empty() {
            return Err(SemanticError::Empty);
        }
        for production in self.rules.values() {
            for referenced in production_references(production) {
                if !self.rules.contains_key(referenced) {
                    return Err(SemanticError::UndefinedReference {
                        rule: production.name.clone(),
                        referenced: referenced.to_owned(),
                    });
                }
            }
            for constraint in &production.constraints {
                for referenced in constraint.referenced() {
                    if !self.rules.contains_key(referenced) {
                        return Err(SemanticError::UndefinedReference {
                            rule: production.name.clone(),
                            referenced: referenced.to_owned(),
                        });
                    }
                }
            }
        }
        self.check_productive()
    }

    /// Every rule must admit a finite expansion. Hooked rules terminate by
    /// construction; for the rest we run the usual fixpoint over
    /// "some alternative is made of terminating elements".
    fn check_productive(&self) -> Result<(), SemanticError> {
        let mut terminating: HashSet<&str> = self
            .rules
            .values()
            .filter(|p| p.hook.is_some())
            .map(|p| p.name.as_str())
            .collect();
        loop {
            let mut changed = false;
            for production in self.rules.values() {
                if terminating.contains(production.name.as_str()) {
                    continue;
                }
                if production
                    .alternatives
                    .iter()
                    .any(|alt| alternative_terminates(alt, &terminating))
                {
                    terminating.insert(production.name.as_str());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        for name in self.rules.keys() {
            if !terminating.contains(name.as_str()) {
                return Err(SemanticError::Unproductive { rule: name.clone() });
            }
        }
        Ok(())
    }

    /// Transitive closure of rule references: which non-terminals can each
    /// rule eventually expand to. Used by the generator to deprioritize
    /// recursive alternatives near the depth limits.
    pub fn reachability(&self) -> HashMap<String, HashSet<String>> {
        let direct: HashMap<&str, HashSet<&str>> = self
            .rules
            .values()
            .map(|p| (p.name.as_str(), production_references(p)))
            .collect();
        let mut reach: HashMap<String, HashSet<String>> = self
            .rules
            .keys()
            .map(|name| {
                (
                    name.clone(),
                    direct[name.as_str()]
                        .iter()
                        .map(|s| (*s).to_owned())
                        .collect(),
                )
            })
            .collect();
        loop {
            let mut changed = false;
            for name in self.rules.keys() {
                let current: Vec<String> = reach[name].iter().cloned().collect();
                let mut additions: Vec<String> = Vec::new();
                for via in &current {
                    if let Some(next) = reach.get(via) {
                        for target in next {
                            if !reach[name].contains(target) {
                                additions.push(target.clone());
                            }
                        }
                    }
                }
                if !additions.is_empty() {
                    changed = true;
                    if let Some(set) = reach.get_mut(name) {
                        set.extend(additions);
                    }
                }
            }
            if !changed {
                return reach;
            }
        }
    }

    /// Canonical textual rendering, including spliced constraints. Stable
    /// across clones, so it doubles as the hash input for [`fingerprint`].
    ///
    /// [`fingerprint`]: Grammar::fingerprint
    pub fn render(&self) -> String {
        let mut out = String::new();
        for production in self.rules.values() {
            let _ = write!(out, "<{}> ::= ", production.name);
            let alternatives: Vec<String> = production
                .alternatives
                .iter()
                .map(render_alternative)
                .collect();
            out.push_str(&alternatives.join(" | "));
            if let Some(hook) = &production.hook {
                let _ = write!(out, " := {}", hook.source);
            }
            out.push('\n');
            for constraint in &production.constraints {
                let _ = writeln!(out, "where {constraint}");
            }
        }
        out
    }

    /// SHA-256 of the canonical rendering; this is the grammar *version*
    /// used to key input caches and the refinement history.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.render().as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// New grammar version with `constraint` appended to the rule named
    /// `scope`. Referenced non-terminals must exist.
    pub fn with_constraint(
        &self,
        scope: &str,
        constraint: Constraint,
    ) -> Result<Grammar, SemanticError> {
        for referenced in constraint.referenced() {
            if !self.rules.contains_key(referenced) {
                return Err(SemanticError::UnknownRule {
                    name: referenced.to_owned(),
                });
            }
        }
        let mut next = self.clone();
        match next.rules.get_mut(scope) {
            Some(production) => production.constraints.push(constraint),
            None => {
                return Err(SemanticError::UnknownRule {
                    name: scope.to_owned(),
                })
            }
        }
        Ok(next)
    }

    /// New grammar version with the named rule's alternation replaced
    /// (a narrowing splice). Existing constraints on the rule are kept.
    pub fn with_replaced_rule(&self, replacement: Production) -> Result<Grammar, SemanticError> {
        if !self.rules.contains_key(&replacement.name) {
            return Err(SemanticError::UnknownRule {
                name: replacement.name,
            });
        }
        let mut next = self.clone();
        {
            let existing = next
                .rules
                .get_mut(&replacement.name)
                .ok_or(SemanticError::Empty)?;
            existing.alternatives = replacement.alternatives;
            if replacement.hook.is_some() {
                existing.hook = replacement.hook;
            }
        }
        next.validate()?;
        Ok(next)
    }
}

fn alternative_terminates(alt: &Alternative, terminating: &HashSet<&str>) -> bool {
    alt.elements.iter().all(|element| {
        if matches!(element.repeat, Repeat::Optional | Repeat::ZeroOrMore) {
            return true;
        }
        match &element.kind {
            ElementKind::Literal(_) => true,
            ElementKind::Reference(name) => terminating.contains(name.as_str()),
            ElementKind::Group(alts) => alts
                .iter()
                .any(|inner| alternative_terminates(inner, terminating)),
        }
    })
}

fn production_references(production: &Production) -> HashSet<&str> {
    let mut out = HashSet::new();
    for alt in &production.alternatives {
        collect_references(alt, &mut out);
    }
    out
}

fn collect_references<'a>(alt: &'a Alternative, out: &mut HashSet<&'a str>) {
    for element in &alt.elements {
        match &element.kind {
            ElementKind::Reference(name) => {
                out.insert(name.as_str());
            }
            ElementKind::Group(alts) => {
                for inner in alts {
                    collect_references(inner, out);
                }
            }
            ElementKind::Literal(_) => {}
        }
    }
}

fn render_alternative(alt: &Alternative) -> String {
    alt.elements
        .iter()
        .map(render_element)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_element(element: &Element) -> String {
    let base = match &element.kind {
        ElementKind::Literal(text) => format!("\"{}\"", escape_literal(text)),
        ElementKind::Reference(name) => format!("<{name}>"),
        ElementKind::Group(alts) => {
            let inner: Vec<String> = alts.iter().map(render_alternative).collect();
            format!("( {} )", inner.join(" | "))
        }
    };
    match element.repeat {
        Repeat::Once => base,
        Repeat::Optional => format!("{base}?"),
        Repeat::ZeroOrMore => format!("{base}*"),
        Repeat::OneOrMore => format!("{base}+"),
    }
}

pub(crate) fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
