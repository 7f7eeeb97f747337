/// Weighted stochastic templates for display text: parsing, loading,
/// and expansion.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Nested rule references deeper than this are treated as a loop.
const MAX_DEPTH: usize = 12;

#[derive(Debug, Error)]
pub enum ProseError {
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("rule not found: {0}")]
    RuleNotFound(String),
    #[error("rule '{0}' has no selectable alternatives")]
    EmptyRule(String),
    #[error("field not provided: {0}")]
    MissingField(String),
    #[error("expansion too deep at rule '{0}'")]
    TooDeep(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Reference to another rule: `{rule_name}`.
    RuleRef(String),
    /// Caller-supplied value: `{entity.field}`.
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    ///
    /// `{name}` is a rule reference, `{entity.field}` a field, and `{{` /
    /// `}}` are literal braces.
    pub fn parse(input: &str) -> Result<Template, ProseError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut content = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(ProseError::TemplateParse(
                                    "nested braces are not allowed".to_string(),
                                ))
                            }
                            other => content.push(other),
                        }
                    }
                    if !closed {
                        return Err(ProseError::TemplateParse("unclosed brace".to_string()));
                    }
                    if content.is_empty() {
                        return Err(ProseError::TemplateParse("empty braces".to_string()));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Self::parse_segment(&content)?);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(ProseError::TemplateParse(
                        "unmatched closing brace".to_string(),
                    ))
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Template { segments })
    }

    fn parse_segment(content: &str) -> Result<Segment, ProseError> {
        if let Some(field) = content.strip_prefix("entity.") {
            if field.is_empty() {
                return Err(ProseError::TemplateParse("empty entity field name".to_string()));
            }
            return Ok(Segment::Field(field.to_string()));
        }
        Ok(Segment::RuleRef(content.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub weight: u32,
    pub template: Template,
}

/// Named rules, each a list of weighted alternatives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProseGrammar {
    pub rules: FxHashMap<String, Vec<Alternative>>,
}

#[derive(Debug, Deserialize)]
struct RonAlternative {
    weight: u32,
    text: String,
}

impl ProseGrammar {
    pub fn load_from_ron(path: &Path) -> Result<ProseGrammar, ProseError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<ProseGrammar, ProseError> {
        let raw: FxHashMap<String, Vec<RonAlternative>> = ron::from_str(input)?;
        let mut rules = FxHashMap::default();
        for (name, alts) in raw {
            let alternatives = alts
                .into_iter()
                .map(|alt| {
                    Ok(Alternative {
                        weight: alt.weight,
                        template: Template::parse(&alt.text)?,
                    })
                })
                .collect::<Result<Vec<_>, ProseError>>()?;
            rules.insert(name, alternatives);
        }
        Ok(ProseGrammar { rules })
    }

    /// The bundled heist grammar.
    pub fn heist_default() -> Result<ProseGrammar, ProseError> {
        Self::parse_ron(include_str!("../../scenario_data/heist/prose.ron"))
    }

    /// Rules from `other` replace rules of the same name.
    pub fn merge(&mut self, other: ProseGrammar) {
        self.rules.extend(other.rules);
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Expand `rule` with `fields` supplying `{entity.*}` values.
    pub fn expand(
        &self,
        rule: &str,
        fields: &[(&str, &str)],
        rng: &mut StdRng,
    ) -> Result<String, ProseError> {
        let mut out = String::new();
        self.expand_into(rule, fields, rng, 0, &mut out)?;
        Ok(out)
    }

    fn expand_into(
        &self,
        rule: &str,
        fields: &[(&str, &str)],
        rng: &mut StdRng,
        depth: usize,
        out: &mut String,
    ) -> Result<(), ProseError> {
        if depth > MAX_DEPTH {
            return Err(ProseError::TooDeep(rule.to_string()));
        }
        let alternatives = self
            .rules
            .get(rule)
            .ok_or_else(|| ProseError::RuleNotFound(rule.to_string()))?;
        let dist = WeightedIndex::new(alternatives.iter().map(|a| a.weight))
            .map_err(|_| ProseError::EmptyRule(rule.to_string()))?;
        let chosen = &alternatives[dist.sample(rng)];

        for segment in &chosen.template.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::RuleRef(name) => self.expand_into(name, fields, rng, depth + 1, out)?,
                Segment::Field(name) => {
                    let value = fields
                        .iter()
                        .find(|(key, _)| *key == name.as_str())
                        .map(|(_, value)| *value)
                        .ok_or_else(|| ProseError::MissingField(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(())
    }
}
