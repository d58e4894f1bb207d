//! Matcher / Alerter / Rule engine.
//!
//! Matchers and alerters are tagged-variant enums (no `dyn Matcher`/
//! `dyn Alerter`) compiled from a generic `toml::Value` tree under
//! `filters`/`destinations`/`rules`.
//!
//! Range matchers use the comparison operator implied by the field-name
//! suffix (`_lt`/`_gt`/bare) directly, rather than silently ignoring it.
//! Any `if`/`then` name that doesn't resolve against the matcher/alerter
//! maps is a hard `RuleError` at startup, never a silently-skipped entry.

use crate::error::RuleError;
use gelf_common::Message;
use regex::Regex;

/// The GELF field a matcher inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Host,
    Facility,
    Level,
}

/// The comparison implied by a range matcher's field-name suffix:
/// `_lt` → `Lt`, `_gt` → `Gt`, no suffix → `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Lt,
    Gt,
    Eq,
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Regex { field: Field, re: Regex },
    Range { field: Field, op: RangeOp, threshold: i64 },
}

impl Matcher {
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Matcher::Regex { field, re } => {
                let value = match field {
                    Field::Host => message.host.as_str(),
                    Field::Facility => message.facility.as_str(),
                    Field::Level => return false,
                };
                re.is_match(value)
            }
            Matcher::Range { field, op, threshold } => {
                let value = match field {
                    Field::Level => message.level,
                    _ => return false,
                };
                match op {
                    RangeOp::Lt => value < *threshold,
                    RangeOp::Gt => value > *threshold,
                    RangeOp::Eq => value == *threshold,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Alerter {
    Email { to: Vec<String> },
    Sms { to: Vec<String> },
    IssueTracker { destination: String },
}

/// A compiled rule: AND over `if_matchers`, fan-out over `then_alerters`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub if_matchers: Vec<Matcher>,
    pub then_alerters: Vec<Alerter>,
}

impl Rule {
    /// An empty `if` list never matches — an unconditional rule would be
    /// a likely misconfiguration, not a deliberate "always fire".
    pub fn matches(&self, message: &Message) -> bool {
        if self.if_matchers.is_empty() {
            return false;
        }
        self.if_matchers.iter().all(|m| m.matches(message))
    }
}

fn field_from_name(name: &str) -> Option<(Field, &str)> {
    if let Some(base) = name.strip_suffix("_lt") {
        Some((field_by_base(base)?, base))
    } else if let Some(base) = name.strip_suffix("_gt") {
        Some((field_by_base(base)?, base))
    } else {
        Some((field_by_base(name)?, name))
    }
}

fn field_by_base(base: &str) -> Option<Field> {
    match base {
        "host" => Some(Field::Host),
        "facility" => Some(Field::Facility),
        "level" => Some(Field::Level),
        _ => None,
    }
}

fn range_op_for(name: &str) -> RangeOp {
    if name.ends_with("_lt") {
        RangeOp::Lt
    } else if name.ends_with("_gt") {
        RangeOp::Gt
    } else {
        RangeOp::Eq
    }
}

fn subtable<'a>(tree: &'a toml::Value, name: &str) -> Option<&'a toml::map::Map<String, toml::Value>> {
    tree.get(name)?.as_table()
}

/// Compile the `filters` subtree into a name → `Matcher` map.
fn build_matchers(tree: &toml::Value) -> Result<std::collections::HashMap<String, Matcher>, RuleError> {
    let mut matchers = std::collections::HashMap::new();
    let Some(filters) = subtable(tree, "filters") else {
        return Ok(matchers);
    };

    for (name, entry) in filters {
        let entry_table = entry
            .as_table()
            .ok_or_else(|| RuleError::Malformed(format!("filters.{name} is not a table")))?;
        let (field_key, value) = entry_table
            .iter()
            .next()
            .ok_or_else(|| RuleError::Malformed(format!("filters.{name} has no field")))?;

        let matcher = match value {
            toml::Value::String(pattern) => {
                let (field, _) = field_from_name(field_key).ok_or_else(|| RuleError::UnknownMatcherKind {
                    name: name.clone(),
                    kind: field_key.clone(),
                })?;
                let re = Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
                    name: name.clone(),
                    source,
                })?;
                Matcher::Regex { field, re }
            }
            toml::Value::Integer(threshold) => {
                let (field, _) = field_from_name(field_key).ok_or_else(|| RuleError::UnknownMatcherKind {
                    name: name.clone(),
                    kind: field_key.clone(),
                })?;
                Matcher::Range { field, op: range_op_for(field_key), threshold: *threshold }
            }
            _ => {
                return Err(RuleError::UnknownMatcherKind { name: name.clone(), kind: field_key.clone() });
            }
        };
        matchers.insert(name.clone(), matcher);
    }
    Ok(matchers)
}

fn string_list(value: &toml::Value) -> Option<Vec<String>> {
    match value {
        toml::Value::String(s) => Some(vec![s.clone()]),
        toml::Value::Array(items) => items.iter().map(|v| v.as_str().map(String::from)).collect(),
        _ => None,
    }
}

/// Compile the `destinations` subtree into a name → `Alerter` map.
fn build_alerters(tree: &toml::Value) -> Result<std::collections::HashMap<String, Alerter>, RuleError> {
    let mut alerters = std::collections::HashMap::new();
    let Some(destinations) = subtable(tree, "destinations") else {
        return Ok(alerters);
    };

    for (name, entry) in destinations {
        let entry_table = entry
            .as_table()
            .ok_or_else(|| RuleError::Malformed(format!("destinations.{name} is not a table")))?;

        let alerter = if let Some(to) = entry_table.get("email").and_then(string_list) {
            Alerter::Email { to }
        } else if let Some(to) = entry_table.get("sms").and_then(string_list) {
            Alerter::Sms { to }
        } else if let Some(destination) = entry_table.get("mantis").and_then(|v| v.as_str()) {
            Alerter::IssueTracker { destination: destination.to_string() }
        } else {
            return Err(RuleError::UnknownDestinationKind {
                name: name.clone(),
                kind: entry_table.keys().next().cloned().unwrap_or_default(),
            });
        };
        alerters.insert(name.clone(), alerter);
    }
    Ok(alerters)
}

/// Compile the `rules` subtree, resolving every `if`/`then` name against
/// the matcher/alerter maps. Any unresolved name is a hard `RuleError`.
pub fn build(tree: &toml::Value) -> Result<Vec<Rule>, RuleError> {
    let matchers = build_matchers(tree)?;
    let alerters = build_alerters(tree)?;

    let Some(rules_table) = subtable(tree, "rules") else {
        return Ok(Vec::new());
    };

    let mut rules = Vec::with_capacity(rules_table.len());
    for (name, entry) in rules_table {
        let entry_table = entry
            .as_table()
            .ok_or_else(|| RuleError::Malformed(format!("rules.{name} is not a table")))?;

        let if_names = entry_table.get("if").and_then(string_list).unwrap_or_default();
        let then_names = entry_table.get("then").and_then(string_list).unwrap_or_default();

        let mut if_matchers = Vec::with_capacity(if_names.len());
        for matcher_name in &if_names {
            let matcher = matchers.get(matcher_name).cloned().ok_or_else(|| RuleError::UnknownMatcher {
                rule: name.clone(),
                name: matcher_name.clone(),
            })?;
            if_matchers.push(matcher);
        }

        let mut then_alerters = Vec::with_capacity(then_names.len());
        for dest_name in &then_names {
            let alerter = alerters.get(dest_name).cloned().ok_or_else(|| RuleError::UnknownDestination {
                rule: name.clone(),
                name: dest_name.clone(),
            })?;
            then_alerters.push(alerter);
        }

        rules.push(Rule { name: name.clone(), if_matchers, then_alerters });
    }
    Ok(rules)
}
