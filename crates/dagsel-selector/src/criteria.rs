//! Single selector token parsing
//!
//! Grammar: `['@'] [<digits>'+'] [<method>[.<arg>]*':'] <value> ['+'[<digits>]]`

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

use dagsel_dbt::Traversal;
use crate::error::SelectionError;
use crate::methods::MethodName;

const SELECTOR_METHOD_SEPARATOR: char = '.';

fn raw_selector_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\A(?P<childrens_parents>@)?(?P<parents>(?P<parents_depth>[0-9]*)\+)?(?:(?P<method>[\w.]+):)?(?P<value>.*?)(?P<children>\+(?P<children_depth>[0-9]*))?\z",
        )
        .expect("selector pattern is a valid regex")
    })
}

/// Decide if a value is probably a path. Windows has two separators.
fn probably_path(value: &str) -> bool {
    value.contains(std::path::MAIN_SEPARATOR) || (cfg!(windows) && value.contains('/'))
}

/// Empty digits mean "unbounded"
fn parse_depth(raw: &str, digits: Option<&str>) -> Result<Option<usize>, SelectionError> {
    match digits {
        None | Some("") => Ok(None),
        Some(digits) => digits
            .parse::<usize>()
            .map(Some)
            .map_err(|_| SelectionError::InvalidDepth {
                raw: raw.to_string(),
                depth: digits.to_string(),
            }),
    }
}

/// One parsed selector: a method, its value, and the graph expansions around it
#[derive(Debug, Clone, Eq)]
pub struct SelectionCriteria {
    /// The text this criteria was parsed from
    pub raw: String,
    pub method: MethodName,
    /// Dotted sub-keys, e.g. `["materialized"]` for `config.materialized`
    pub method_arguments: Vec<String>,
    pub value: String,
    pub select_childrens_parents: bool,
    pub select_parents: bool,
    pub select_parents_max_depth: Option<usize>,
    pub select_children: bool,
    pub select_children_max_depth: Option<usize>,
}

/// `raw` records provenance only: the textual and YAML spellings of the same
/// selector compare equal.
impl PartialEq for SelectionCriteria {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.method_arguments == other.method_arguments
            && self.value == other.value
            && self.select_childrens_parents == other.select_childrens_parents
            && self.select_parents == other.select_parents
            && self.select_parents_max_depth == other.select_parents_max_depth
            && self.select_children == other.select_children
            && self.select_children_max_depth == other.select_children_max_depth
    }
}

#[derive(Debug, Default)]
struct Modifiers {
    childrens_parents: bool,
    parents: bool,
    parents_depth: Option<usize>,
    children: bool,
    children_depth: Option<usize>,
}

impl Modifiers {
    fn check(&self, raw: &str) -> Result<(), SelectionError> {
        if self.children && self.childrens_parents {
            return Err(SelectionError::IncompatibleModifiers(raw.to_string()));
        }
        Ok(())
    }
}

impl SelectionCriteria {
    /// Method used when a selector names none: `path` for values that look
    /// like paths, `fqn` otherwise
    pub fn default_method(value: &str) -> MethodName {
        if probably_path(value) {
            MethodName::Path
        } else {
            MethodName::Fqn
        }
    }

    /// Split `config.materialized` into the method and its arguments
    pub fn parse_method(
        raw: &str,
        method: Option<&str>,
        value: &str,
    ) -> Result<(MethodName, Vec<String>), SelectionError> {
        let Some(method) = method else {
            return Ok((Self::default_method(value), Vec::new()));
        };

        let mut parts = method.split(SELECTOR_METHOD_SEPARATOR);
        let name = parts.next().unwrap_or_default();
        let method_name = name.parse::<MethodName>().map_err(|_| SelectionError::InvalidSelector {
            raw: raw.to_string(),
            method: name.to_string(),
        })?;

        Ok((method_name, parts.map(str::to_string).collect()))
    }

    /// Parse one selector token such as `2+tag:nightly+` or `@models/staging`
    pub fn from_single_spec(raw: &str) -> Result<Self, SelectionError> {
        let captures = raw_selector_pattern()
            .captures(raw)
            .ok_or_else(|| SelectionError::MalformedSpec(raw.to_string()))?;

        let group = |name: &str| captures.name(name).map(|m| m.as_str());

        let mut modifiers = Modifiers {
            childrens_parents: group("childrens_parents").is_some(),
            parents: group("parents").is_some(),
            children: group("children").is_some(),
            ..Modifiers::default()
        };
        modifiers.check(raw)?;
        modifiers.parents_depth = parse_depth(raw, group("parents_depth"))?;
        modifiers.children_depth = parse_depth(raw, group("children_depth"))?;

        let value = group("value").unwrap_or_default();
        let (method, method_arguments) = Self::parse_method(raw, group("method"), value)?;

        Ok(Self::from_parts(raw, method, method_arguments, value.to_string(), modifiers))
    }

    /// Build from the YAML mapping form:
    /// `{method: tag, value: nightly, parents: true, children_depth: 2}`
    pub fn from_dict(raw: &str, dict: &Mapping) -> Result<Self, SelectionError> {
        let mut method = None;
        let mut value = None;
        let mut modifiers = Modifiers::default();

        for (key, item) in dict {
            let key = key
                .as_str()
                .ok_or_else(|| SelectionError::definition(format!("Expected a string key in {}", raw)))?;
            match key {
                "method" => method = Some(yaml_scalar(item, raw, key)?),
                "value" => value = Some(yaml_scalar(item, raw, key)?),
                "childrens_parents" => modifiers.childrens_parents = yaml_bool(item, raw, key)?,
                "parents" => modifiers.parents = yaml_bool(item, raw, key)?,
                "children" => modifiers.children = yaml_bool(item, raw, key)?,
                "parents_depth" => {
                    modifiers.parents_depth = parse_depth(raw, Some(&yaml_scalar(item, raw, key)?))?
                }
                "children_depth" => {
                    modifiers.children_depth = parse_depth(raw, Some(&yaml_scalar(item, raw, key)?))?
                }
                other => {
                    return Err(SelectionError::definition(format!(
                        "Unexpected key \"{}\" in selector {}",
                        other, raw
                    )))
                }
            }
        }

        let value = value.ok_or_else(|| {
            SelectionError::definition(format!("Invalid node spec \"{}\" - no search value!", raw))
        })?;
        modifiers.check(raw)?;

        let (method, method_arguments) = Self::parse_method(raw, method.as_deref(), &value)?;

        Ok(Self::from_parts(raw, method, method_arguments, value, modifiers))
    }

    fn from_parts(
        raw: &str,
        method: MethodName,
        method_arguments: Vec<String>,
        value: String,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            raw: raw.to_string(),
            method,
            method_arguments,
            value,
            select_childrens_parents: modifiers.childrens_parents,
            select_parents: modifiers.parents,
            select_parents_max_depth: modifiers.parents_depth,
            select_children: modifiers.children,
            select_children_max_depth: modifiers.children_depth,
        }
    }

    /// The graph expansions this criteria asks for
    pub fn traversal(&self) -> Traversal {
        Traversal {
            parents: self.select_parents,
            parents_max_depth: self.select_parents_max_depth,
            children: self.select_children,
            children_max_depth: self.select_children_max_depth,
            childrens_parents: self.select_childrens_parents,
        }
    }
}

fn yaml_scalar(value: &Value, raw: &str, key: &str) -> Result<String, SelectionError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(SelectionError::definition(format!(
            "Expected a string for \"{}\" in selector {}",
            key, raw
        ))),
    }
}

fn yaml_bool(value: &Value, raw: &str, key: &str) -> Result<bool, SelectionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Value::Null => Ok(false),
        _ => Err(SelectionError::definition(format!(
            "Expected a boolean for \"{}\" in selector {}",
            key, raw
        ))),
    }
}

/// Canonical text form; always spells the method out
impl std::fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.select_childrens_parents {
            f.write_str("@")?;
        }
        if self.select_parents {
            if let Some(depth) = self.select_parents_max_depth {
                write!(f, "{}", depth)?;
            }
            f.write_str("+")?;
        }
        write!(f, "{}", self.method)?;
        for argument in &self.method_arguments {
            write!(f, "{}{}", SELECTOR_METHOD_SEPARATOR, argument)?;
        }
        write!(f, ":{}", self.value)?;
        if self.select_children {
            f.write_str("+")?;
            if let Some(depth) = self.select_children_max_depth {
                write!(f, "{}", depth)?;
            }
        }
        Ok(())
    }
}
