//! Named selectors from `selectors.yml`
//!
//! ```yaml
//! selectors:
//!   - name: nightly_models
//!     description: everything tagged nightly, minus the slow ones
//!     definition:
//!       union:
//!         - method: tag
//!           value: nightly
//!           children: true
//!         - exclude:
//!             - tag: slow
//! ```

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::criteria::SelectionCriteria;
use crate::error::SelectionError;
use crate::spec::SelectionSpec;

/// One named selector
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorDefinition {
    pub name: String,
    pub description: Option<String>,
    pub definition: SelectionSpec,
}

#[derive(Debug, Deserialize)]
struct SelectorFile {
    #[serde(default)]
    selectors: Vec<RawSelector>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSelector {
    name: String,
    #[serde(default)]
    description: Option<String>,
    definition: Value,
}

/// Every selector a project defines, by name
#[derive(Debug, Clone, Default)]
pub struct SelectorConfig {
    selectors: BTreeMap<String, SelectorDefinition>,
}

impl SelectorConfig {
    /// Load and parse a selectors file
    pub fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SelectionError::SelectorFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_yaml(&contents).map_err(|e| match e {
            SelectionError::SelectorFile { message, .. } => SelectionError::SelectorFile {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Like [`SelectorConfig::from_path`], but a missing file means no selectors
    pub fn load_optional(path: &Path) -> Result<Self, SelectionError> {
        if path.exists() {
            Self::from_path(path)
        } else {
            tracing::debug!(path = %path.display(), "no selectors file");
            Ok(Self::default())
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SelectionError> {
        let file: SelectorFile = serde_yaml::from_str(yaml).map_err(|e| SelectionError::SelectorFile {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;

        let mut selectors = BTreeMap::new();
        for raw in file.selectors {
            let definition = parse_from_definition(&raw.definition).map_err(|e| name_error(e, &raw.name))?;
            if selectors.contains_key(&raw.name) {
                return Err(SelectionError::InvalidDefinition {
                    name: Some(raw.name),
                    message: "Found duplicate selector name".to_string(),
                });
            }
            selectors.insert(
                raw.name.clone(),
                SelectorDefinition {
                    name: raw.name,
                    description: raw.description,
                    definition,
                },
            );
        }

        Ok(Self { selectors })
    }

    pub fn get(&self, name: &str) -> Result<&SelectorDefinition, SelectionError> {
        self.selectors
            .get(name)
            .ok_or_else(|| SelectionError::UnknownSelector(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectorDefinition> {
        self.selectors.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.selectors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

fn name_error(error: SelectionError, name: &str) -> SelectionError {
    match error {
        SelectionError::InvalidDefinition { name: None, message } => SelectionError::InvalidDefinition {
            name: Some(name.to_string()),
            message,
        },
        other => other,
    }
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

fn keys_of(mapping: &Mapping) -> String {
    mapping
        .keys()
        .map(|k| k.as_str().map(str::to_string).unwrap_or_else(|| render(k)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the `definition:` of a named selector. A root-level group warns
/// when it selects nothing.
pub fn parse_from_definition(definition: &Value) -> Result<SelectionSpec, SelectionError> {
    if let Value::Sequence(_) = definition {
        return Err(SelectionError::definition(format!(
            "Valid root-level selector definitions are strings or dictionaries with a single \
             'union' or 'intersection' key, got a list:\n{}",
            render(definition)
        )));
    }

    let mut spec = parse_definition(definition)?;
    spec.set_expect_exists(true);
    Ok(spec)
}

fn parse_definition(definition: &Value) -> Result<SelectionSpec, SelectionError> {
    match definition {
        Value::String(raw) => Ok(SelectionCriteria::from_single_spec(raw)?.into()),
        Value::Mapping(mapping) => {
            let set_operation = ["union", "intersection"]
                .into_iter()
                .find(|key| mapping.contains_key(*key));
            match set_operation {
                Some(_) if mapping.len() > 1 => Err(SelectionError::definition(format!(
                    "Only a single 'union' or 'intersection' key is allowed in a selector set \
                     operation; found {}",
                    keys_of(mapping)
                ))),
                Some("union") => parse_set_definition(definition, "union"),
                Some(_) => parse_set_definition(definition, "intersection"),
                None => parse_dict_definition(mapping, definition),
            }
        }
        other => Err(SelectionError::definition(format!(
            "Expected to find union, intersection, str or dict, instead found {}",
            render(other)
        ))),
    }
}

fn get_list<'v>(definition: &'v Value, key: &str) -> Result<&'v [Value], SelectionError> {
    match definition.get(key) {
        Some(Value::Sequence(items)) => Ok(items),
        Some(other) => Err(SelectionError::definition(format!(
            "Invalid value for key \"{}\". Expected a list, got: {}",
            key,
            render(other)
        ))),
        None => Err(SelectionError::definition(format!(
            "Expected to find key \"{}\" in {}",
            key,
            render(definition)
        ))),
    }
}

/// `exclude:` lists become a single spec: the lone entry, or a union of them
fn parse_exclusions(definition: &Value) -> Result<SelectionSpec, SelectionError> {
    let exclusions = get_list(definition, "exclude")?;
    let mut parsed = exclusions
        .iter()
        .map(parse_definition)
        .collect::<Result<Vec<_>, _>>()?;

    if parsed.len() == 1 {
        Ok(parsed.remove(0))
    } else {
        Ok(SelectionSpec::union(parsed, false, render(definition)))
    }
}

fn parse_set_definition(definition: &Value, key: &str) -> Result<SelectionSpec, SelectionError> {
    let parts = get_list(definition, key)?;
    let mut include = Vec::with_capacity(parts.len());
    let mut exclude = None;

    for part in parts {
        if part.get("exclude").is_some() {
            if exclude.is_some() {
                return Err(SelectionError::definition(format!(
                    "You cannot provide multiple exclude arguments to the same selector set operator:\n{}",
                    render(definition)
                )));
            }
            exclude = Some(parse_exclusions(part)?);
        } else {
            include.push(parse_definition(part)?);
        }
    }

    let raw = render(definition);
    let group = if key == "union" {
        SelectionSpec::union(include, false, raw.clone())
    } else {
        SelectionSpec::intersection(include, false, raw.clone())
    };

    Ok(match exclude {
        None => group,
        Some(excluded) => SelectionSpec::difference(vec![group, excluded], false, raw),
    })
}

/// `{tag: nightly}` shorthand, or the full `{method: ..., value: ...}` form
/// with an optional `exclude:` list
fn parse_dict_definition(mapping: &Mapping, definition: &Value) -> Result<SelectionSpec, SelectionError> {
    let raw = render(definition);

    if mapping.len() == 1 {
        let Some((key, value)) = mapping.iter().next() else {
            return Err(SelectionError::definition("Empty selector definition"));
        };
        if key.as_str() == Some("value") {
            return Ok(SelectionCriteria::from_dict(&raw, mapping)?.into());
        }
        let method = key.as_str().ok_or_else(|| {
            SelectionError::definition(format!("Expected a method name as key, got {}", render(key)))
        })?;

        let mut normalized = Mapping::new();
        normalized.insert(Value::from("method"), Value::from(method));
        normalized.insert(Value::from("value"), value.clone());
        return Ok(SelectionCriteria::from_dict(&raw, &normalized)?.into());
    }

    if !(mapping.contains_key("method") && mapping.contains_key("value")) {
        return Err(SelectionError::definition(format!(
            "Expected either 1 key or else \"method\" and \"value\" keys, but got {}",
            raw
        )));
    }

    if mapping.contains_key("exclude") {
        let excluded = parse_exclusions(definition)?;
        let mut criteria = mapping.clone();
        criteria.remove("exclude");
        let base = SelectionCriteria::from_dict(&raw, &criteria)?;
        return Ok(SelectionSpec::difference(vec![base.into(), excluded], false, raw));
    }

    Ok(SelectionCriteria::from_dict(&raw, mapping)?.into())
}
