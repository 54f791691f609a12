//! Selection spec tree: criteria leaves combined by set operations

use std::collections::BTreeSet;
use std::fmt;

use dagsel_dbt::UniqueId;
use crate::criteria::SelectionCriteria;

/// How a group combines the results of its components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    Union,
    Intersection,
    /// First component minus every later one
    Difference,
}

impl SetOperation {
    /// Combine component results; no components combine to the empty set
    pub fn combine_selections(&self, selections: Vec<BTreeSet<UniqueId>>) -> BTreeSet<UniqueId> {
        let mut selections = selections.into_iter();
        let Some(first) = selections.next() else {
            return BTreeSet::new();
        };

        match self {
            SetOperation::Union => selections.fold(first, |mut acc, next| {
                acc.extend(next);
                acc
            }),
            SetOperation::Intersection => selections.fold(first, |acc, next| {
                acc.intersection(&next).cloned().collect()
            }),
            SetOperation::Difference => selections.fold(first, |acc, next| {
                acc.difference(&next).cloned().collect()
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperation::Union => "Union",
            SetOperation::Intersection => "Intersection",
            SetOperation::Difference => "Difference",
        }
    }
}

/// Components of a set operation
#[derive(Debug, Clone, Eq)]
pub struct SelectionGroup {
    pub components: Vec<SelectionSpec>,
    /// Warn when this group selects nothing
    pub expect_exists: bool,
    /// Text the group was parsed from, for messages
    pub raw: String,
}

/// `raw` is provenance only and does not take part in equality
impl PartialEq for SelectionGroup {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components && self.expect_exists == other.expect_exists
    }
}

impl SelectionGroup {
    pub fn new(components: Vec<SelectionSpec>, expect_exists: bool, raw: impl Into<String>) -> Self {
        Self {
            components,
            expect_exists,
            raw: raw.into(),
        }
    }
}

/// A node of the selection tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSpec {
    Criteria(SelectionCriteria),
    Union(SelectionGroup),
    Intersection(SelectionGroup),
    Difference(SelectionGroup),
}

impl SelectionSpec {
    pub fn union(components: Vec<SelectionSpec>, expect_exists: bool, raw: impl Into<String>) -> Self {
        Self::Union(SelectionGroup::new(components, expect_exists, raw))
    }

    pub fn intersection(
        components: Vec<SelectionSpec>,
        expect_exists: bool,
        raw: impl Into<String>,
    ) -> Self {
        Self::Intersection(SelectionGroup::new(components, expect_exists, raw))
    }

    pub fn difference(
        components: Vec<SelectionSpec>,
        expect_exists: bool,
        raw: impl Into<String>,
    ) -> Self {
        Self::Difference(SelectionGroup::new(components, expect_exists, raw))
    }

    /// The set operation and its group, or `None` for a criteria leaf
    pub fn operation(&self) -> Option<(SetOperation, &SelectionGroup)> {
        match self {
            SelectionSpec::Criteria(_) => None,
            SelectionSpec::Union(group) => Some((SetOperation::Union, group)),
            SelectionSpec::Intersection(group) => Some((SetOperation::Intersection, group)),
            SelectionSpec::Difference(group) => Some((SetOperation::Difference, group)),
        }
    }

    pub(crate) fn set_expect_exists(&mut self, expect_exists: bool) {
        match self {
            SelectionSpec::Criteria(_) => {}
            SelectionSpec::Union(group)
            | SelectionSpec::Intersection(group)
            | SelectionSpec::Difference(group) => group.expect_exists = expect_exists,
        }
    }

    /// The text this node was parsed from
    pub fn raw(&self) -> &str {
        match self {
            SelectionSpec::Criteria(criteria) => &criteria.raw,
            SelectionSpec::Union(group)
            | SelectionSpec::Intersection(group)
            | SelectionSpec::Difference(group) => &group.raw,
        }
    }

    /// Every criteria leaf, left to right
    pub fn criteria(&self) -> Vec<&SelectionCriteria> {
        match self {
            SelectionSpec::Criteria(criteria) => vec![criteria],
            SelectionSpec::Union(group)
            | SelectionSpec::Intersection(group)
            | SelectionSpec::Difference(group) => {
                group.components.iter().flat_map(|c| c.criteria()).collect()
            }
        }
    }
}

impl From<SelectionCriteria> for SelectionSpec {
    fn from(criteria: SelectionCriteria) -> Self {
        SelectionSpec::Criteria(criteria)
    }
}

/// `Union(Intersection(fqn:a), Intersection(tag:b))`
impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (operation, group) = match self {
            SelectionSpec::Criteria(criteria) => return write!(f, "{}", criteria),
            SelectionSpec::Union(group) => (SetOperation::Union, group),
            SelectionSpec::Intersection(group) => (SetOperation::Intersection, group),
            SelectionSpec::Difference(group) => (SetOperation::Difference, group),
        };

        write!(f, "{}(", operation.as_str())?;
        for (i, component) in group.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", component)?;
        }
        f.write_str(")")
    }
}
