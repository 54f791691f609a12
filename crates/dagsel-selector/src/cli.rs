//! Turning `--select` / `--exclude` arguments into a selection tree
//!
//! Each argument is split on spaces into union members, and each member on
//! commas into an intersection of criteria.

use crate::criteria::SelectionCriteria;
use crate::error::SelectionError;
use crate::spec::SelectionSpec;

pub const UNION_DELIMITER: char = ' ';
pub const INTERSECTION_DELIMITER: char = ',';

/// Selected when no `--select` is given
pub const DEFAULT_INCLUDES: &[&str] = &["fqn:*", "source:*"];
/// Excluded when no `--exclude` is given
pub const DEFAULT_EXCLUDES: &[&str] = &[];

/// Parse a list of select arguments into `Union[Intersection[Criteria..]..]`.
///
/// Runs of spaces do not produce empty members.
pub fn parse_union<S: AsRef<str>>(
    components: &[S],
    expect_exists: bool,
) -> Result<SelectionSpec, SelectionError> {
    let mut union_components = Vec::new();

    for component in components {
        for raw_spec in component.as_ref().split(UNION_DELIMITER) {
            if raw_spec.is_empty() {
                continue;
            }

            let intersection_components = raw_spec
                .split(INTERSECTION_DELIMITER)
                .map(|part| SelectionCriteria::from_single_spec(part).map(SelectionSpec::Criteria))
                .collect::<Result<Vec<_>, _>>()?;

            union_components.push(SelectionSpec::intersection(
                intersection_components,
                expect_exists,
                raw_spec,
            ));
        }
    }

    let raw = components
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(SelectionSpec::union(union_components, expect_exists, raw))
}

/// Parse user arguments, falling back to `default` when none were given.
///
/// An empty or all-blank argument list counts as none given. Defaults never
/// warn about matching nothing.
pub fn parse_union_from_default<S: AsRef<str>>(
    raw: Option<&[S]>,
    default: &[&str],
) -> Result<SelectionSpec, SelectionError> {
    match raw {
        Some(components) if components.iter().any(|c| !c.as_ref().trim().is_empty()) => {
            parse_union(components, true)
        }
        _ => parse_union(default, false),
    }
}

/// `Difference[includes, excludes]`, with the defaults filled in
pub fn parse_difference<S: AsRef<str>>(
    include: Option<&[S]>,
    exclude: Option<&[S]>,
) -> Result<SelectionSpec, SelectionError> {
    let included = parse_union_from_default(include, DEFAULT_INCLUDES)?;
    let excluded = parse_union_from_default(exclude, DEFAULT_EXCLUDES)?;
    Ok(SelectionSpec::difference(vec![included, excluded], false, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::MethodName;
    use pretty_assertions::assert_eq;

    fn group_of(spec: &SelectionSpec) -> &crate::spec::SelectionGroup {
        spec.operation().map(|(_, group)| group).unwrap()
    }

    #[test]
    fn parse_union_splits_spaces_and_commas() {
        let spec = parse_union(&["a b,c", "tag:d"], true).unwrap();
        assert!(matches!(spec, SelectionSpec::Union(_)));

        let union = group_of(&spec);
        assert_eq!(union.raw, "a b,c tag:d");
        assert!(union.expect_exists);
        assert_eq!(union.components.len(), 3);

        let raws: Vec<&str> = union.components.iter().map(|c| c.raw()).collect();
        assert_eq!(raws, vec!["a", "b,c", "tag:d"]);

        let second = group_of(&union.components[1]);
        assert!(matches!(union.components[1], SelectionSpec::Intersection(_)));
        assert_eq!(second.components.len(), 2);
        assert!(second.expect_exists);
    }

    #[test]
    fn repeated_spaces_are_ignored() {
        let spec = parse_union(&["a  b "], true).unwrap();
        assert_eq!(group_of(&spec).components.len(), 2);
    }

    #[test]
    fn defaults_do_not_expect_matches() {
        let spec = parse_union_from_default(None::<&[String]>, DEFAULT_INCLUDES).unwrap();
        let union = group_of(&spec);
        assert!(!union.expect_exists);

        let methods: Vec<MethodName> = spec.criteria().iter().map(|c| c.method).collect();
        assert_eq!(methods, vec![MethodName::Fqn, MethodName::Source]);

        let explicit = parse_union_from_default(Some(&["a".to_string()][..]), DEFAULT_INCLUDES).unwrap();
        assert!(group_of(&explicit).expect_exists);
    }

    #[test]
    fn blank_arguments_use_the_default() {
        let empty: Vec<String> = Vec::new();
        let blank = vec!["".to_string(), "  ".to_string()];

        for raw in [&empty[..], &blank[..]] {
            let spec = parse_union_from_default(Some(raw), DEFAULT_INCLUDES).unwrap();
            assert!(!group_of(&spec).expect_exists);
            assert_eq!(spec.criteria().len(), 2);
        }

        let spec = parse_difference(Some(&empty[..]), Some(&blank[..])).unwrap();
        assert_eq!(
            spec.to_string(),
            "Difference(Union(Intersection(fqn:*), Intersection(source:*)), Union())"
        );
    }

    #[test]
    fn difference_of_include_and_exclude() {
        let include = vec!["tag:nightly".to_string()];
        let exclude = vec!["a".to_string()];
        let spec = parse_difference(Some(&include[..]), Some(&exclude[..])).unwrap();

        assert_eq!(
            spec.to_string(),
            "Difference(Union(Intersection(tag:nightly)), Union(Intersection(fqn:a)))"
        );

        let defaults = parse_difference(None::<&[String]>, None).unwrap();
        assert_eq!(
            defaults.to_string(),
            "Difference(Union(Intersection(fqn:*), Intersection(source:*)), Union())"
        );
    }

    #[test]
    fn invalid_member_fails_whole_parse() {
        assert!(matches!(
            parse_union(&["a bogus:b"], true),
            Err(SelectionError::InvalidSelector { .. })
        ));
    }
}
