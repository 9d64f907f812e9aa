//! Generic comparison primitives `BuildChanges` (spec §4.2) is assembled
//! from. Each concrete Unit's `diff` method is a flat list of calls into
//! these, rather than a reflective field walk — see SPEC_FULL §4.2.

use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

/// `don't-care` when `expected` is `None`; otherwise the field changes
/// unless `actual` carries an equal value. Mirrors spec §4.2 rules 1–3 for
/// an optional expected field.
pub fn changed_opt<T: PartialEq + Clone>(actual: Option<&T>, expected: &Option<T>) -> Option<T> {
    let exp = expected.as_ref()?;
    if actual.is_some_and(|a| a == exp) {
        None
    } else {
        Some(exp.clone())
    }
}

/// A required (always-set) expected field: "don't care" never applies.
pub fn changed<T: PartialEq + Clone>(actual: Option<&T>, expected: &T) -> Option<T> {
    if actual.is_some_and(|a| a == expected) {
        None
    } else {
        Some(expected.clone())
    }
}

/// Two referenced Units are equal when both carry identifiers and the
/// identifiers match (spec §4.2 rule 2). Reference fields are themselves
/// `Option<String>` ids; `None` on the expected side is "don't care".
pub fn changed_ref(actual: Option<&str>, expected: &Option<String>) -> Option<String> {
    let exp = expected.as_ref()?;
    if actual.is_some_and(|a| a == exp) {
        None
    } else {
        Some(exp.clone())
    }
}

/// Mappings are equal iff same key-set and pointwise equal values (spec
/// §4.2 rule 2); returns only the entries that must be added or changed
/// (mirrors `kubeup_cloud::diff_tags`'s "added or changed, not removed"
/// contract, since cloud tag sets are additive-converging per spec §4.5).
pub fn changed_map(actual: Option<&Tags>, expected: &Tags) -> Option<Tags> {
    if expected.is_empty() {
        return None;
    }
    let diff = kubeup_cloud::diff_tags(actual.unwrap_or(&Tags::new()), expected);
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_opt_is_dont_care_when_expected_unset() {
        assert_eq!(changed_opt(Some(&"a".to_string()), &None), None);
        assert_eq!(changed_opt(None, &None), None);
    }

    #[test]
    fn changed_opt_flags_when_actual_missing_or_different() {
        assert_eq!(changed_opt::<String>(None, &Some("a".into())), Some("a".into()));
        assert_eq!(changed(Some(&"a".to_string()), &"b".to_string()), Some("b".into()));
        assert_eq!(changed(Some(&"a".to_string()), &"a".to_string()), None);
    }

    #[test]
    fn changed_map_only_reports_added_or_changed_keys() {
        let mut actual = Tags::new();
        actual.insert("Name".into(), "old".into());
        let mut expected = Tags::new();
        expected.insert("Name".into(), "old".into());
        expected.insert("Extra".into(), "v".into());
        let diff = changed_map(Some(&actual), &expected).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.get("Extra").map(String::as_str), Some("v"));
    }
}
