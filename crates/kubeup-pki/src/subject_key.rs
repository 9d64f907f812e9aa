use crate::types::Subject;

/// Standard X.500 attribute OIDs the subject→filename translation recognises
/// (spec §4.7). Anything else falls back to its numeric dotted form.
const KNOWN_OIDS: &[(&str, &str)] = &[
    ("2.5.4.3", "cn"),
    ("2.5.4.10", "o"),
    ("2.5.4.11", "ou"),
    ("2.5.4.6", "c"),
    ("2.5.4.7", "l"),
    ("2.5.4.8", "st"),
    ("2.5.4.5", "serialnumber"),
];

pub(crate) fn oid_short_name(oid: &str) -> String {
    KNOWN_OIDS
        .iter()
        .find(|(dotted, _)| *dotted == oid)
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| oid.to_string())
}

/// Derives the on-disk filename stem for a subject: lowercase,
/// comma-joined `attr=value` RDN pairs in the order they were constructed
/// (spec §4.7 "Subject→filename").
pub fn subject_key(subject: &Subject) -> String {
    subject
        .rdns
        .iter()
        .map(|(attr, value)| format!("{}={}", attr.to_lowercase(), value.to_lowercase()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_rdns_lowercase() {
        let s = Subject::new().with("CN", "kubernetes-master").with("O", "system:masters");
        assert_eq!(subject_key(&s), "cn=kubernetes-master,o=system:masters");
    }

    #[test]
    fn unknown_oid_falls_back_to_numeric() {
        assert_eq!(oid_short_name("1.2.3.4.5"), "1.2.3.4.5");
        assert_eq!(oid_short_name("2.5.4.3"), "cn");
    }
}
