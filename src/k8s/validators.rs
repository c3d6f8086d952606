//! Format checks for Kubernetes object names, labels and annotations.
//!
//! Each check returns the list of problems found; an empty list means the
//! value is acceptable to the Kubernetes API server.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of an RFC 1123 subdomain.
pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

/// Maximum length of an RFC 1123 label.
pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;

/// Maximum length of the name part of a qualified name and of a label value.
pub const QUALIFIED_NAME_MAX_LENGTH: usize = 63;

/// Maximum combined size of all annotation keys and values.
pub const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * 1024;

static DNS1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid regex")
});

static QUALIFIED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("valid regex")
});

static LABEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").expect("valid regex")
});

/// Check that `value` is a lowercase RFC 1123 subdomain, the format of object names.
pub fn dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(format!(
            "must be no more than {} characters",
            DNS1123_SUBDOMAIN_MAX_LENGTH
        ));
    }
    if !DNS1123_SUBDOMAIN.is_match(value) {
        errors.push(
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, \
             '-' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errors
}

/// Check that `value` is a lowercase RFC 1123 label, the format of namespace names.
pub fn dns1123_label(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        errors.push(format!(
            "must be no more than {} characters",
            DNS1123_LABEL_MAX_LENGTH
        ));
    }
    if !DNS1123_LABEL.is_match(value) {
        errors.push(
            "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or \
             '-', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errors
}

/// Check that `value` is a qualified name such as `app` or `example.com/app`.
pub fn qualified_name(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let (prefix, name) = match value.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            errors.push("prefix part must be non-empty".to_string());
        } else {
            errors.extend(
                dns1123_subdomain(prefix)
                    .into_iter()
                    .map(|e| format!("prefix part {}", e)),
            );
        }
    }

    if name.is_empty() {
        errors.push("name part must be non-empty".to_string());
    } else if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        errors.push(format!(
            "name part must be no more than {} characters",
            QUALIFIED_NAME_MAX_LENGTH
        ));
    }
    if !name.is_empty() && !QUALIFIED_NAME.is_match(name) {
        errors.push(
            "name part must consist of alphanumeric characters, '-', '_' or '.', and must start \
             and end with an alphanumeric character"
                .to_string(),
        );
    }
    errors
}

/// Check that `value` is a valid label value (possibly empty).
pub fn label_value(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > QUALIFIED_NAME_MAX_LENGTH {
        errors.push(format!(
            "must be no more than {} characters",
            QUALIFIED_NAME_MAX_LENGTH
        ));
    }
    if !LABEL_VALUE.is_match(value) {
        errors.push(
            "a valid label must be an empty string or consist of alphanumeric characters, '-', \
             '_' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errors
}

/// Check every key and value of a label map.
///
/// Problems are keyed by the offending label key.
pub fn labels(labels: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut errors = Vec::new();
    for (key, value) in labels {
        for e in qualified_name(key) {
            errors.push((key.clone(), format!("label key '{}': {}", key, e)));
        }
        for e in label_value(value) {
            errors.push((key.clone(), format!("label value '{}': {}", value, e)));
        }
    }
    errors
}

/// Check every key of an annotation map and the combined size of the map.
///
/// Problems are keyed by the offending annotation key; the size problem uses
/// an empty key because it belongs to the map as a whole.
pub fn annotations(annotations: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut errors = Vec::new();
    let mut total_size = 0usize;
    for (key, value) in annotations {
        for e in qualified_name(&key.to_lowercase()) {
            errors.push((key.clone(), format!("annotation key '{}': {}", key, e)));
        }
        total_size += key.len() + value.len();
    }
    if total_size > TOTAL_ANNOTATION_SIZE_LIMIT {
        errors.push((
            String::new(),
            format!(
                "annotations size {} is larger than the limit of {} bytes",
                total_size, TOTAL_ANNOTATION_SIZE_LIMIT
            ),
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns1123_subdomain() {
        assert!(dns1123_subdomain("grafana-1").is_empty());
        assert!(dns1123_subdomain("grafana.monitoring.example").is_empty());
        assert!(dns1123_subdomain("a").is_empty());

        assert!(!dns1123_subdomain("").is_empty());
        assert!(!dns1123_subdomain("Grafana").is_empty());
        assert!(!dns1123_subdomain("-grafana").is_empty());
        assert!(!dns1123_subdomain("grafana-").is_empty());
        assert!(!dns1123_subdomain("grafana_1").is_empty());
        assert!(!dns1123_subdomain(&"a".repeat(254)).is_empty());
        assert!(dns1123_subdomain(&"a".repeat(253)).is_empty());
    }

    #[test]
    fn test_dns1123_label() {
        assert!(dns1123_label("monitoring").is_empty());
        assert!(dns1123_label("team-a").is_empty());

        assert!(!dns1123_label("team.a").is_empty());
        assert!(!dns1123_label("Team").is_empty());
        assert!(!dns1123_label(&"a".repeat(64)).is_empty());
    }

    #[test]
    fn test_qualified_name() {
        assert!(qualified_name("app").is_empty());
        assert!(qualified_name("app.kubernetes.io/name").is_empty());
        assert!(qualified_name("Example_Key.1").is_empty());

        assert!(!qualified_name("").is_empty());
        assert!(!qualified_name("/name").is_empty());
        assert!(!qualified_name("example.com/").is_empty());
        assert!(!qualified_name("Example.COM/name").is_empty());
        assert!(!qualified_name("_name").is_empty());
        assert!(!qualified_name(&"n".repeat(64)).is_empty());
    }

    #[test]
    fn test_label_value() {
        assert!(label_value("").is_empty());
        assert!(label_value("v1.2.3").is_empty());
        assert!(!label_value("has space").is_empty());
        assert!(!label_value(&"v".repeat(64)).is_empty());
    }

    #[test]
    fn test_label_map() {
        let mut map = BTreeMap::new();
        map.insert("app".to_string(), "grafana".to_string());
        map.insert("app.kubernetes.io/part-of".to_string(), "monitoring".to_string());
        assert!(labels(&map).is_empty());

        map.insert("bad key".to_string(), "ok".to_string());
        map.insert("tier".to_string(), "not ok!".to_string());
        let errors = labels(&map);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|(k, _)| k == "bad key"));
        assert!(errors.iter().any(|(k, _)| k == "tier"));
    }

    #[test]
    fn test_annotation_map() {
        let mut map = BTreeMap::new();
        map.insert(
            "Kubernetes.io/Description".to_string(),
            "any value, including spaces".to_string(),
        );
        assert!(annotations(&map).is_empty());

        map.insert("not/valid/key".to_string(), String::new());
        assert_eq!(annotations(&map).len(), 1);
    }

    #[test]
    fn test_annotation_size_limit() {
        let mut map = BTreeMap::new();
        map.insert("big".to_string(), "x".repeat(TOTAL_ANNOTATION_SIZE_LIMIT));
        let errors = annotations(&map);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "");
        assert!(errors[0].1.contains("larger than the limit"));
    }
}
