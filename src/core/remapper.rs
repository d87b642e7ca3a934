//! Derives the physical database name a restored copy is created under.
//!
//! Names are a pure function of the restore mapping so that resubmitting the
//! same restore produces the same names.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::models::RestoreMapping;

static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("prefix pattern is valid"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"));

/// Hex characters of the blake3 digest appended to every generated name.
const SUFFIX_LEN: usize = 12;

/// Shortest `max_len` the generator accepts.
pub const MIN_NAME_LENGTH: usize = 24;

/// Identity of a database to be restored under a new name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInfo {
    pub name: String,
    pub microservice: String,
    pub namespace: String,
    pub prefix: Option<String>,
}

impl TryFrom<&RestoreMapping> for DbInfo {
    type Error = NameError;

    /// Carries the prefix in its normalized form, the one names are built from.
    fn try_from(mapping: &RestoreMapping) -> Result<Self, Self::Error> {
        Ok(Self {
            name: mapping.database_name.clone(),
            microservice: mapping.microservice_name.clone(),
            namespace: mapping.namespace.clone(),
            prefix: normalize_prefix(mapping.prefix.as_deref())?,
        })
    }
}

/// Trims and lowercases a prefix. Blank means no prefix.
pub fn normalize_prefix(prefix: Option<&str>) -> Result<Option<String>, NameError> {
    match prefix.map(str::trim) {
        Some(p) if !p.is_empty() => {
            let p = p.to_lowercase();
            if !PREFIX_RE.is_match(&p) {
                return Err(NameError::InvalidPrefix(p));
            }
            Ok(Some(p))
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("{0} must not be empty")]
    Missing(&'static str),
    #[error("{0} contains disallowed characters")]
    InvalidCharacters(&'static str),
    #[error("prefix '{0}' must start with a letter and contain only [a-z0-9_]")]
    InvalidPrefix(String),
    #[error("generated name '{0}' collides with the previous name")]
    Collision(String),
}

/// Naming convention for restored databases. Implementations must be pure.
pub trait NameGenerator: Send + Sync {
    fn generate_new_name(&self, info: &DbInfo, is_service_db: bool) -> Result<String, NameError>;
}

/// Builds `{base}_{hash}` where base is the prefix or `{namespace}_{microservice}`
/// and hash is a truncated blake3 digest of the whole mapping.
#[derive(Debug, Clone)]
pub struct HashedNameGenerator {
    max_len: usize,
}

impl HashedNameGenerator {
    /// `max_len` is clamped to [`MIN_NAME_LENGTH`].
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(MIN_NAME_LENGTH),
        }
    }
}

impl Default for HashedNameGenerator {
    fn default() -> Self {
        // PostgreSQL identifier limit
        Self::new(63)
    }
}

impl NameGenerator for HashedNameGenerator {
    fn generate_new_name(&self, info: &DbInfo, is_service_db: bool) -> Result<String, NameError> {
        let name = checked("name", &info.name)?;
        let microservice = checked("microservice", &info.microservice)?;
        let namespace = checked("namespace", &info.namespace)?;

        let prefix = normalize_prefix(info.prefix.as_deref())?;

        let mut base = match &prefix {
            Some(p) => p.clone(),
            None => sanitize(&format!("{namespace}_{microservice}")),
        };
        if base.is_empty() {
            return Err(NameError::InvalidCharacters("namespace/microservice"));
        }
        if base.starts_with(|c: char| c.is_ascii_digit()) {
            base.insert_str(0, "db_");
        }

        let role = if is_service_db { "service" } else { "tenant" };
        let digest = blake3::Hasher::new()
            .update(namespace.as_bytes())
            .update(b"\0")
            .update(microservice.as_bytes())
            .update(b"\0")
            .update(name.as_bytes())
            .update(b"\0")
            .update(prefix.as_deref().unwrap_or_default().as_bytes())
            .update(b"\0")
            .update(role.as_bytes())
            .finalize();
        let hex = digest.to_hex();
        let suffix = &hex[..SUFFIX_LEN];

        // base is ASCII here, so byte truncation is safe
        base.truncate(self.max_len - SUFFIX_LEN - 1);
        let base = base.trim_end_matches('_');

        let new_name = format!("{base}_{suffix}");
        if new_name.eq_ignore_ascii_case(name) {
            return Err(NameError::Collision(new_name));
        }
        Ok(new_name)
    }
}

fn checked<'a>(field: &'static str, value: &'a str) -> Result<&'a str, NameError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NameError::Missing(field));
    }
    if value.chars().any(char::is_control) {
        return Err(NameError::InvalidCharacters(field));
    }
    Ok(value)
}

fn sanitize(raw: &str) -> String {
    SEPARATOR_RE
        .replace_all(&raw.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, microservice: &str, namespace: &str, prefix: Option<&str>) -> DbInfo {
        DbInfo {
            name: name.into(),
            microservice: microservice.into(),
            namespace: namespace.into(),
            prefix: prefix.map(Into::into),
        }
    }

    #[test]
    fn same_input_gives_same_name() {
        let generator = HashedNameGenerator::default();
        let input = info("orders", "svc1", "ns1", None);

        let first = generator.generate_new_name(&input, false).unwrap();
        let second = generator.generate_new_name(&input, false).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, "orders");
        assert!(first.starts_with("ns1_svc1_"));
    }

    #[test]
    fn different_databases_get_different_names() {
        let generator = HashedNameGenerator::default();

        let a = generator
            .generate_new_name(&info("orders", "svc1", "ns1", None), false)
            .unwrap();
        let b = generator
            .generate_new_name(&info("invoices", "svc1", "ns1", None), false)
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn service_mode_changes_the_suffix() {
        let generator = HashedNameGenerator::default();
        let input = info("orders", "svc1", "ns1", None);

        let tenant = generator.generate_new_name(&input, false).unwrap();
        let service = generator.generate_new_name(&input, true).unwrap();

        assert_ne!(tenant, service);
    }

    #[test]
    fn prefix_replaces_namespace_and_microservice() {
        let generator = HashedNameGenerator::default();

        let name = generator
            .generate_new_name(&info("orders", "svc1", "ns1", Some(" Custom_Pfx ")), false)
            .unwrap();

        assert!(name.starts_with("custom_pfx_"), "{name}");
        assert_eq!(name.len(), "custom_pfx_".len() + SUFFIX_LEN);
    }

    #[test]
    fn blank_prefix_is_ignored() {
        let generator = HashedNameGenerator::default();

        let with_blank = generator
            .generate_new_name(&info("orders", "svc1", "ns1", Some("  ")), false)
            .unwrap();
        let without = generator
            .generate_new_name(&info("orders", "svc1", "ns1", None), false)
            .unwrap();

        assert_eq!(with_blank, without);
    }

    #[test]
    fn kubernetes_names_are_sanitized() {
        let generator = HashedNameGenerator::default();

        let name = generator
            .generate_new_name(&info("orders", "order-service", "prod-ns", None), false)
            .unwrap();

        assert!(name.starts_with("prod_ns_order_service_"), "{name}");
    }

    #[test]
    fn leading_digit_gets_prefixed() {
        let generator = HashedNameGenerator::default();

        let name = generator
            .generate_new_name(&info("orders", "svc", "01-ns", None), false)
            .unwrap();

        assert!(name.starts_with("db_01_ns_svc_"), "{name}");
    }

    #[test]
    fn long_names_are_truncated_to_the_limit() {
        let generator = HashedNameGenerator::new(30);
        let long = "a".repeat(100);

        let name = generator
            .generate_new_name(&info("orders", &long, "ns1", None), false)
            .unwrap();

        assert_eq!(name.len(), 30);
        assert!(!name.contains("__"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let generator = HashedNameGenerator::default();

        let err = generator
            .generate_new_name(&info("orders", "", "ns1", None), false)
            .unwrap_err();

        assert_eq!(err, NameError::Missing("microservice"));
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let generator = HashedNameGenerator::default();

        let err = generator
            .generate_new_name(&info("orders", "svc1", "ns1", Some("1bad-prefix")), false)
            .unwrap_err();

        assert!(matches!(err, NameError::InvalidPrefix(_)));
    }

    #[test]
    fn mapping_prefix_is_normalized_before_naming() {
        let mapping = |prefix: &str| RestoreMapping {
            microservice_name: "svc".into(),
            database_name: "orders".into(),
            namespace: "ns".into(),
            prefix: Some(prefix.into()),
        };

        let padded = DbInfo::try_from(&mapping(" Custom_Pfx ")).unwrap();
        assert_eq!(padded.prefix.as_deref(), Some("custom_pfx"));

        let blank = DbInfo::try_from(&mapping("   ")).unwrap();
        assert_eq!(blank.prefix, None);

        let err = DbInfo::try_from(&mapping("9lives")).unwrap_err();
        assert_eq!(err, NameError::InvalidPrefix("9lives".into()));
    }

    #[test]
    fn control_characters_are_rejected() {
        let generator = HashedNameGenerator::default();

        let err = generator
            .generate_new_name(&info("ord\0ers", "svc1", "ns1", None), false)
            .unwrap_err();

        assert_eq!(err, NameError::InvalidCharacters("name"));
    }

    #[test]
    fn punctuation_only_identity_is_rejected() {
        let generator = HashedNameGenerator::default();

        let err = generator
            .generate_new_name(&info("orders", "---", "...", None), false)
            .unwrap_err();

        assert!(matches!(err, NameError::InvalidCharacters(_)));
    }
}
