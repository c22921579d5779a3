//! Hierarchical names for registered objects.
//!
//! A `ManagedName` renders as `domain:key1=val1,key2=val2,name=leaf`. The
//! rendering is stable, so a client holding the same domain, folders and
//! leaf name can predict the name without asking the registry.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Key reserved for the leaf name.
pub const LEAF_KEY: &str = "name";

const RESERVED: [char; 6] = [':', ',', '=', '*', '?', '"'];

/// One `key=value` folder segment.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Folder {
    pub key: String,
    pub value: String,
}

impl Folder {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A validated, immutable name: domain, ordered folders, leaf.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManagedName {
    domain: String,
    folders: Vec<Folder>,
    leaf: String,
}

impl ManagedName {
    /// Build a name from its parts, validating each one.
    pub fn new(
        domain: impl Into<String>,
        folders: Vec<Folder>,
        leaf: impl Into<String>,
    ) -> Result<Self, Error> {
        let domain = domain.into();
        let leaf = leaf.into();

        if domain.trim().is_empty() {
            return Err(Error::configuration("no domain available"));
        }
        check_part("domain", &domain)?;
        check_part("leaf name", &leaf)?;

        let mut seen = HashSet::new();
        for folder in &folders {
            check_part("folder key", &folder.key)?;
            check_part("folder value", &folder.value)?;
            if folder.key == LEAF_KEY {
                return Err(Error::configuration(format!(
                    "folder key '{}' is reserved for the leaf name",
                    LEAF_KEY
                )));
            }
            if !seen.insert(folder.key.as_str()) {
                return Err(Error::configuration(format!(
                    "duplicate folder key '{}'",
                    folder.key
                )));
            }
        }

        Ok(Self {
            domain,
            folders,
            leaf,
        })
    }

    /// Parse a rendered name. The `name` key becomes the leaf, every other
    /// key a folder in the order written.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let invalid = |message: &str| Error::InvalidName {
            input: s.to_string(),
            message: message.to_string(),
        };

        let (domain, rest) = s.split_once(':').ok_or_else(|| invalid("missing ':'"))?;
        let mut folders = Vec::new();
        let mut leaf = None;

        for pair in rest.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid("expected key=value"))?;
            if key == LEAF_KEY {
                if leaf.is_some() {
                    return Err(invalid("duplicate name key"));
                }
                leaf = Some(value.to_string());
            } else {
                folders.push(Folder::new(key, value));
            }
        }

        let leaf = leaf.ok_or_else(|| invalid("missing name key"))?;
        ManagedName::new(domain, folders, leaf).map_err(|e| invalid(&e.to_string()))
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn leaf(&self) -> &str {
        &self.leaf
    }
}

fn check_part(what: &str, part: &str) -> Result<(), Error> {
    if part.is_empty() {
        return Err(Error::configuration(format!("empty {}", what)));
    }
    if let Some(c) = part.chars().find(|c| RESERVED.contains(c)) {
        return Err(Error::configuration(format!(
            "{} '{}' contains reserved character '{}'",
            what, part, c
        )));
    }
    Ok(())
}

impl fmt::Display for ManagedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for folder in &self.folders {
            write!(f, "{},", folder)?;
        }
        write!(f, "{}={}", LEAF_KEY, self.leaf)
    }
}

impl FromStr for ManagedName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManagedName::parse(s)
    }
}

impl Serialize for ManagedName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ManagedName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ManagedName::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Declarative naming metadata attached to a type.
///
/// Folder segments are either bare values, numbered by position (`00`,
/// `01`, ...), or explicit `key=value` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSpec {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folders: Vec<String>,
}

impl NameSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a spec in `domain`.
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn folder(mut self, segment: impl Into<String>) -> Self {
        self.folders.push(segment.into());
        self
    }

    #[must_use]
    pub fn folders<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders.extend(segments.into_iter().map(Into::into));
        self
    }

    /// Predict the name an object with this spec and type name receives.
    pub fn to_name(&self, type_name: &str) -> Result<ManagedName, Error> {
        NameBuilder::new(self).build(type_name)
    }
}

/// Expand folder segments, numbering bare values by position.
pub fn expand_folders<S: AsRef<str>>(segments: &[S]) -> Vec<Folder> {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| match segment.as_ref().split_once('=') {
            Some((key, value)) => Folder::new(key, value),
            None => Folder::new(format!("{:02}", i), segment.as_ref()),
        })
        .collect()
}

/// Object-provided overrides for its own name components.
///
/// Each `Some` replaces the declarative value for that component.
pub trait SelfNaming {
    fn domain(&self) -> Option<String> {
        None
    }

    fn leaf_name(&self) -> Option<String> {
        None
    }

    /// Folder segments, in the same notation as `NameSpec::folders`.
    fn folders(&self) -> Option<Vec<String>> {
        None
    }
}

/// Combines declarative metadata with an optional self-naming capability.
pub struct NameBuilder<'a> {
    spec: &'a NameSpec,
    self_naming: Option<&'a dyn SelfNaming>,
}

impl<'a> NameBuilder<'a> {
    pub fn new(spec: &'a NameSpec) -> Self {
        Self {
            spec,
            self_naming: None,
        }
    }

    #[must_use]
    pub fn self_naming(mut self, self_naming: Option<&'a dyn SelfNaming>) -> Self {
        self.self_naming = self_naming;
        self
    }

    /// Compute the name; the leaf defaults to `type_name`.
    pub fn build(&self, type_name: &str) -> Result<ManagedName, Error> {
        let own = self.self_naming;

        let domain = own
            .and_then(|s| s.domain())
            .or_else(|| self.spec.domain.clone())
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration(format!("no domain available for {}", type_name))
            })?;

        let leaf = own
            .and_then(|s| s.leaf_name())
            .or_else(|| self.spec.name.clone())
            .unwrap_or_else(|| type_name.to_string());

        let folders = match own.and_then(|s| s.folders()) {
            Some(segments) => expand_folders(&segments),
            None => expand_folders(&self.spec.folders),
        };

        ManagedName::new(domain, folders, leaf)
    }
}

/// Simple (unqualified, non-generic) name of `T`.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Glob pattern over rendered names (`*` any run, `?` one character).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamePattern {
    pattern: String,
}

impl NamePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Pattern matching every name.
    pub fn any() -> Self {
        Self::new("*")
    }

    pub fn matches(&self, name: &ManagedName) -> bool {
        glob_match(&self.pattern, &name.to_string())
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Renamed;

    impl SelfNaming for Renamed {
        fn leaf_name(&self) -> Option<String> {
            Some("primary".to_string())
        }
    }

    struct Relocated;

    impl SelfNaming for Relocated {
        fn domain(&self) -> Option<String> {
            Some("ops".to_string())
        }

        fn folders(&self) -> Option<Vec<String>> {
            Some(vec!["type=pool".to_string()])
        }
    }

    #[test]
    fn renders_domain_folders_leaf() {
        let spec = NameSpec::domain("app")
            .name("cache")
            .folders(["storage", "kind=lru"]);
        let name = spec.to_name("Cache").unwrap();
        assert_eq!(name.to_string(), "app:00=storage,kind=lru,name=cache");
    }

    #[test]
    fn renders_without_folders() {
        let name = NameSpec::domain("app").name("cache").to_name("Cache").unwrap();
        assert_eq!(name.to_string(), "app:name=cache");
    }

    #[test]
    fn folder_order_is_preserved() {
        let name = NameSpec::domain("d")
            .folders(["z=1", "a=2", "m"])
            .to_name("T")
            .unwrap();
        assert_eq!(name.to_string(), "d:z=1,a=2,02=m,name=T");
    }

    #[test]
    fn leaf_defaults_to_type_name() {
        let name = NameSpec::domain("d").to_name("Counter").unwrap();
        assert_eq!(name.leaf(), "Counter");
    }

    #[test]
    fn missing_domain_is_configuration_error() {
        let err = NameSpec::new().name("x").to_name("T").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let err = NameSpec::domain("  ").to_name("T").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn self_naming_overrides_per_component() {
        let spec = NameSpec::domain("app").name("cache").folder("kind=lru");

        let name = NameBuilder::new(&spec)
            .self_naming(Some(&Renamed))
            .build("Cache")
            .unwrap();
        assert_eq!(name.to_string(), "app:kind=lru,name=primary");

        let name = NameBuilder::new(&spec)
            .self_naming(Some(&Relocated))
            .build("Cache")
            .unwrap();
        assert_eq!(name.to_string(), "ops:type=pool,name=cache");
    }

    #[test]
    fn self_naming_supplies_missing_domain() {
        let name = NameBuilder::new(&NameSpec::new())
            .self_naming(Some(&Relocated))
            .build("Pool")
            .unwrap();
        assert_eq!(name.to_string(), "ops:type=pool,name=Pool");
    }

    #[test]
    fn duplicate_and_reserved_keys_rejected() {
        let err = NameSpec::domain("d").folders(["a=1", "a=2"]).to_name("T").unwrap_err();
        assert!(err.to_string().contains("duplicate folder key"));

        let err = NameSpec::domain("d").folder("name=x").to_name("T").unwrap_err();
        assert!(err.to_string().contains("reserved"));

        let err = NameSpec::domain("d").name("a,b").to_name("T").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn parse_inverts_render() {
        let name = NameSpec::domain("app")
            .name("cache")
            .folders(["storage", "kind=lru"])
            .to_name("Cache")
            .unwrap();
        let parsed: ManagedName = name.to_string().parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ManagedName::parse("no-colon").is_err());
        assert!(ManagedName::parse("d:key").is_err());
        assert!(ManagedName::parse("d:a=1").is_err());
        assert!(ManagedName::parse(":name=x").is_err());
    }

    #[test]
    fn simple_type_name_strips_path_and_generics() {
        struct Plain;
        assert_eq!(simple_type_name::<Plain>(), "Plain");
        assert_eq!(simple_type_name::<Vec<u8>>(), "Vec");
    }

    #[test]
    fn patterns_glob_over_rendered_name() {
        let name = ManagedName::parse("app:kind=lru,name=cache").unwrap();
        assert!(NamePattern::any().matches(&name));
        assert!(NamePattern::new("app:*").matches(&name));
        assert!(NamePattern::new("*name=cach?").matches(&name));
        assert!(!NamePattern::new("ops:*").matches(&name));
    }

    #[test]
    fn serde_uses_rendered_form() {
        let name = ManagedName::parse("app:name=cache").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"app:name=cache\"");
        let back: ManagedName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
