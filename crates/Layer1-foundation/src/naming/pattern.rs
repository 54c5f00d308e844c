//! Wildcard patterns over structured names

use super::name::{check_domain, check_key, check_value, parse_properties, split_domain};
use super::ServiceName;
use crate::{Error, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Wildcard token for a domain or a property value
pub const WILDCARD: &str = "*";

/// A structured name where the domain and any property value may be unconstrained.
///
/// A pattern matches a name when every constrained pair matches exactly. A
/// property declared with a wildcard value only requires the key to be present.
/// Properties the pattern does not declare are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pattern {
    /// `None` = any domain
    domain: Option<String>,
    /// `None` value = any value, key must exist
    properties: BTreeMap<String, Option<String>>,
}

impl Pattern {
    /// 도메인 패턴. `*`이면 모든 도메인
    pub fn new(domain: impl Into<String>) -> Result<Self> {
        let domain = domain.into();
        check_domain(&domain)?;
        Ok(Self {
            domain: (domain != WILDCARD).then_some(domain),
            properties: BTreeMap::new(),
        })
    }

    /// 모든 도메인에 매칭되는 패턴
    pub fn any_domain() -> Self {
        Self {
            domain: None,
            properties: BTreeMap::new(),
        }
    }

    /// 속성 추가. 값이 `*`이면 와일드카드
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let (key, value) = (key.into(), value.into());
        check_key(&key)?;
        check_value(&key, &value)?;
        self.properties.insert(key, (value != WILDCARD).then_some(value));
        Ok(self)
    }

    /// 값 제약 없는 속성 추가
    pub fn with_any(self, key: impl Into<String>) -> Result<Self> {
        self.with(key, WILDCARD)
    }

    /// Does any part of this pattern use a wildcard?
    pub fn is_pattern(&self) -> bool {
        self.domain.is_none() || self.properties.values().any(Option::is_none)
    }

    /// Pure check, linear in the number of declared properties
    pub fn matches(&self, name: &ServiceName) -> bool {
        if let Some(ref domain) = self.domain {
            if domain != name.domain() {
                return false;
            }
        }

        self.properties.iter().all(|(key, expected)| {
            match (name.property(key), expected) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            }
        })
    }
}

impl From<ServiceName> for Pattern {
    fn from(name: ServiceName) -> Self {
        Self {
            domain: Some(name.domain().to_string()),
            properties: name
                .properties()
                .iter()
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain.as_deref().unwrap_or(WILDCARD))?;
        let mut first = true;
        for (key, value) in &self.properties {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{}={}", key, value.as_deref().unwrap_or(WILDCARD))?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // "*" 단독은 모든 이름에 매칭
        if s.trim() == WILDCARD {
            return Ok(Pattern::any_domain());
        }

        let (domain, props) = split_domain(s)?;
        let mut pattern = Pattern::new(domain)?;
        for (key, value) in parse_properties(s, props)? {
            pattern = pattern.with(key, value)?;
        }
        Ok(pattern)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// PatternSet
// ============================================================================

/// A set of patterns; matches a name if any member does. Empty matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet {
    patterns: BTreeSet<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 단일 패턴 집합
    pub fn single(pattern: impl Into<Pattern>) -> Self {
        let mut set = Self::new();
        set.insert(pattern);
        set
    }

    /// 모든 이름에 매칭되는 집합
    pub fn any() -> Self {
        Self::single(Pattern::any_domain())
    }

    /// 문자열 패턴 목록 파싱
    pub fn parse<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for raw in patterns {
            set.insert(raw.as_ref().parse::<Pattern>()?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, pattern: impl Into<Pattern>) -> bool {
        self.patterns.insert(pattern.into())
    }

    pub fn matches_any(&self, name: &ServiceName) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl From<Pattern> for PatternSet {
    fn from(pattern: Pattern) -> Self {
        Self::single(pattern)
    }
}

impl FromIterator<Pattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = Pattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, pattern) in self.patterns.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", pattern)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ServiceName {
        s.parse().unwrap()
    }

    #[test]
    fn test_value_wildcard() {
        let pattern = Pattern::new("app").unwrap().with_any("name").unwrap();
        assert_eq!(pattern, "app:name=*".parse::<Pattern>().unwrap());
        assert!(pattern.matches(&name("app:name=X")));
        assert!(pattern.matches(&name("app:name=Y,type=Greeter")));
        // 와일드카드 속성도 키는 존재해야 함
        assert!(!pattern.matches(&name("app:type=Greeter")));
        assert!(!pattern.matches(&name("other:name=X")));
    }

    #[test]
    fn test_exact_values() {
        let pattern: Pattern = "app:name=X".parse().unwrap();
        assert!(!pattern.is_pattern());
        assert!(pattern.matches(&name("app:name=X")));
        assert!(pattern.matches(&name("app:name=X,j2eeType=Foo")));
        assert!(!pattern.matches(&name("app:name=Xy")));
    }

    #[test]
    fn test_wildcards_are_atomic() {
        // 부분 문자열 와일드카드는 지원하지 않음: "X*"는 리터럴 값
        let pattern = Pattern::new("app").unwrap().with("name", "X*").unwrap();
        assert!(!pattern.matches(&name("app:name=Xavier")));
    }

    #[test]
    fn test_domain_wildcard() {
        let pattern: Pattern = "*:type=Greeter".parse().unwrap();
        assert!(pattern.is_pattern());
        assert!(pattern.matches(&name("app:name=X,type=Greeter")));
        assert!(pattern.matches(&name("sys:type=Greeter")));
        assert!(!pattern.matches(&name("sys:type=Logger")));

        let all: Pattern = "*".parse().unwrap();
        assert!(all.matches(&name("anything:")));
    }

    #[test]
    fn test_open_property_list_parses() {
        let pattern: Pattern = "app:name=X,*".parse().unwrap();
        assert_eq!(
            pattern,
            Pattern::new("app").unwrap().with("name", "X").unwrap()
        );
    }

    #[test]
    fn test_exact_pattern_from_name() {
        let n = name("app:name=X,type=Greeter");
        let pattern = Pattern::from(n.clone());
        assert!(pattern.matches(&n));
        assert_eq!(pattern.to_string(), n.to_string());
    }

    #[test]
    fn test_pattern_set() {
        let set = PatternSet::parse(["app:name=X", "sys:*"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches_any(&name("app:name=X")));
        assert!(set.matches_any(&name("sys:name=anything")));
        assert!(!set.matches_any(&name("app:name=Y")));

        assert!(!PatternSet::new().matches_any(&name("app:name=X")));
        assert!(PatternSet::any().matches_any(&name("app:name=X")));
    }

    #[test]
    fn test_pattern_set_serde() {
        let set = PatternSet::parse(["app:name=*"]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"app:name=*\"]");
        let back: PatternSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_builder_round_trips_through_string_form() {
        let pattern = Pattern::new("*")
            .unwrap()
            .with("type", "Greeter")
            .unwrap()
            .with_any("name")
            .unwrap();
        assert!(pattern.is_pattern());
        assert_eq!(pattern.to_string(), "*:name=*,type=Greeter");
        assert_eq!(pattern.to_string().parse::<Pattern>().unwrap(), pattern);

        assert!(Pattern::new("").is_err());
        assert!(Pattern::new("app").unwrap().with("name", "a,b").is_err());
        assert!(Pattern::new("app").unwrap().with_any("na=me").is_err());
    }
}
