//! Structured service name

use super::WILDCARD;
use crate::{Error, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Domain plus an unordered set of key/value properties.
///
/// Properties are kept sorted so that equality, hashing and the canonical
/// string form never depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName {
    domain: String,
    properties: BTreeMap<String, String>,
}

impl ServiceName {
    /// 도메인만 가진 이름 생성 (속성은 `with`로 추가)
    ///
    /// 정규 문자열 형태로 되돌릴 수 없는 도메인은 `InvalidName`
    pub fn new(domain: impl Into<String>) -> Result<Self> {
        let domain = domain.into();
        check_domain(&domain)?;
        if domain.contains('*') {
            return Err(Error::InvalidName(format!("wildcard domain '{}'", domain)));
        }
        Ok(Self {
            domain,
            properties: BTreeMap::new(),
        })
    }

    /// 속성 추가 (같은 키는 덮어씀)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let (key, value) = (key.into(), value.into());
        check_key(&key)?;
        check_value(&key, &value)?;
        if value == WILDCARD {
            return Err(Error::InvalidName(format!("wildcard value for '{}'", key)));
        }
        self.properties.insert(key, value);
        Ok(self)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Canonical `domain:k1=v1,k2=v2` form with sorted keys
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        let mut first = true;
        for (key, value) in &self.properties {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for ServiceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (domain, props) = split_domain(s)?;
        if domain.contains('*') {
            return Err(Error::InvalidName(format!("wildcard domain in name '{}'", s)));
        }
        if props.split(',').any(|part| part.trim() == WILDCARD) {
            return Err(Error::InvalidName(format!("open property list in name '{}'", s)));
        }

        let mut name = ServiceName::new(domain)?;
        for (key, value) in parse_properties(s, props)? {
            name = name.with(key, value).map_err(|e| {
                Error::InvalidName(format!("{} in name '{}'", invalid_reason(e), s))
            })?;
        }
        Ok(name)
    }
}

fn invalid_reason(e: Error) -> String {
    match e {
        Error::InvalidName(reason) => reason,
        other => other.to_string(),
    }
}

impl Serialize for ServiceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// 검증 - 정규 문자열로 손실 없이 왕복 가능한 토큰만 허용
// ============================================================================

fn check_token(kind: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::InvalidName(format!("empty {}", kind)));
    }
    if token.trim() != token {
        return Err(Error::InvalidName(format!(
            "{} '{}' has surrounding whitespace",
            kind, token
        )));
    }
    Ok(())
}

pub(super) fn check_domain(domain: &str) -> Result<()> {
    check_token("domain", domain)?;
    if domain.contains(':') {
        return Err(Error::InvalidName(format!("domain '{}' contains ':'", domain)));
    }
    Ok(())
}

pub(super) fn check_key(key: &str) -> Result<()> {
    check_token("key", key)?;
    if key == WILDCARD || key.contains(',') || key.contains('=') {
        return Err(Error::InvalidName(format!("invalid property key '{}'", key)));
    }
    Ok(())
}

pub(super) fn check_value(key: &str, value: &str) -> Result<()> {
    check_token("value", value)?;
    if value.contains(',') {
        return Err(Error::InvalidName(format!(
            "value for '{}' contains ','",
            key
        )));
    }
    Ok(())
}

/// `domain:rest` 분리 (도메인은 비어 있을 수 없음)
pub(super) fn split_domain(s: &str) -> Result<(&str, &str)> {
    let s = s.trim();
    let (domain, props) = s
        .split_once(':')
        .ok_or_else(|| Error::InvalidName(format!("missing ':' in '{}'", s)))?;
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(Error::InvalidName(format!("empty domain in '{}'", s)));
    }
    Ok((domain, props.trim()))
}

/// `k1=v1,k2=v2` 파싱. 중복 키, 빈 키, `=` 누락은 에러
pub(super) fn parse_properties(source: &str, props: &str) -> Result<Vec<(String, String)>> {
    let mut seen = BTreeMap::new();
    if props.is_empty() {
        return Ok(Vec::new());
    }

    for part in props.split(',') {
        let part = part.trim();
        // 패턴의 열린 속성 목록 표기
        if part == WILDCARD {
            continue;
        }
        let (key, value) = part.split_once('=').ok_or_else(|| {
            Error::InvalidName(format!("property '{}' has no '=' in '{}'", part, source))
        })?;
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return Err(Error::InvalidName(format!(
                "empty key or value in '{}'",
                source
            )));
        }
        if seen.insert(key.to_string(), value.to_string()).is_some() {
            return Err(Error::InvalidName(format!(
                "duplicate key '{}' in '{}'",
                key, source
            )));
        }
    }

    Ok(seen.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_order() {
        let a = ServiceName::new("app")
            .and_then(|n| n.with("name", "X"))
            .and_then(|n| n.with("type", "Greeter"))
            .unwrap();
        let b = ServiceName::new("app")
            .and_then(|n| n.with("type", "Greeter"))
            .and_then(|n| n.with("name", "X"))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.canonical(), "app:name=X,type=Greeter");
    }

    #[test]
    fn test_parse() {
        let name: ServiceName = " app : type=Greeter , name=X ".parse().unwrap();
        assert_eq!(name.domain(), "app");
        assert_eq!(name.property("name"), Some("X"));
        assert_eq!(name.property("type"), Some("Greeter"));
        assert_eq!(name.property("missing"), None);
    }

    #[test]
    fn test_parse_domain_only() {
        let name: ServiceName = "app:".parse().unwrap();
        assert!(name.properties().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "noColon",
            ":name=X",
            "app:name",
            "app:name=X,name=Y",
            "app:=X",
            "app:name=*",
            "app:name=X,*",
            "*:name=X",
        ] {
            let err = bad.parse::<ServiceName>().unwrap_err();
            assert!(matches!(err, Error::InvalidName(_)), "{}", bad);
        }
    }

    #[test]
    fn test_serde_uses_canonical_form() {
        let name = ServiceName::new("app").unwrap().with("name", "X").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"app:name=X\"");
        let back: ServiceName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_builder_rejects_non_canonical_parts() {
        let app = || ServiceName::new("app").unwrap();

        assert!(ServiceName::new("").is_err());
        assert!(ServiceName::new(" app").is_err());
        assert!(ServiceName::new("a:b").is_err());
        assert!(ServiceName::new("*").is_err());

        assert!(app().with("name", "a,b=c").is_err());
        assert!(app().with("name", "*").is_err());
        assert!(app().with("na=me", "X").is_err());
        assert!(app().with("name", "").is_err());
        assert!(app().with("name", "X ").is_err());
    }

    #[test]
    fn test_built_names_round_trip() {
        let names = [
            ServiceName::new("app").unwrap(),
            ServiceName::new("app").unwrap().with("name", "X").unwrap(),
            ServiceName::new("app")
                .unwrap()
                .with("name", "a=b")
                .unwrap()
                .with("url", "http://host:80")
                .unwrap()
                .with("glob", "X*")
                .unwrap(),
        ];

        for name in names {
            let parsed: ServiceName = name.canonical().parse().unwrap();
            assert_eq!(parsed, name);

            let json = serde_json::to_string(&name).unwrap();
            let back: ServiceName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, name);
        }
    }
}
