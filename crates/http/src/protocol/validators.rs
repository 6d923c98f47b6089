//! Entity tag comparison (RFC 7232 section 2.3).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag {
    weak: bool,
    tag: String,
}

impl EntityTag {
    pub fn strong<S: Into<String>>(tag: S) -> Self {
        Self { weak: false, tag: tag.into() }
    }

    pub fn weak<S: Into<String>>(tag: S) -> Self {
        Self { weak: true, tag: tag.into() }
    }

    /// Parses `"tag"` or `W/"tag"`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (weak, quoted) = match value.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let tag = quoted.strip_prefix('"')?.strip_suffix('"')?;
        if tag.contains('"') {
            return None;
        }
        Some(Self { weak, tag: tag.to_string() })
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Both tags are strong and equal.
    pub fn strong_eq(&self, other: &EntityTag) -> bool {
        !self.weak && !other.weak && self.tag == other.tag
    }

    /// The opaque tags are equal, weakness ignored.
    pub fn weak_eq(&self, other: &EntityTag) -> bool {
        self.tag == other.tag
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            f.write_str("W/")?;
        }
        write!(f, "\"{}\"", self.tag)
    }
}

/// Evaluates an `If-None-Match` value against the current tag using weak comparison.
///
/// Returns true when the condition matches, i.e. `304 Not Modified` applies for GET/HEAD.
pub fn matches_if_none_match(if_none_match: &str, current: &EntityTag) -> bool {
    if if_none_match.trim() == "*" {
        return true;
    }
    if_none_match.split(',').filter_map(EntityTag::parse).any(|tag| tag.weak_eq(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_tags() {
        let a = EntityTag::parse("W/\"1\"").unwrap();
        let b = EntityTag::parse("W/\"1\"").unwrap();
        assert!(a.is_weak());
        assert!(a.weak_eq(&b));
        assert!(!a.strong_eq(&b));
    }

    #[test]
    fn strong_tags() {
        let a = EntityTag::parse("\"1\"").unwrap();
        let b = EntityTag::strong("1");
        assert!(a.weak_eq(&b));
        assert!(a.strong_eq(&b));
        assert!(!a.strong_eq(&EntityTag::weak("1")));
        assert!(!a.weak_eq(&EntityTag::strong("2")));
    }

    #[test]
    fn parse_rejects_unquoted() {
        assert!(EntityTag::parse("1").is_none());
        assert!(EntityTag::parse("W/1").is_none());
        assert_eq!(EntityTag::weak("x").to_string(), "W/\"x\"");
    }

    #[test]
    fn if_none_match() {
        let current = EntityTag::strong("abc");
        assert!(matches_if_none_match("*", &current));
        assert!(matches_if_none_match("\"x\", W/\"abc\"", &current));
        assert!(!matches_if_none_match("\"x\"", &current));
    }
}
