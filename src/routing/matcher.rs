//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile path patterns once at registration time
//! - Match request paths segment by segment, capturing parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Trailing and repeated slashes are ignored
//! - `{name}` and `:name` both declare a parameter
//! - `*` matches one segment; a trailing `*` matches whatever remains
//! - No regex, matching is linear in the number of segments

use std::collections::HashMap;
use std::fmt;

/// Parameters captured by a successful match.
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
    TrailingWildcard,
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern. `"*"` alone matches every path.
    pub fn parse(pattern: &str) -> Self {
        let raw = normalize_path(pattern);
        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let last = parts.len().saturating_sub(1);

        let segments = parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if *part == "*" {
                    if i == last {
                        Segment::TrailingWildcard
                    } else {
                        Segment::Wildcard
                    }
                } else if let Some(name) = param_name(part) {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();

        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = PathParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::TrailingWildcard => return Some(params),
                Segment::Wildcard => {
                    parts.get(i)?;
                }
                Segment::Literal(literal) => {
                    if *parts.get(i)? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.get(i)?.to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Whether the pattern contains any wildcard segment.
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Wildcard | Segment::TrailingWildcard))
    }

    /// The same pattern in axum's route syntax, or `None` if it has wildcards.
    pub fn to_axum_path(&self) -> Option<String> {
        if self.has_wildcard() {
            return None;
        }
        if self.segments.is_empty() {
            return Some("/".to_string());
        }
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(name) => {
                    path.push('{');
                    path.push_str(name);
                    path.push('}');
                }
                Segment::Wildcard | Segment::TrailingWildcard => return None,
            }
        }
        Some(path)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix(':')
        .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .filter(|name| !name.is_empty())
}

/// Normalize a path: leading slash, no repeated or trailing slashes.
/// `"*"` is kept as `"/*"`.
pub fn normalize_path(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

/// Join a prefix and a path into a normalized path.
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{prefix}/{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::parse("/api/users");
        assert!(pattern.matches("/api/users").is_some());
        assert!(pattern.matches("/api/users/").is_some());
        assert!(pattern.matches("/api/Users").is_none()); // Case sensitive
        assert!(pattern.matches("/api/users/1").is_none());
        assert!(pattern.matches("/api").is_none());
    }

    #[test]
    fn test_params() {
        let pattern = PathPattern::parse("/users/{id}/posts/:post");
        let params = pattern.matches("/users/42/posts/7").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("post").map(String::as_str), Some("7"));
        assert!(pattern.matches("/users/42/posts").is_none());
    }

    #[test]
    fn test_wildcards() {
        let all = PathPattern::parse("*");
        assert!(all.matches("/").is_some());
        assert!(all.matches("/a/b/c").is_some());

        let trailing = PathPattern::parse("/api/*");
        assert!(trailing.matches("/api").is_some());
        assert!(trailing.matches("/api/v1/users").is_some());
        assert!(trailing.matches("/other").is_none());

        let middle = PathPattern::parse("/api/*/status");
        assert!(middle.matches("/api/v1/status").is_some());
        assert!(middle.matches("/api/status").is_none());
    }

    #[test]
    fn test_root() {
        let root = PathPattern::parse("/");
        assert!(root.matches("/").is_some());
        assert!(root.matches("").is_some());
        assert!(root.matches("/x").is_none());
    }

    #[test]
    fn test_axum_path() {
        assert_eq!(
            PathPattern::parse("/chat/:room").to_axum_path().as_deref(),
            Some("/chat/{room}")
        );
        assert_eq!(PathPattern::parse("/").to_axum_path().as_deref(), Some("/"));
        assert_eq!(PathPattern::parse("/files/*").to_axum_path(), None);
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/api", "users"), "/api/users");
        assert_eq!(join_paths("/api/", "/users/"), "/api/users");
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("/api", "*"), "/api/*");
    }
}
