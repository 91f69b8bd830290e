//! Route patterns
//!
//! Compiles path templates like `/item/:id`, `/sub/*` and `/multi/**` into
//! segment lists and matches request paths against them, extracting
//! parameter bindings. Matching is case-sensitive and segment-wise; there
//! is no implicit trailing-slash equivalence (`/a` and `/a/` are distinct
//! paths).

use std::collections::HashMap;

use thiserror::Error;

/// Binding key used by anonymous wildcards (`*` and `**`).
pub const WILDCARD_KEY: &str = "_";

/// A pattern whose `**` segment is not in final position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`**` must be the final segment of a route pattern: `{0}`")]
pub struct PatternError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Matches iff the path segment equals the text exactly.
    Static(String),
    /// Matches any single non-empty segment, binding it under the name.
    /// A bare `:` keeps the literal segment text as its binding key.
    Param(String),
    /// `*`: matches exactly one arbitrary segment, bound under `_`.
    Wildcard,
    /// `**` / `**:name`: consumes the remaining segments (possibly none),
    /// joined with `/`, bound under `_` or the given name. Must be final.
    WildcardDeep(Option<String>),
}

/// A compiled route pattern. Built once at registration, immutable after.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a pattern. Empty segments are dropped, so `/a/` registers
    /// the same pattern as `/a`.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let segments: Vec<Segment> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(parse_segment)
            .collect();

        if let Some(position) = segments
            .iter()
            .position(|s| matches!(s, Segment::WildcardDeep(_)))
        {
            if position + 1 != segments.len() {
                return Err(PatternError(pattern.to_string()));
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern text as registered.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Test a request path against this pattern. Returns the parameter
    /// bindings on a match, `None` otherwise.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts = path_segments(path);
        let mut params = HashMap::new();
        let mut cursor = 0;

        for segment in &self.segments {
            if let Segment::WildcardDeep(name) = segment {
                // Final by construction: consumes the rest unconditionally.
                let rest = parts[cursor..].join("/");
                let key = name.clone().unwrap_or_else(|| WILDCARD_KEY.to_string());
                params.insert(key, rest);
                return Some(params);
            }

            let Some(part) = parts.get(cursor) else {
                // Path exhausted before the pattern.
                return None;
            };
            match segment {
                Segment::Static(text) => {
                    if part != text {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), (*part).to_string());
                }
                Segment::Wildcard => {
                    params.insert(WILDCARD_KEY.to_string(), (*part).to_string());
                }
                Segment::WildcardDeep(_) => unreachable!("handled above"),
            }
            cursor += 1;
        }

        // Pattern exhausted: a match only if the path is too.
        if cursor == parts.len() {
            Some(params)
        } else {
            None
        }
    }
}

fn parse_segment(segment: &str) -> Segment {
    if let Some(rest) = segment.strip_prefix("**") {
        let name = rest
            .strip_prefix(':')
            .filter(|n| !n.is_empty())
            .map(String::from);
        return Segment::WildcardDeep(name);
    }
    if segment == "*" {
        return Segment::Wildcard;
    }
    if let Some(name) = segment.strip_prefix(':') {
        // `:` with no name still binds, under the literal segment text.
        if name.is_empty() {
            return Segment::Param(segment.to_string());
        }
        return Segment::Param(name.to_string());
    }
    Segment::Static(segment.to_string())
}

/// Split a request path into matchable segments. Only the leading slash is
/// stripped; a trailing slash yields a final empty segment, which is what
/// keeps `/a/` distinct from `/a`. The root path `/` has no segments.
pub(crate) fn path_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> RoutePattern {
        RoutePattern::parse(raw).expect("valid pattern")
    }

    #[test]
    fn test_static_match_is_exact_and_case_sensitive() {
        let p = pattern("/hello");
        assert!(p.match_path("/hello").is_some());
        assert!(p.match_path("/Hello").is_none());
        assert!(p.match_path("/hello/world").is_none());
        assert!(p.match_path("/hell").is_none());
    }

    #[test]
    fn test_root_pattern_matches_root_only() {
        let p = pattern("/");
        assert!(p.match_path("/").is_some());
        assert!(p.match_path("/x").is_none());
    }

    #[test]
    fn test_param_binds_segment() {
        let p = pattern("/item/:id");
        let params = p.match_path("/item/42").expect("match");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_param_rejects_empty_segment() {
        let p = pattern("/item/:id");
        assert!(p.match_path("/item/").is_none());
        assert!(p.match_path("/item").is_none());
    }

    #[test]
    fn test_wildcard_binds_single_segment() {
        let p = pattern("/sub/*");
        let params = p.match_path("/sub/guest").expect("match");
        assert_eq!(params.get(WILDCARD_KEY).map(String::as_str), Some("guest"));
        assert!(p.match_path("/sub/a/b").is_none());
        assert!(p.match_path("/sub").is_none());
    }

    #[test]
    fn test_deep_wildcard_joins_rest() {
        let p = pattern("/multi/**");
        let params = p.match_path("/multi/a/b/c").expect("match");
        assert_eq!(params.get(WILDCARD_KEY).map(String::as_str), Some("a/b/c"));
    }

    #[test]
    fn test_deep_wildcard_matches_zero_segments() {
        let p = pattern("/multi/**");
        let params = p.match_path("/multi").expect("match");
        assert_eq!(params.get(WILDCARD_KEY).map(String::as_str), Some(""));
    }

    #[test]
    fn test_named_deep_wildcard() {
        let p = pattern("/files/**:filepath");
        let params = p.match_path("/files/docs/a.txt").expect("match");
        assert_eq!(
            params.get("filepath").map(String::as_str),
            Some("docs/a.txt")
        );
    }

    #[test]
    fn test_bare_colon_binds_under_literal_text() {
        let p = pattern("/:");
        let params = p.match_path("/42").expect("match");
        assert_eq!(params.get(":").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_trailing_slash_paths_stay_distinct() {
        let p = pattern("/a");
        assert!(p.match_path("/a").is_some());
        assert!(p.match_path("/a/").is_none());
    }

    #[test]
    fn test_trailing_slash_pattern_is_normalized() {
        let p = pattern("/a/");
        assert!(p.match_path("/a").is_some());
        assert!(p.match_path("/a/").is_none());
    }

    #[test]
    fn test_non_final_deep_wildcard_is_rejected() {
        let err = RoutePattern::parse("/a/**/b").unwrap_err();
        assert_eq!(err, PatternError("/a/**/b".to_string()));
    }

    #[test]
    fn test_deep_wildcard_in_final_position_parses() {
        assert!(RoutePattern::parse("/a/**").is_ok());
    }
}
