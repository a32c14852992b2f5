//! Resource patterns and actions.
//!
//! Pattern grammar, `/`-separated:
//! - `name`   matches that exact segment
//! - `:name`  matches any single non-empty segment
//! - `*`      (last segment only) matches the rest of the path, including nothing

use crate::policy::PolicyError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Segment {
    Literal(String),
    Param,
    Rest,
}

/// A compiled resource pattern. Ordering and equality follow the source text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourcePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl ResourcePattern {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let invalid = |why: &str| PolicyError::InvalidPattern {
            pattern: raw.to_string(),
            reason: why.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let parts: Vec<&str> = path_segments(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(invalid("'*' is only allowed as the last segment"));
                }
                Segment::Rest
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("parameter segment needs a name"));
                }
                Segment::Param
            } else if part.contains('*') || part.contains(':') {
                return Err(invalid("wildcards must span a whole segment"));
            } else {
                Segment::Literal((*part).to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut requested = path_segments(path);
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Param => {
                    if requested.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(lit) => match requested.next() {
                    Some(seg) if seg == lit => {}
                    _ => return false,
                },
            }
        }
        requested.next().is_none()
    }
}

impl core::fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Empty segments are ignored, so `/user//list/` and `/user/list` are the same
/// resource.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// What a rule permits: one HTTP method, or any.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Any,
    Method(String),
}

impl Action {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Action::Any);
        }
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PolicyError::InvalidAction(raw.to_string()));
        }
        Ok(Action::Method(raw.to_ascii_uppercase()))
    }

    pub fn permits(&self, method: &str) -> bool {
        match self {
            Action::Any => true,
            Action::Method(m) => m.eq_ignore_ascii_case(method),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Any => "*",
            Action::Method(m) => m,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat(s: &str) -> ResourcePattern {
        ResourcePattern::parse(s).unwrap()
    }

    #[test]
    fn literal_patterns_match_exactly() {
        let p = pat("/user/list");
        assert!(p.matches("/user/list"));
        assert!(p.matches("/user/list/"));
        assert!(p.matches("//user//list"));
        assert!(!p.matches("/user"));
        assert!(!p.matches("/user/list/extra"));
        assert!(!p.matches("/user/lists"));
    }

    #[test]
    fn params_match_one_segment() {
        let p = pat("/user/:id");
        assert!(p.matches("/user/42"));
        assert!(!p.matches("/user"));
        assert!(!p.matches("/user/42/roles"));
    }

    #[test]
    fn trailing_star_matches_any_remainder() {
        let p = pat("/policy/*");
        assert!(p.matches("/policy"));
        assert!(p.matches("/policy/admin"));
        assert!(p.matches("/policy/admin/deep/path"));
        assert!(!p.matches("/policyx"));

        assert!(pat("/*").matches("/anything/at/all"));
        assert!(pat("/*").matches("/"));
    }

    #[test]
    fn root_pattern_matches_only_root() {
        let p = pat("/");
        assert!(p.matches("/"));
        assert!(!p.matches("/user"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(ResourcePattern::parse("user").is_err());
        assert!(ResourcePattern::parse("/a/*/b").is_err());
        assert!(ResourcePattern::parse("/a/:").is_err());
        assert!(ResourcePattern::parse("/a/b*").is_err());
        assert!(ResourcePattern::parse("/a/x:y").is_err());
    }

    #[test]
    fn actions_are_case_insensitive_methods_or_any() {
        assert_eq!(Action::parse("get").unwrap(), Action::Method("GET".into()));
        assert!(Action::parse("GET").unwrap().permits("get"));
        assert!(!Action::parse("GET").unwrap().permits("POST"));
        assert!(Action::parse("*").unwrap().permits("DELETE"));
        assert!(Action::parse("").is_err());
        assert!(Action::parse("GE T").is_err());
    }
}
