// Route pattern parsing and canonicalization

use crate::Error;
use std::fmt;

/// Name bound by a wildcard segment written without one (`*` or `**`)
pub const DEFAULT_WILDCARD: &str = "wildcard";

/// One `/`-separated piece of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matched verbatim, case-sensitive
    Literal(String),
    /// Binds exactly one path segment to a name
    Param(String),
    /// Binds the remainder of the path; only valid as the last segment
    Wildcard(String),
}

/// A validated route pattern.
///
/// Both the colon syntax (`/users/:id/**`) and the brace syntax
/// (`/users/{id}/{*rest}`) are accepted; they canonicalize to the same
/// pattern, so `/a/:id` and `/a/{id}` name one route entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        if pattern.is_empty() {
            return Err(Error::MissingPath);
        }

        let rest = pattern.strip_prefix('/').ok_or_else(|| {
            Error::InvalidPattern(format!("'{}' must start with '/'", pattern))
        })?;

        let raw: Vec<&str> = rest.split('/').collect();
        let last = raw.len() - 1;
        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<String> = Vec::new();

        for (i, part) in raw.iter().enumerate() {
            let segment = parse_segment(part)
                .map_err(|reason| Error::InvalidPattern(format!("'{}': {}", pattern, reason)))?;

            match &segment {
                Segment::Wildcard(_) if i != last => {
                    return Err(Error::InvalidPattern(format!(
                        "'{}': wildcard must be the last segment",
                        pattern
                    )));
                }
                Segment::Param(name) | Segment::Wildcard(name) => {
                    if names.contains(name) {
                        return Err(Error::InvalidPattern(format!(
                            "'{}': parameter '{}' appears more than once",
                            pattern, name
                        )));
                    }
                    names.push(name.clone());
                }
                Segment::Literal(_) => {}
            }

            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names bound by this pattern, in order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard(_)))
    }

    /// Canonical colon-syntax form, used as the route-entry key
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Render in the brace syntax understood by `matchit`
    pub fn to_matchit(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                Segment::Wildcard(name) => {
                    out.push_str("{*");
                    out.push_str(name);
                    out.push('}');
                }
            }
        }
        out
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str("/")?;
            match segment {
                Segment::Literal(lit) => f.write_str(lit)?,
                Segment::Param(name) => write!(f, ":{}", name)?,
                Segment::Wildcard(name) => write!(f, "*{}", name)?,
            }
        }
        Ok(())
    }
}

fn parse_segment(part: &str) -> Result<Segment, String> {
    if let Some(name) = part.strip_prefix(':') {
        return named(name).map(Segment::Param);
    }

    if part == "*" || part == "**" {
        return Ok(Segment::Wildcard(DEFAULT_WILDCARD.to_string()));
    }

    if let Some(name) = part.strip_prefix('*') {
        return named(name).map(Segment::Wildcard);
    }

    if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        return match inner.strip_prefix('*') {
            Some(name) => named(name).map(Segment::Wildcard),
            None => named(inner).map(Segment::Param),
        };
    }

    if part.contains('{') || part.contains('}') {
        return Err(format!("unbalanced braces in segment '{}'", part));
    }

    Ok(Segment::Literal(part.to_string()))
}

fn named(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Err("parameter name must not be empty".to_string());
    }
    if name
        .chars()
        .any(|c| matches!(c, ':' | '*' | '{' | '}' | '/'))
    {
        return Err(format!("invalid parameter name '{}'", name));
    }
    Ok(name.to_string())
}
