use super::Expr;
use std::fmt;

/// A dotted reference, e.g. `author.name` or `books[year > 2000].title`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,

    /// Infix filter applied to the rows reached through this segment
    pub filter: Option<Box<Expr>>,
}

impl Path {
    pub fn new<I, S>(segments: I) -> Path
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            segments: segments
                .into_iter()
                .map(|name| PathSegment {
                    name: name.into(),
                    filter: None,
                })
                .collect(),
        }
    }

    /// Attaches an infix filter to the last segment.
    pub fn filter(mut self, expr: impl Into<Expr>) -> Path {
        if let Some(last) = self.segments.last_mut() {
            last.filter = Some(Box::new(expr.into()));
        }
        self
    }

    pub fn first(&self) -> &str {
        self.segments.first().map(|s| s.name.as_str()).unwrap_or("")
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().map(|s| s.name.as_str())
    }

    /// The path without its first segment.
    pub fn tail(&self) -> Path {
        Path {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.segments.push(PathSegment {
            name: name.into(),
            filter: None,
        });
    }

    pub fn has_filters(&self) -> bool {
        self.segments.iter().any(|s| s.filter.is_some())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for segment in &self.segments {
            write!(f, "{sep}{}", segment.name)?;
            if segment.filter.is_some() {
                f.write_str("[..]")?;
            }
            sep = ".";
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(value: &str) -> Self {
        Path::new(value.split('.'))
    }
}

impl From<String> for Path {
    fn from(value: String) -> Self {
        Path::from(value.as_str())
    }
}

impl From<&String> for Path {
    fn from(value: &String) -> Self {
        Path::from(value.as_str())
    }
}
