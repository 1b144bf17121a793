use std::fmt;

/// An ordered sequence of string segments naming a node in the lock tree.
///
/// A path identifies the subtree of the protected resource an operation
/// touches, e.g. `["postType", "page", "42"]`. One path is an *ancestor* of
/// another iff its segments are a prefix of the other's; a path is considered
/// an ancestor of itself.
///
/// Paths convert from arrays, slices, and vectors of string-likes:
///
/// ```rust
/// use scope_lock::ScopePath;
///
/// let page: ScopePath = ["postType", "page"].into();
/// let one: ScopePath = page.child("42");
/// assert!(page.is_ancestor_of(&one));
/// assert_eq!(one.to_string(), "postType/page/42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScopePath {
    segments: Vec<String>,
}

impl ScopePath {
    /// Build a path from any iterator of string-like segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The empty path, naming the root of the lock tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// The path's segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; the root has zero.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Prefix relation, inclusive: every path is an ancestor of itself.
    pub fn is_ancestor_of(&self, other: &ScopePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments == other.segments[..self.segments.len()]
    }

    /// A new path one segment deeper.
    pub fn child(&self, segment: impl Into<String>) -> ScopePath {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        ScopePath { segments }
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for ScopePath {
    fn from(segments: [S; N]) -> Self {
        Self::new(segments)
    }
}

impl From<&[&str]> for ScopePath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl From<Vec<String>> for ScopePath {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&ScopePath> for ScopePath {
    fn from(path: &ScopePath) -> Self {
        path.clone()
    }
}
