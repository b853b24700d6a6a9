use super::Error;

/// The composition graph reachable from a deep write contains a cycle.
#[derive(Debug)]
pub(super) struct CircularCompositionError {
    path: Vec<String>,
}

impl std::error::Error for CircularCompositionError {}

impl core::fmt::Display for CircularCompositionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "circular composition: {}", self.path.join(" -> "))
    }
}

impl Error {
    /// Creates a circular composition error. `path` lists the nodes of the
    /// cycle, starting and ending with the repeated node.
    pub fn circular_composition(path: Vec<String>) -> Error {
        Error::from(super::ErrorKind::CircularComposition(
            CircularCompositionError { path },
        ))
    }

    /// Returns `true` if this error is a circular composition error.
    pub fn is_circular_composition(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::CircularComposition(_))
    }
}
