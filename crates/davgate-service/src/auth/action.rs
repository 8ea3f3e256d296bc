//! Read/modify classification of request methods.
//!
//! The modify class is a fixed table matched exactly and case-sensitively.
//! Every other method, including `PROPPATCH` and `LOCK`, is read-class and is
//! never blocked by a principal's modify flag.

/// Methods that mutate stored content.
pub const MODIFY_METHODS: [&str; 6] = ["PUT", "POST", "MKCOL", "DELETE", "COPY", "MOVE"];

/// The class of operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Fetches, listings, lock queries and everything not in the modify table.
    Read,
    /// Create, write, delete, copy, move, create-collection.
    Modify,
}

impl Action {
    #[must_use]
    pub const fn is_modify(self) -> bool {
        matches!(self, Self::Modify)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Modify => "modify",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a request method to its action class.
#[must_use]
pub fn action_for_method(method: &str) -> Action {
    if MODIFY_METHODS.contains(&method) {
        Action::Modify
    } else {
        Action::Read
    }
}
