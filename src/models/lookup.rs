//! Explicit presence/absence of a fetched resource.

/// Outcome of fetching a single resource.
///
/// A missing resource is a value the caller must match on, not an error.
///
/// # Example
///
/// ```
/// use hubkit::Lookup;
///
/// let found: Lookup<u32> = Lookup::Found(7);
/// assert_eq!(found.map(|n| n * 2).into_option(), Some(14));
/// assert!(Lookup::<u32>::Absent.is_absent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The resource exists.
    Found(T),
    /// The server reported no such resource.
    Absent,
}

impl<T> Lookup<T> {
    /// Whether the resource was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Whether the resource was absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Transform the found value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Absent => Lookup::Absent,
        }
    }

    /// Transform the found value with a fallible function.
    pub fn try_map<U, E, F>(self, f: F) -> Result<Lookup<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        match self {
            Lookup::Found(value) => f(value).map(Lookup::Found),
            Lookup::Absent => Ok(Lookup::Absent),
        }
    }

    /// Convert into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::Absent,
        }
    }
}
