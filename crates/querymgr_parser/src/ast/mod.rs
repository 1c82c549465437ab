pub mod expr;
pub use expr::*;
pub mod explain;
pub use explain::*;
pub mod from;
pub use from::*;
pub mod insert;
pub use insert::*;
pub mod query;
pub use query::*;
pub mod select;
pub use select::*;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    pub value: String,
    /// If the identifier was written with double quotes.
    pub quoted: bool,
}

impl Ident {
    pub fn new_unquoted(s: impl Into<String>) -> Self {
        Ident {
            value: s.into(),
            quoted: false,
        }
    }

    pub fn new_quoted(s: impl Into<String>) -> Self {
        Ident {
            value: s.into(),
            quoted: true,
        }
    }

    /// Compare the identifier's value against `s` ignoring ascii case.
    ///
    /// Quoting is not taken into account.
    pub fn eq_ignore_case(&self, s: &str) -> bool {
        self.value.eq_ignore_ascii_case(s)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value.replace('"', "\"\""))
        } else {
            write!(f, "{}", self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectReference(pub Vec<Ident>);

impl ObjectReference {
    /// Create an object from an iterator of strings.
    ///
    /// Useful in tests, probably unlikely that it should be used anywhere else.
    pub fn from_strings<S>(strings: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        ObjectReference(strings.into_iter().map(Ident::new_unquoted).collect())
    }

    pub fn base(&self) -> Option<&Ident> {
        self.0.last()
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_separated(f, &self.0, ".")
    }
}

/// Write items separated by `sep`.
pub(crate) fn display_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
