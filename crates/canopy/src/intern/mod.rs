//! # String Interning
//!
//! Process-wide string interning for grammar symbols.
//!
//! Every [`Terminal`](crate::grammar::Terminal) and
//! [`NonTerminal`](crate::grammar::NonTerminal) is identified by an
//! [`InternedStr`]: a small copyable key into a global, append-only string
//! table. Equality and hashing compare keys, never string contents, which is
//! what makes symbols cheap to copy through charts and forests.
//!
//! The table lives for the whole process and is only ever appended to, so
//! resolved strings are `&'static str` and interning is safe from any thread.

use std::fmt;
use std::sync::OnceLock;

use lasso::{Spur, ThreadedRodeo};

static SYMBOLS: OnceLock<ThreadedRodeo> = OnceLock::new();

fn symbols() -> &'static ThreadedRodeo {
    SYMBOLS.get_or_init(ThreadedRodeo::new)
}

/// A key into the process-wide symbol table.
///
/// Cheap to copy and compare. Resolve the underlying text with
/// [`InternedStr::as_str`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedStr(Spur);

impl InternedStr {
    /// Intern `s`, returning its key. Interning the same string twice yields
    /// the same key.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(symbols().get_or_intern(s))
    }

    /// Look up the key for an already-interned string, if any.
    #[must_use]
    pub fn get(s: &str) -> Option<Self> {
        symbols().get(s).map(Self)
    }

    /// Resolve this key back to its string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        symbols().resolve(&self.0)
    }
}

impl fmt::Debug for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for InternedStr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serialize")]
impl<'de> serde::Deserialize<'de> for InternedStr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}
