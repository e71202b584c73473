//! Entity identity using string interning for cheap copies and comparisons
//!
//! This module provides the [`Id`] type. Every entity receives a freshly
//! generated id at creation; ids are never reassigned.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use rand::Rng;
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock")
}

/// Globally unique entity identifier.
///
/// Ids render as lowercase hex in the 8-4-4-4-12 layout. Copies are a
/// single integer since the text lives in the global interner.
///
/// # Examples
///
/// ```
/// use dataweave_core::identifier::Id;
///
/// let a = Id::generate();
/// let b = Id::generate();
/// assert_ne!(a, b);
///
/// // Existing ids can be found again from their text form
/// assert_eq!(Id::lookup(&a.to_string()), Some(a));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Generates an id that has never been handed out in this process.
    pub fn generate() -> Self {
        let mut interner = interner();
        let mut rng = rand::rng();
        loop {
            let bits: u128 = rng.random();
            let text = format_uuid(bits);
            if interner.get(&text).is_none() {
                return Self(interner.get_or_intern(&text));
            }
        }
    }

    /// Returns the id with the given text if it has been seen before.
    ///
    /// Unlike [`Id::from`], this never interns `text`, so probing arbitrary
    /// strings (e.g. a user-supplied "name or id") leaves no trace.
    pub fn lookup(text: &str) -> Option<Self> {
        interner().get(text).map(Self)
    }
}

/// Lays out the 128 bits as `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`.
fn format_uuid(bits: u128) -> String {
    let bits = (bits & !(0xf << 76)) | (0x4 << 76);
    let bits = (bits & !(0x3 << 62)) | (0x2 << 62);
    let hex = format!("{bits:032x}");
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{}", str_value)
    }
}

impl From<&str> for Id {
    /// Interns `text` as an id.
    ///
    /// Intended for backends restoring previously generated ids; new
    /// entities always use [`Id::generate`].
    fn from(text: &str) -> Self {
        Self(interner().get_or_intern(text))
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        let interner = interner();
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
