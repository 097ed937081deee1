//! Compact representation of the `!` and `[...]` wrappers of a GraphQL type reference.
//!
//! A [`Wrapping`] fits in a `u16`:
//! - bit 0: whether the inner named type is required,
//! - bits 1..=4: the number of list wrappers,
//! - bits 5..: one bit per list, innermost first, set when that list is required.

use std::fmt;

const INNER_IS_REQUIRED: u16 = 0b1;
const LIST_COUNT_SHIFT: u16 = 1;
const LIST_COUNT_MASK: u16 = 0b1111 << LIST_COUNT_SHIFT;
const LIST_FLAGS_SHIFT: u16 = 5;

/// Maximum number of nested lists we can represent.
pub const MAX_LIST_WRAPPINGS: u8 = 11;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Wrapping(u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListWrapping {
    RequiredList,
    NullableList,
}

impl Wrapping {
    pub const fn nullable() -> Self {
        Wrapping(0)
    }

    pub const fn required() -> Self {
        Wrapping(INNER_IS_REQUIRED)
    }

    pub fn new(required: bool) -> Self {
        if required {
            Self::required()
        } else {
            Self::nullable()
        }
    }

    fn list_count(self) -> u8 {
        ((self.0 & LIST_COUNT_MASK) >> LIST_COUNT_SHIFT) as u8
    }

    fn list_flag(index: u8) -> u16 {
        1 << (LIST_FLAGS_SHIFT + u16::from(index))
    }

    fn with_list_count(self, count: u8) -> Self {
        Wrapping((self.0 & !LIST_COUNT_MASK) | (u16::from(count) << LIST_COUNT_SHIFT))
    }

    pub fn inner_is_required(self) -> bool {
        self.0 & INNER_IS_REQUIRED != 0
    }

    /// Whether the outermost wrapper, list or named type, is required.
    pub fn is_required(self) -> bool {
        match self.list_count() {
            0 => self.inner_is_required(),
            n => self.0 & Self::list_flag(n - 1) != 0,
        }
    }

    pub fn is_nullable(self) -> bool {
        !self.is_required()
    }

    pub fn is_list(self) -> bool {
        self.list_count() > 0
    }

    /// Whether the type carries any wrapper at all.
    pub fn is_wrapped(self) -> bool {
        self.0 != 0
    }

    pub fn wrap_list(self) -> Self {
        let count = self.list_count();
        assert!(count < MAX_LIST_WRAPPINGS, "too many list wrappings");
        Wrapping(self.with_list_count(count + 1).0 & !Self::list_flag(count))
    }

    pub fn wrap_list_non_null(self) -> Self {
        let count = self.list_count();
        assert!(count < MAX_LIST_WRAPPINGS, "too many list wrappings");
        Wrapping(self.with_list_count(count + 1).0 | Self::list_flag(count))
    }

    /// Marks the outermost wrapper as required.
    pub fn wrap_non_null(self) -> Self {
        match self.list_count() {
            0 => Wrapping(self.0 | INNER_IS_REQUIRED),
            n => Wrapping(self.0 | Self::list_flag(n - 1)),
        }
    }

    pub fn non_null(self) -> Self {
        self.wrap_non_null()
    }

    /// Strips the required flag of the outermost wrapper.
    pub fn without_non_null(self) -> Self {
        match self.list_count() {
            0 => Wrapping(self.0 & !INNER_IS_REQUIRED),
            n => Wrapping(self.0 & !Self::list_flag(n - 1)),
        }
    }

    /// The wrapping of the items if this is a list.
    pub fn without_list(self) -> Option<Self> {
        let mut wrapping = self.to_mutable();
        wrapping.pop_outermost_list_wrapping()?;
        Some(wrapping.into())
    }

    /// List wrappers from the innermost to the outermost one.
    pub fn list_wrappings(self) -> impl DoubleEndedIterator<Item = ListWrapping> + ExactSizeIterator {
        (0..self.list_count()).map(move |index| {
            if self.0 & Self::list_flag(index) != 0 {
                ListWrapping::RequiredList
            } else {
                ListWrapping::NullableList
            }
        })
    }

    pub fn to_mutable(self) -> MutableWrapping {
        MutableWrapping { inner: self }
    }

    pub fn type_display(self, name: &str) -> impl fmt::Display + '_ {
        TypeDisplay { wrapping: self, name }
    }

    pub fn write_type_string(self, name: &str, mut formatter: impl fmt::Write) -> fmt::Result {
        for _ in 0..self.list_count() {
            formatter.write_char('[')?;
        }
        formatter.write_str(name)?;
        if self.inner_is_required() {
            formatter.write_char('!')?;
        }
        for list in self.list_wrappings() {
            formatter.write_char(']')?;
            if list == ListWrapping::RequiredList {
                formatter.write_char('!')?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Wrapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wrapping(\"{}\")", self.type_display("T"))
    }
}

struct TypeDisplay<'a> {
    wrapping: Wrapping,
    name: &'a str,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.wrapping.write_type_string(self.name, f)
    }
}

/// A [`Wrapping`] being peeled off from the outside in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutableWrapping {
    inner: Wrapping,
}

impl MutableWrapping {
    pub fn is_required(&self) -> bool {
        self.inner.inner_is_required()
    }

    pub fn is_list(&self) -> bool {
        self.inner.is_list()
    }

    pub fn pop_outermost_list_wrapping(&mut self) -> Option<ListWrapping> {
        let count = self.inner.list_count();
        if count == 0 {
            return None;
        }
        let index = count - 1;
        let flag = Wrapping::list_flag(index);
        let list = if self.inner.0 & flag != 0 {
            ListWrapping::RequiredList
        } else {
            ListWrapping::NullableList
        };
        self.inner = Wrapping(self.inner.0 & !flag).with_list_count(index);
        Some(list)
    }

    pub fn push_outermost_list_wrapping(&mut self, list: ListWrapping) {
        self.inner = match list {
            ListWrapping::RequiredList => self.inner.wrap_list_non_null(),
            ListWrapping::NullableList => self.inner.wrap_list(),
        };
    }
}

impl From<MutableWrapping> for Wrapping {
    fn from(value: MutableWrapping) -> Self {
        value.inner
    }
}
