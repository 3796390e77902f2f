//! The record mirror shared by the query synthesizer and response binder.
//!
//! A query is described by a plain struct deriving [`Shape`]. The derive
//! generates both directions of the bridge: a type-level walker that
//! writes the selection set, and a value-level mirror ([`Shape::node`])
//! that exposes the struct's fields as named, type-erased destinations
//! for the binder. Wrapper types compose structurally — `Option<T>` is
//! an optional (nullable) destination, `Vec<T>` a sequence, `Box<T>` is
//! transparent — and scalar leaves registered with [`scalar!`](crate::scalar)
//! are opaque on both sides: no selection set, atomic decoding.

use serde_json::Value;

use crate::error::DecodeError;

/// A node in a GraphQL query shape.
///
/// Implemented by `#[derive(Shape)]` for records, by the wrapper impls
/// below for `Option`/`Vec`/`Box`, and by the [`scalar!`](crate::scalar)
/// macro for opaque scalar leaves.
pub trait Shape {
    /// Append this type's selection-set contribution to `buf`.
    ///
    /// When `inline` is set the record's fields are written without the
    /// wrapping `{…}`, inlined into the parent selection.
    fn write_selection(buf: &mut String, inline: bool)
    where
        Self: Sized;

    /// Whether this shape (or an inline-fragment subtree promoted from
    /// it) can receive the JSON key. Answerable without a value, so the
    /// binder can test unallocated optional subtrees.
    fn probe(key: &str) -> bool
    where
        Self: Sized;

    /// The binding mirror of this value.
    fn node(&mut self) -> Node<'_>;

    /// Object-safe counterpart of [`Shape::probe`].
    fn accepts(&self, key: &str) -> bool;
}

/// A type-erased binding destination, as seen by the response binder.
pub enum Node<'a> {
    /// A record: an ordered list of named fields.
    Object(Vec<Field<'a>>),
    /// A sequence destination.
    List(&'a mut dyn ListShape),
    /// An optional (nullable) destination.
    Optional(&'a mut dyn OptionShape),
    /// An opaque scalar leaf.
    Scalar(&'a mut dyn ScalarShape),
}

/// One field of a record destination.
pub struct Field<'a> {
    /// The spelling the binder matches against the JSON key: the bare
    /// alias when the field carries a tag, else the `lowerCamelCase` of
    /// the field name. For promoted fields this is instead the inline
    /// fragment's type condition (`ClosedEvent` for `... on ClosedEvent`),
    /// empty for flattened fields.
    pub name: &'static str,
    /// Extra accepted spelling from a `json = "..."` attribute.
    pub json_name: Option<&'static str>,
    /// Inline-fragment or flattened field: the field itself is skipped
    /// and its own fields are matched at the parent level.
    pub promote: bool,
    /// Where the matched value goes.
    pub dest: &'a mut dyn Shape,
}

/// An optional destination (`Option<T>`).
pub trait OptionShape {
    fn is_some(&self) -> bool;
    /// Reset the destination to `None`.
    fn set_none(&mut self);
    /// The inner destination, allocating a default value if absent.
    fn get_or_insert(&mut self) -> &mut dyn Shape;
}

/// A sequence destination (`Vec<T>`).
pub trait ListShape {
    /// Discard any prior contents.
    fn reset(&mut self);
    /// Append a default element and return it as a destination.
    fn append_default(&mut self) -> &mut dyn Shape;
}

/// An opaque scalar destination: receives the raw JSON value verbatim.
pub trait ScalarShape {
    fn bind_scalar(&mut self, value: &Value) -> Result<(), DecodeError>;
}

impl<T: Shape + Default> Shape for Option<T> {
    fn write_selection(buf: &mut String, _inline: bool) {
        T::write_selection(buf, false);
    }

    fn probe(key: &str) -> bool {
        T::probe(key)
    }

    fn node(&mut self) -> Node<'_> {
        Node::Optional(self)
    }

    fn accepts(&self, key: &str) -> bool {
        T::probe(key)
    }
}

impl<T: Shape + Default> OptionShape for Option<T> {
    fn is_some(&self) -> bool {
        Option::is_some(self)
    }

    fn set_none(&mut self) {
        *self = None;
    }

    fn get_or_insert(&mut self) -> &mut dyn Shape {
        let inner: &mut T = self.get_or_insert_with(T::default);
        inner
    }
}

impl<T: Shape + Default> Shape for Vec<T> {
    fn write_selection(buf: &mut String, _inline: bool) {
        T::write_selection(buf, false);
    }

    fn probe(key: &str) -> bool {
        T::probe(key)
    }

    fn node(&mut self) -> Node<'_> {
        Node::List(self)
    }

    fn accepts(&self, key: &str) -> bool {
        T::probe(key)
    }
}

impl<T: Shape + Default> ListShape for Vec<T> {
    fn reset(&mut self) {
        Vec::clear(self);
    }

    fn append_default(&mut self) -> &mut dyn Shape {
        self.push(T::default());
        let last = self.len() - 1;
        &mut self[last]
    }
}

impl<T: Shape> Shape for Box<T> {
    fn write_selection(buf: &mut String, inline: bool) {
        T::write_selection(buf, inline);
    }

    fn probe(key: &str) -> bool {
        T::probe(key)
    }

    fn node(&mut self) -> Node<'_> {
        (**self).node()
    }

    fn accepts(&self, key: &str) -> bool {
        (**self).accepts(key)
    }
}

/// Register opaque GraphQL scalar types.
///
/// A scalar contributes no selection set — even if it is structurally a
/// record — and the binder hands it the raw JSON value, decoded through
/// the type's `serde::Deserialize` impl:
///
/// ```ignore
/// #[derive(Default, serde::Deserialize)]
/// struct GitObjectId(String);
///
/// shapeql::scalar!(GitObjectId);
/// ```
#[macro_export]
macro_rules! scalar {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Shape for $ty {
            fn write_selection(_buf: &mut ::std::string::String, _inline: bool) {}

            fn probe(_key: &str) -> bool {
                false
            }

            fn node(&mut self) -> $crate::Node<'_> {
                $crate::Node::Scalar(self)
            }

            fn accepts(&self, _key: &str) -> bool {
                false
            }
        }

        impl $crate::ScalarShape for $ty {
            fn bind_scalar(
                &mut self,
                value: &$crate::serde_json::Value,
            ) -> ::std::result::Result<(), $crate::DecodeError> {
                *self = <$ty as $crate::serde::Deserialize>::deserialize(value)
                    .map_err($crate::DecodeError::Scalar)?;
                ::std::result::Result::Ok(())
            }
        }
    )+};
}

/// The GraphQL `ID` scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ID(pub String);

impl From<&str> for ID {
    fn from(s: &str) -> Self {
        ID(s.to_string())
    }
}

impl From<String> for ID {
    fn from(s: String) -> Self {
        ID(s)
    }
}

impl std::fmt::Display for ID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, ID);
scalar!(Value, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::FixedOffset>);
