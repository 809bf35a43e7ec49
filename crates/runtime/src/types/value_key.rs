use crate::{Error, ErrorKind, QNumber, QString, QValue};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// The key type used by [ValueMap](crate::ValueMap) and [ValueSet](crate::ValueSet)
///
/// Only hashable values can be used as keys, see [QValue::is_hashable]. The hash of a
/// key agrees with structural equality, so e.g. `1` and `1.0` refer to the same entry.
#[derive(Clone, Debug)]
pub struct ValueKey(QValue);

impl ValueKey {
    /// Returns a reference to the key's value
    pub fn value(&self) -> &QValue {
        &self.0
    }
}

impl TryFrom<QValue> for ValueKey {
    type Error = Error;

    fn try_from(value: QValue) -> Result<Self, Self::Error> {
        if value.is_hashable() {
            Ok(Self(value))
        } else {
            Err(Error::from(ErrorKind::Type(format!(
                "only hashable values can be used as keys, found '{}'",
                value.type_as_string()
            ))))
        }
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        use QValue::*;

        match (&self.0, &other.0) {
            (Undefined, Undefined) => true,
            (Null, Null) => true,
            (Number(a), Number(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use QValue::*;

        match &self.0 {
            Undefined => state.write_u8(0),
            Null => state.write_u8(1),
            Number(n) => n.hash(state),
            Str(s) => s.hash(state),
            _ => {}
        }
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use QValue::*;

        match &self.0 {
            Undefined => f.write_str("undefined"),
            Null => f.write_str("null"),
            Number(n) => write!(f, "{n}"),
            Str(s) => f.write_str(s),
            _ => Ok(()),
        }
    }
}

impl From<QString> for ValueKey {
    fn from(value: QString) -> Self {
        Self(QValue::Str(value))
    }
}

impl From<&str> for ValueKey {
    fn from(value: &str) -> Self {
        Self(QValue::Str(value.into()))
    }
}

impl<T> From<T> for ValueKey
where
    QNumber: From<T>,
{
    fn from(value: T) -> Self {
        Self(QValue::Number(value.into()))
    }
}
