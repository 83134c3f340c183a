//! Runtime value types.
//!
//! Every position, input and output in the kernel is a JSON value. Agents
//! declare a `ValueType` for what they consume and produce, and the algebra
//! checks those declarations when agents are combined:
//!
//! - `admits(v)`: is `v` a member of the type
//! - `accepts(t)`: can a producer of `t` feed a consumer of `self`
//! - `unify(a, b)`: the common type two branches agree on
//!
//! Typing is gradual: `Any` is compatible with everything on either side.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The type of a JSON value flowing through an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "of")]
pub enum ValueType {
    /// Any value at all.
    Any,
    /// `null`.
    Null,
    Bool,
    Number,
    Text,
    /// A homogeneous array.
    List(Box<ValueType>),
    /// A two-element array `[left, right]`.
    Pair(Box<ValueType>, Box<ValueType>),
    /// An object carrying at least these fields.
    Record(BTreeMap<String, ValueType>),
}

impl ValueType {
    pub fn list(item: ValueType) -> Self {
        Self::List(Box::new(item))
    }

    pub fn pair(left: ValueType, right: ValueType) -> Self {
        Self::Pair(Box::new(left), Box::new(right))
    }

    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ValueType)>,
    {
        Self::Record(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// The narrowest type this module can name for `value`.
    ///
    /// Two-element arrays are pairs, other arrays lists of the most specific
    /// common item type (`any` when there is none); objects are records of
    /// their fields.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::Text,
            Value::Array(items) => match items.as_slice() {
                [left, right] => Self::pair(Self::of(left), Self::of(right)),
                _ => Self::list(
                    items
                        .iter()
                        .map(Self::of)
                        .try_fold(Self::Any, |acc, ty| Self::unify(&acc, &ty))
                        .unwrap_or(Self::Any),
                ),
            },
            Value::Object(map) => Self::Record(
                map.iter()
                    .map(|(name, v)| (name.clone(), Self::of(v)))
                    .collect(),
            ),
        }
    }

    /// Whether `value` inhabits this type.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Null, Value::Null) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::Text, Value::String(_)) => true,
            (Self::List(item), Value::Array(items)) => items.iter().all(|v| item.admits(v)),
            (Self::Pair(left, right), Value::Array(items)) => {
                items.len() == 2 && left.admits(&items[0]) && right.admits(&items[1])
            }
            (Self::Record(fields), Value::Object(map)) => fields
                .iter()
                .all(|(name, ty)| map.get(name).is_some_and(|v| ty.admits(v))),
            _ => false,
        }
    }

    /// Whether every value a producer of `produced` can emit is acceptable
    /// to a consumer expecting `self`.
    pub fn accepts(&self, produced: &ValueType) -> bool {
        match (self, produced) {
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::List(a), Self::List(b)) => a.accepts(b),
            (Self::List(a), Self::Pair(b1, b2)) => a.accepts(b1) && a.accepts(b2),
            (Self::Pair(a1, a2), Self::Pair(b1, b2)) => a1.accepts(b1) && a2.accepts(b2),
            (Self::Record(expected), Self::Record(provided)) => {
                expected.iter().all(|(name, ty)| {
                    provided
                        .get(name)
                        .is_some_and(|provided_ty| ty.accepts(provided_ty))
                })
            }
            (a, b) => a == b,
        }
    }

    /// The most specific type both `a` and `b` can be treated as, if any.
    pub fn unify(a: &ValueType, b: &ValueType) -> Option<ValueType> {
        match (a, b) {
            (Self::Any, other) | (other, Self::Any) => Some(other.clone()),
            (Self::List(x), Self::List(y)) => Self::unify(x, y).map(Self::list),
            (Self::Pair(x1, x2), Self::Pair(y1, y2)) => {
                Some(Self::pair(Self::unify(x1, y1)?, Self::unify(x2, y2)?))
            }
            (Self::Record(x), Self::Record(y)) => {
                let mut fields = BTreeMap::new();
                for name in x.keys().chain(y.keys()) {
                    let ty = match (x.get(name), y.get(name)) {
                        (Some(tx), Some(ty)) => Self::unify(tx, ty)?,
                        (Some(t), None) | (None, Some(t)) => t.clone(),
                        (None, None) => continue,
                    };
                    fields.insert(name.clone(), ty);
                }
                Some(Self::Record(fields))
            }
            (x, y) if x == y => Some(x.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
            Self::List(item) => write!(f, "[{item}]"),
            Self::Pair(left, right) => write!(f, "({left}, {right})"),
            Self::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn admits_structural_values() {
        assert!(ValueType::Number.admits(&json!(3)));
        assert!(!ValueType::Number.admits(&json!("3")));
        assert!(ValueType::pair(ValueType::Text, ValueType::Bool).admits(&json!(["a", true])));
        assert!(!ValueType::pair(ValueType::Text, ValueType::Bool).admits(&json!(["a"])));
        assert!(ValueType::list(ValueType::Number).admits(&json!([1, 2, 3])));
        assert!(ValueType::list(ValueType::Number).admits(&json!([])));

        let rec = ValueType::record([("output", ValueType::Number)]);
        assert!(rec.admits(&json!({"output": 1, "extra": "x"})));
        assert!(!rec.admits(&json!({"extra": "x"})));
    }

    #[test]
    fn accepts_is_gradual_and_width_subtyped() {
        assert!(ValueType::Number.accepts(&ValueType::Any));
        assert!(ValueType::Any.accepts(&ValueType::Text));
        assert!(!ValueType::Number.accepts(&ValueType::Text));

        let narrow = ValueType::record([("output", ValueType::Number)]);
        let wide = ValueType::record([
            ("output", ValueType::Number),
            ("observation", ValueType::Any),
        ]);
        assert!(narrow.accepts(&wide));
        assert!(!wide.accepts(&narrow));
    }

    #[test]
    fn literal_arrays_type_as_pairs_or_lists() {
        assert_eq!(
            ValueType::of(&json!([1, "a"])),
            ValueType::pair(ValueType::Number, ValueType::Text)
        );
        assert_eq!(
            ValueType::of(&json!([1, 2, 3])),
            ValueType::list(ValueType::Number)
        );
        assert_eq!(ValueType::of(&json!([1, "a", 2])), ValueType::list(ValueType::Any));
        assert_eq!(ValueType::of(&json!([])), ValueType::list(ValueType::Any));

        let pair = ValueType::of(&json!([1, 2]));
        assert!(ValueType::pair(ValueType::Any, ValueType::Any).accepts(&pair));
        assert!(ValueType::list(ValueType::Number).accepts(&pair));
        assert!(!ValueType::list(ValueType::Text).accepts(&pair));
    }

    #[test]
    fn unify_prefers_specific_side() {
        assert_eq!(
            ValueType::unify(&ValueType::Any, &ValueType::Number),
            Some(ValueType::Number)
        );
        assert_eq!(ValueType::unify(&ValueType::Bool, &ValueType::Text), None);
        assert_eq!(
            ValueType::unify(
                &ValueType::pair(ValueType::Any, ValueType::Text),
                &ValueType::pair(ValueType::Number, ValueType::Any)
            ),
            Some(ValueType::pair(ValueType::Number, ValueType::Text))
        );
    }

    #[test]
    fn display_is_compact() {
        let ty = ValueType::record([
            ("value", ValueType::pair(ValueType::Number, ValueType::Text)),
            ("attempts", ValueType::Number),
        ]);
        assert_eq!(ty.to_string(), "{attempts: number, value: (number, text)}");
        assert_eq!(ValueType::list(ValueType::Any).to_string(), "[any]");
    }
}
