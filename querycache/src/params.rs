// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bind parameter typing for prepared statements
//!
//! Parameters arrive either positionally, in which case their bind kind is
//! inferred from the value content, or tagged with an explicit kind which
//! always wins. A single list must use one form or the other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::types::Value;

/// Bind kind understood by the database collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    Int,
    Float,
    String,
    Blob,
}

impl ParamKind {
    /// Single-letter tag (`i`, `d`, `s`, `b`)
    pub fn tag(&self) -> char {
        match self {
            ParamKind::Int => 'i',
            ParamKind::Float => 'd',
            ParamKind::String => 's',
            ParamKind::Blob => 'b',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'i' => Some(ParamKind::Int),
            'd' => Some(ParamKind::Float),
            's' => Some(ParamKind::String),
            'b' => Some(ParamKind::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for ParamKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(tag), None) => ParamKind::from_tag(tag).ok_or_else(|| {
                QueryError::InvalidParameterList(format!("unknown parameter kind tag '{}'", s))
            }),
            _ => Err(QueryError::InvalidParameterList(format!(
                "unknown parameter kind tag '{}'",
                s
            ))),
        }
    }
}

/// A parameter as supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Positional(Value),
    Tagged(ParamKind, Value),
}

impl Param {
    pub fn value(&self) -> &Value {
        match self {
            Param::Positional(value) | Param::Tagged(_, value) => value,
        }
    }
}

macro_rules! positional_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Param {
                fn from(value: $ty) -> Self {
                    Param::Positional(value.into())
                }
            }
        )*
    };
}

positional_from!(Value, i64, i32, f64, &str, String, Vec<u8>);

/// A typed parameter ready to bind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindParameter {
    pub kind: ParamKind,
    pub value: Value,
}

/// Infer the bind kind of a parameter
///
/// An explicit tag is used verbatim. Otherwise a value whose string form
/// round-trips through integer parsing binds as `Int`, one that round-trips
/// through float parsing binds as `Float`, other text binds as `String`, and
/// everything else as `Blob`.
pub fn infer(param: &Param) -> BindParameter {
    match param {
        Param::Tagged(kind, value) => BindParameter {
            kind: *kind,
            value: value.clone(),
        },
        Param::Positional(value) => infer_value(value),
    }
}

fn infer_value(value: &Value) -> BindParameter {
    match value {
        Value::Int(_) => BindParameter {
            kind: ParamKind::Int,
            value: value.clone(),
        },
        Value::Float(n) => numeric_from_text(&n.to_string()).unwrap_or(BindParameter {
            kind: ParamKind::Float,
            value: value.clone(),
        }),
        Value::Text(s) => numeric_from_text(s).unwrap_or(BindParameter {
            kind: ParamKind::String,
            value: value.clone(),
        }),
        Value::Null | Value::Blob(_) => BindParameter {
            kind: ParamKind::Blob,
            value: value.clone(),
        },
    }
}

fn numeric_from_text(text: &str) -> Option<BindParameter> {
    if let Ok(n) = text.parse::<i64>() {
        if n.to_string() == text {
            return Some(BindParameter {
                kind: ParamKind::Int,
                value: Value::Int(n),
            });
        }
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() && n.to_string() == text => Some(BindParameter {
            kind: ParamKind::Float,
            value: Value::Float(n),
        }),
        _ => None,
    }
}

/// Validated, homogeneous parameter list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    pub fn new(params: Vec<Param>) -> Result<Self, QueryError> {
        let list = Self { params };
        list.validate()?;
        Ok(list)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a positional parameter
    pub fn push_positional(&mut self, value: impl Into<Value>) -> Result<&mut Self, QueryError> {
        self.push(Param::Positional(value.into()))
    }

    /// Append a parameter with an explicit kind
    pub fn push_tagged(
        &mut self,
        kind: ParamKind,
        value: impl Into<Value>,
    ) -> Result<&mut Self, QueryError> {
        self.push(Param::Tagged(kind, value.into()))
    }

    fn push(&mut self, param: Param) -> Result<&mut Self, QueryError> {
        if let Some(first) = self.params.first() {
            if is_tagged(first) != is_tagged(&param) {
                return Err(mixed_forms());
            }
        }
        self.params.push(param);
        Ok(self)
    }

    fn validate(&self) -> Result<(), QueryError> {
        let tagged = self.params.iter().filter(|p| is_tagged(p)).count();
        if tagged != 0 && tagged != self.params.len() {
            return Err(mixed_forms());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Typed bindings in parameter order
    pub fn bind(&self) -> Vec<BindParameter> {
        self.params.iter().map(infer).collect()
    }

    /// Keys followed by values, `|`-joined: ordinal positions for
    /// positional lists, kind tags for tagged ones
    ///
    /// Every part is length-prefixed and values carry their variant tag, so
    /// distinct lists never produce the same text.
    pub fn discriminator(&self) -> String {
        let keys = self
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| match param {
                Param::Positional(_) => index.to_string(),
                Param::Tagged(kind, _) => kind.tag().to_string(),
            })
            .map(|key| format!("{}:{}", key.len(), key));
        let values = self.params.iter().map(|param| param.value().key_text());
        keys.chain(values).collect::<Vec<_>>().join("|")
    }
}

fn is_tagged(param: &Param) -> bool {
    matches!(param, Param::Tagged(..))
}

fn mixed_forms() -> QueryError {
    QueryError::InvalidParameterList(
        "positional and kind-tagged parameters cannot be mixed".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(values: Vec<Value>) -> Vec<ParamKind> {
        values
            .into_iter()
            .map(|v| infer(&Param::Positional(v)).kind)
            .collect()
    }

    #[test]
    fn test_inference_rules() {
        assert_eq!(
            kinds(vec![
                Value::from("42"),
                Value::from("3.14"),
                Value::from("abc"),
                Value::Int(42),
            ]),
            vec![
                ParamKind::Int,
                ParamKind::Float,
                ParamKind::String,
                ParamKind::Int
            ]
        );
    }

    #[test]
    fn test_numeric_text_must_round_trip() {
        assert_eq!(
            kinds(vec![
                Value::from("007"),
                Value::from("3.10"),
                Value::from("1e3"),
                Value::from(" 5"),
                Value::from("NaN"),
            ]),
            vec![ParamKind::String; 5]
        );
    }

    #[test]
    fn test_inferred_values_are_converted() {
        let bound = infer(&Param::from("42"));
        assert_eq!(bound.value, Value::Int(42));
        let bound = infer(&Param::from(3.0));
        assert_eq!(bound.kind, ParamKind::Int);
        assert_eq!(bound.value, Value::Int(3));
        let bound = infer(&Param::from(2.5));
        assert_eq!(bound.kind, ParamKind::Float);
    }

    #[test]
    fn test_non_text_degrades_to_blob() {
        assert_eq!(
            kinds(vec![Value::Null, Value::Blob(vec![1, 2])]),
            vec![ParamKind::Blob, ParamKind::Blob]
        );
    }

    #[test]
    fn test_explicit_tag_wins() {
        let bound = infer(&Param::Tagged(ParamKind::String, Value::from("99.3")));
        assert_eq!(bound.kind, ParamKind::String);
        assert_eq!(bound.value, Value::from("99.3"));
    }

    #[test]
    fn test_mixed_list_rejected() {
        let err = ParamList::new(vec![
            Param::Tagged(ParamKind::String, Value::from("a")),
            Param::from(7),
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameterList(_)));

        let mut list = ParamList::empty();
        list.push_positional("a").unwrap();
        assert!(list.push_tagged(ParamKind::Int, 1).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_discriminator_keys_then_values() {
        let list = ParamList::new(vec![Param::from("bob"), Param::from(3)]).unwrap();
        assert_eq!(list.discriminator(), "1:0|1:1|t3:bob|i1:3");

        let tagged = ParamList::new(vec![
            Param::Tagged(ParamKind::String, Value::from("99.3")),
            Param::Tagged(ParamKind::Int, Value::Int(7)),
        ])
        .unwrap();
        assert_eq!(tagged.discriminator(), "1:s|1:i|t4:99.3|i1:7");
        assert_eq!(ParamList::empty().discriminator(), "");
    }

    #[test]
    fn test_discriminator_is_unambiguous() {
        let split_left = ParamList::new(vec![Param::from("a|b"), Param::from("c")]).unwrap();
        let split_right = ParamList::new(vec![Param::from("a"), Param::from("b|c")]).unwrap();
        assert_ne!(split_left.discriminator(), split_right.discriminator());

        let null = ParamList::new(vec![Param::from(Value::Null)]).unwrap();
        let empty = ParamList::new(vec![Param::from("")]).unwrap();
        assert_ne!(null.discriminator(), empty.discriminator());

        let int = ParamList::new(vec![Param::from(1)]).unwrap();
        let text = ParamList::new(vec![Param::from("1")]).unwrap();
        let float = ParamList::new(vec![Param::from(1.0)]).unwrap();
        assert_ne!(int.discriminator(), text.discriminator());
        assert_ne!(int.discriminator(), float.discriminator());
    }

    #[test]
    fn test_kind_tag_parsing() {
        assert_eq!("d".parse::<ParamKind>().unwrap(), ParamKind::Float);
        assert!("x".parse::<ParamKind>().is_err());
        assert!("ii".parse::<ParamKind>().is_err());
    }
}
