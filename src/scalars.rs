//! Custom scalars and the registry that keeps their names unique.
//!
//! GraphQL needs globally unique type names, so range scalars are memoized by
//! their bounds: asking twice for `int_range(1, 10)` yields the same type.
//! The registry is built once during schema assembly and read afterwards.

use std::sync::Arc;

use async_graphql::Value as GqlValue;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::{ScalarDef, TypeDef, TypeRef};

pub const DATE: &str = "Date";
pub const OBJECT_ID: &str = "ObjectID";

static OBJECT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScalarError {
    #[error("Expected an integer value")]
    ExpectedInteger,
    #[error("Value must be between {min} and {max}")]
    OutOfRange { min: i64, max: i64 },
    #[error("Expected a date string (YYYY-MM-DD)")]
    InvalidDate,
    #[error("Expected a 24 character hex ObjectID")]
    InvalidObjectId,
}

// ------------------------------- IntRange --------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub fn name(&self) -> String {
        format!("IntRangeType{}_{}", bound(self.min), bound(self.max))
    }

    pub fn parse_literal(&self, value: &GqlValue) -> Result<i64, ScalarError> {
        let GqlValue::Number(n) = value else { return Err(ScalarError::ExpectedInteger) };
        let v = n.as_i64().ok_or(ScalarError::ExpectedInteger)?;
        if v < self.min || v > self.max {
            return Err(ScalarError::OutOfRange { min: self.min, max: self.max });
        }
        Ok(v)
    }

    fn definition(self) -> ScalarDef {
        ScalarDef {
            name: self.name(),
            description: Some(format!("An integer between {} and {}", self.min, self.max)),
            validator: Some(Arc::new(move |v: &GqlValue| self.parse_literal(v).map(drop).map_err(|e| e.to_string()))),
        }
    }
}

// '-' is not legal in a GraphQL name
fn bound(v: i64) -> String {
    if v < 0 { format!("Neg{}", v.unsigned_abs()) } else { v.to_string() }
}

// ------------------------------- Builtins --------------------------------- //

pub fn parse_date(value: &GqlValue) -> Result<chrono::NaiveDate, ScalarError> {
    let GqlValue::String(s) = value else { return Err(ScalarError::InvalidDate) };
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ScalarError::InvalidDate)
}

pub fn parse_object_id(value: &GqlValue) -> Result<&str, ScalarError> {
    match value {
        GqlValue::String(s) if OBJECT_ID_RE.is_match(s) => Ok(s),
        _ => Err(ScalarError::InvalidObjectId),
    }
}

pub fn date_scalar() -> ScalarDef {
    ScalarDef {
        name: DATE.to_string(),
        description: Some("A date string, such as 2007-12-03, compliant with the full-date format".to_string()),
        validator: Some(Arc::new(|v: &GqlValue| parse_date(v).map(drop).map_err(|e| e.to_string()))),
    }
}

pub fn object_id_scalar() -> ScalarDef {
    ScalarDef {
        name: OBJECT_ID.to_string(),
        description: Some("A field whose value conforms with the standard mongodb object ID".to_string()),
        validator: Some(Arc::new(|v: &GqlValue| parse_object_id(v).map(drop).map_err(|e| e.to_string()))),
    }
}

/// Definition for a builtin custom scalar name, if it is one.
pub fn builtin(name: &str) -> Option<ScalarDef> {
    match name {
        DATE => Some(date_scalar()),
        OBJECT_ID => Some(object_id_scalar()),
        _ => None,
    }
}

// ------------------------------- Registry --------------------------------- //

#[derive(Debug, Default)]
pub struct ScalarRegistry {
    int_ranges: IndexMap<(i64, i64), IntRange>,
}

impl ScalarRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn int_range(&mut self, min: i64, max: i64) -> TypeRef {
        let range = *self.int_ranges.entry((min, max)).or_insert_with(|| {
            tracing::trace!(min, max, "registering int range scalar");
            IntRange { min, max }
        });
        TypeRef::named(range.name())
    }

    pub fn len(&self) -> usize { self.int_ranges.len() }
    pub fn is_empty(&self) -> bool { self.int_ranges.is_empty() }

    /// Every scalar this registry has handed out, plus `Date` and `ObjectID`.
    pub fn definitions(&self) -> Vec<TypeDef> {
        let mut out: Vec<TypeDef> = vec![date_scalar().into(), object_id_scalar().into()];
        out.extend(self.int_ranges.values().map(|r| TypeDef::Scalar(r.definition())));
        out
    }
}

// ------------------------------- Tests ------------------------------------ //
