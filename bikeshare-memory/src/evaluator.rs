//! Filter evaluation for in-memory records.
//!
//! Implements the subset of the engine's matching rules the models rely on:
//! dotted field paths, numeric widening, and "missing field" semantics where
//! `Ne` and `NoneOf` match records that lack the field.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, DateTime, oid::ObjectId};

use bikeshare_core::{
    document::Record,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};


/// Comparable representation of BSON values.
///
/// Numeric types are normalised to f64 so that `3` and `3.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Binary, decimal, timestamp, regex and the rest: equal only to the identical value.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect()
            ),
            Bson::Null | Bson::Undefined => Comparable::Null,
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path (`last_stat.bikes`, `location.coordinates.0`) inside a record.
pub(crate) fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Bson::Document(doc) => doc.get(part)?,
            Bson::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

pub(crate) struct RecordEvaluator<'a> {
    record: &'a Record,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    pub fn matches(record: &Record, expr: &Expr) -> DocumentStoreResult<bool> {
        RecordEvaluator::new(record).evaluate(expr)
    }

    pub fn filter_records(
        records: impl IntoIterator<Item = Record>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<Record>> {
        let mut matched = Vec::new();

        for record in records {
            if Self::matches(&record, expr)? {
                matched.push(record);
            }
        }

        Ok(matched)
    }
}

/// Equality as the engine applies it: an array field also matches one of its elements.
fn equals(field_value: &Comparable<'_>, value: &Comparable<'_>) -> bool {
    if field_value == value {
        return true;
    }

    match field_value {
        Comparable::Array(items) => items.contains(value),
        _ => false,
    }
}

fn any_equal(field_value: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match (field_value, values) {
        (Comparable::Array(items), Comparable::Array(values)) => {
            items.iter().any(|item| values.contains(item))
        }
        (single_value, Comparable::Array(values)) => values.contains(single_value),
        (Comparable::Array(items), single_value) => items.contains(single_value),
        (left, right) => left == right,
    }
}

impl<'a> QueryVisitor for RecordEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.record, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.record, field) else {
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NoneOf));
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => equals(&left, &right),
            FieldOp::Ne => !equals(&left, &right),
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::AnyOf => match right {
                Comparable::Array(_) => any_equal(&left, &right),
                _ => return Err(DocumentStoreError::Backend("AnyOf operator requires an array value".to_string())),
            },
            FieldOp::NoneOf => match right {
                Comparable::Array(_) => !any_equal(&left, &right),
                _ => return Err(DocumentStoreError::Backend("NoneOf operator requires an array value".to_string())),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikeshare_core::query::Filter;
    use bson::{Binary, doc, spec::BinarySubtype};

    fn station() -> Record {
        doc! {
            "_id": "s1",
            "network_id": "velib",
            "location": { "type": "Point", "coordinates": [2.35, 48.85] },
            "last_stat": { "bikes": 4, "free": 11 },
            "tags": ["kiosk", "ebike"],
        }
    }

    #[test]
    fn equality_widens_numbers() {
        let record = station();

        assert!(RecordEvaluator::matches(&record, &Filter::eq("last_stat.bikes", 4.0)).unwrap());
        assert!(!RecordEvaluator::matches(&record, &Filter::eq("last_stat.bikes", 5)).unwrap());
    }

    #[test]
    fn equality_matches_array_members() {
        let record = station();

        assert!(RecordEvaluator::matches(&record, &Filter::eq("tags", "ebike")).unwrap());
        assert!(!RecordEvaluator::matches(&record, &Filter::eq("tags", "bench")).unwrap());
    }

    #[test]
    fn missing_fields_match_only_negations() {
        let record = station();

        assert!(!RecordEvaluator::matches(&record, &Filter::eq("license", "x")).unwrap());
        assert!(RecordEvaluator::matches(&record, &Filter::ne("license", "x")).unwrap());
        assert!(RecordEvaluator::matches(&record, &Filter::not_exists("distance")).unwrap());
    }

    #[test]
    fn paths_reach_into_arrays() {
        let record = station();

        assert_eq!(lookup(&record, "location.coordinates.1"), Some(&Bson::Double(48.85)));
        assert_eq!(lookup(&record, "location.coordinates.2"), None);
        assert!(RecordEvaluator::matches(&record, &Filter::gt("location.coordinates.0", 2.0)).unwrap());
    }

    #[test]
    fn any_of_and_none_of() {
        let record = station();

        assert!(RecordEvaluator::matches(&record, &Filter::any_of("network_id", ["bicing", "velib"])).unwrap());
        assert!(RecordEvaluator::matches(&record, &Filter::none_of("network_id", ["bicing"])).unwrap());
    }

    #[test]
    fn unrecognised_types_compare_by_value() {
        let record = doc! { "_id": Binary { subtype: BinarySubtype::Generic, bytes: vec![1; 4] } };
        let other = Binary { subtype: BinarySubtype::Generic, bytes: vec![2; 4] };

        assert!(!RecordEvaluator::matches(&record, &Filter::eq("_id", other)).unwrap());
        assert!(!RecordEvaluator::matches(&record, &Filter::eq("_id", Bson::Null)).unwrap());
        assert!(
            RecordEvaluator::matches(
                &record,
                &Filter::eq("_id", Binary { subtype: BinarySubtype::Generic, bytes: vec![1; 4] }),
            )
            .unwrap()
        );
    }

    #[test]
    fn filter_records_keeps_order() {
        let records = vec![
            doc! { "_id": 1, "n": "a" },
            doc! { "_id": 2, "n": "b" },
            doc! { "_id": 3, "n": "a" },
        ];

        let matched = RecordEvaluator::filter_records(records, &Filter::eq("n", "a")).unwrap();

        assert_eq!(matched.iter().map(|r| r.get_i32("_id").unwrap()).collect::<Vec<_>>(), vec![1, 3]);
    }
}
