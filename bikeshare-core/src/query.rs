//! Query construction for `find` operations.
//!
//! A [`Query`] carries an optional filter expression plus sort and limit. Backends
//! translate the expression tree through the [`QueryVisitor`] trait.
//!
//! ```ignore
//! use bikeshare::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("network_id", "velib"))
//!     .sort("name", SortDirection::Asc)
//!     .limit(50)
//!     .build();
//! ```

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value is one of the values in the given array.
    AnyOf,
    /// Field value is none of the values in the given array.
    NoneOf,
}

/// A filter expression tree.
///
/// Field names may use dotted paths (`last_stat.bikes`) to reach into nested documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression.
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// An existing AND is extended rather than nested.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// A structured query for retrieving documents from one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression; `None` matches every document.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Sort specification for results. Without one, backend order is kept.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a query matching every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Shorthand for a query consisting of a single filter.
    pub fn filter(expr: Expr) -> Self {
        Query { filter: Some(expr), ..Query::default() }
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper for constructing filter expressions.
///
/// ```ignore
/// let expr = Filter::eq("network_id", "velib").and(Filter::gt("last_stat.bikes", 0));
/// ```
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Matches documents whose field equals any element of `values`.
    pub fn any_of(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::AnyOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn none_of(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::NoneOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks an [`Expr`] tree, producing a backend-specific representation.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
