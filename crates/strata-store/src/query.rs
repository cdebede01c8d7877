use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use strata_types::{Cursor, Value};

use crate::error::{StoreError, StoreResult};

/// Comparison operator of a property filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    /// Parse the textual operator (`=`, `!=`, `<`, `<=`, `>`, `>=`).
    pub fn parse(s: &str) -> StoreResult<Self> {
        match s.trim() {
            "=" | "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(StoreError::InvalidQuery(format!(
                "unknown filter operator {other:?}"
            ))),
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// A single property filter: `property op value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub property: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(property: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// Parse the `"<property> <op>"` form, e.g. `"Num >"` or `"Name ="`.
    pub fn parse(expr: &str, value: impl Into<Value>) -> StoreResult<Self> {
        let expr = expr.trim();
        let split = expr
            .find(|c| matches!(c, '=' | '<' | '>' | '!'))
            .ok_or_else(|| StoreError::InvalidQuery(format!("missing operator in {expr:?}")))?;
        let property = expr[..split].trim();
        if property.is_empty() {
            return Err(StoreError::InvalidQuery(format!(
                "missing property name in {expr:?}"
            )));
        }
        let op = FilterOp::parse(&expr[split..])?;
        Ok(Self::new(property, op, value))
    }

    /// Returns `true` if any of the record's values for this property
    /// satisfies the filter.
    pub fn matches<'a>(&self, mut values: impl Iterator<Item = &'a Value>) -> bool {
        values.any(|v| {
            v.compare(&self.value)
                .is_some_and(|ordering| self.op.accepts(ordering))
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.op, self.value)
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// An ordering clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn new(property: impl Into<String>, direction: Direction) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }
}

/// A store-level query over one kind.
///
/// Built by value, each method returning the extended query.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreQuery {
    pub kind: String,
    pub filters: Vec<Filter>,
    pub orders: Vec<Order>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub keys_only: bool,
    pub start: Option<Cursor>,
}

impl StoreQuery {
    /// A scan over every record of `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filters: Vec::new(),
            orders: Vec::new(),
            offset: 0,
            limit: None,
            keys_only: false,
            start: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Resume right after the position `cursor` marks.
    pub fn start(mut self, cursor: Cursor) -> Self {
        self.start = Some(cursor);
        self
    }
}

impl fmt::Display for StoreQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind={}", self.kind)?;
        for filter in &self.filters {
            write!(f, " filter({filter})")?;
        }
        for order in &self.orders {
            let dir = match order.direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            write!(f, " order({} {dir})", order.property)?;
        }
        if self.offset > 0 {
            write!(f, " offset={}", self.offset)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit={limit}")?;
        }
        if self.keys_only {
            write!(f, " keys_only")?;
        }
        if let Some(start) = self.start {
            write!(f, " start={}", start.encode())?;
        }
        Ok(())
    }
}
