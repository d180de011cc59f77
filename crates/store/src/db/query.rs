//! Filter, ordering, pagination and aggregation value objects.
//!
//! Every repository exposes the same read surface over a per-entity field
//! enum (`UserField`, `ProductField`, ...). Filters are plain data; they are
//! rendered into parameterised SQL by [`Filter::render`] and never
//! interpolate caller values into the statement text.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite};

use super::RepositoryError;

/// Storage shape of a column, used to convert and type-check filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 64-bit integer column.
    Int,
    /// Fixed-point decimal stored as scaled integer.
    Decimal,
    /// Text column.
    Text,
    /// Boolean column.
    Bool,
    /// UTC timestamp.
    Timestamp,
}

impl FieldKind {
    /// Whether `aggregate` accepts this kind.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Decimal)
    }
}

/// A filterable, sortable column of some entity.
pub trait Field: Copy + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Column name in the table.
    fn column(self) -> &'static str;

    /// Storage shape of the column.
    fn kind(self) -> FieldKind;

    /// Field name as seen by callers (used in error messages).
    fn name(self) -> &'static str {
        self.column()
    }
}

/// Declare a field enum and its column mapping.
///
/// ```ignore
/// define_fields! {
///     /// Columns of [`TopBar`].
///     pub enum TopBarField {
///         Id => ("id", Int),
///         Title => ("title", Text),
///     }
/// }
/// ```
macro_rules! define_fields {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($column:literal, $kind:ident)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = concat!("`", $column, "` column.")]
                $variant,
            )+
        }

        impl $name {
            /// Every field, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl $crate::db::query::Field for $name {
            fn column(self) -> &'static str {
                match self {
                    $(Self::$variant => $column,)+
                }
            }

            fn kind(self) -> $crate::db::query::FieldKind {
                match self {
                    $(Self::$variant => $crate::db::query::FieldKind::$kind,)+
                }
            }
        }
    };
}

pub(crate) use define_fields;

/// A caller-supplied filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Integer operand.
    Int(i64),
    /// Exact decimal operand.
    Decimal(Decimal),
    /// Text operand (also used for enum codes and string keys).
    Text(String),
    /// Boolean operand.
    Bool(bool),
    /// Timestamp operand.
    Timestamp(DateTime<Utc>),
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )+
    };
}

value_from! {
    i64 => Int,
    i32 => Int,
    Decimal => Decimal,
    String => Text,
    &str => Text,
    bool => Bool,
    DateTime<Utc> => Timestamp,
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

macro_rules! value_from_typed {
    (int: $($id:ty),+) => {
        $(impl From<$id> for Value {
            fn from(v: $id) -> Self { Self::Int(v.as_i64()) }
        })+
    };
    (text: $($key:ty),+) => {
        $(impl From<$key> for Value {
            fn from(v: $key) -> Self { Self::Text(v.into()) }
        }
        impl From<&$key> for Value {
            fn from(v: &$key) -> Self { Self::Text(v.as_str().to_owned()) }
        })+
    };
    (code: $($enum:ty),+) => {
        $(impl From<$enum> for Value {
            fn from(v: $enum) -> Self { Self::Text(v.as_str().to_owned()) }
        })+
    };
}

use catalog_core::{
    AccountId, BrandCode, BrandId, CategoryId, Email, ProductCode, ProductId, ProductImageId, Role,
    SessionId, SettingId, SliderId, Slug, StockStatus, TopBarId, TranslationId, UserId,
};

value_from_typed!(int: UserId, AccountId, SessionId, TranslationId, SliderId, TopBarId);
value_from_typed!(text: CategoryId, BrandId, ProductId, ProductImageId, SettingId);
value_from_typed!(text: Email, Slug, BrandCode, ProductCode);
value_from_typed!(code: Role, StockStatus);

/// A value in its persisted representation, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stored {
    Null,
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Stored {
    /// Push this value as a bind parameter.
    pub(crate) fn bind(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Self::Null => qb.push_bind(None::<i64>),
            Self::Int(v) => qb.push_bind(v),
            Self::Text(v) => qb.push_bind(v),
            Self::Bool(v) => qb.push_bind(v),
            Self::Timestamp(v) => qb.push_bind(v),
        };
    }

    pub(crate) const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Convert a filter operand to its stored form for `field`.
pub(crate) fn to_stored<F: Field>(
    entity: &'static str,
    field: F,
    value: Value,
) -> Result<Stored, RepositoryError> {
    let mismatch = |found: &str| {
        RepositoryError::validation(
            entity,
            field.name(),
            format!("expected {:?} operand, found {found}", field.kind()),
        )
    };

    Ok(match (field.kind(), value) {
        (_, Value::Null) => Stored::Null,
        (FieldKind::Int, Value::Int(v)) => Stored::Int(v),
        (FieldKind::Decimal, Value::Int(v)) => {
            Stored::Int(to_fixed_field(entity, field, Decimal::from(v))?)
        }
        (FieldKind::Decimal, Value::Decimal(v)) => Stored::Int(to_fixed_field(entity, field, v)?),
        (FieldKind::Text, Value::Text(v)) => Stored::Text(v),
        (FieldKind::Bool, Value::Bool(v)) => Stored::Bool(v),
        (FieldKind::Timestamp, Value::Timestamp(v)) => Stored::Timestamp(v),
        (_, Value::Int(_)) => return Err(mismatch("integer")),
        (_, Value::Decimal(_)) => return Err(mismatch("decimal")),
        (_, Value::Text(_)) => return Err(mismatch("text")),
        (_, Value::Bool(_)) => return Err(mismatch("boolean")),
        (_, Value::Timestamp(_)) => return Err(mismatch("timestamp")),
    })
}

/// Encode a decimal for `field`, reporting precision loss as validation.
pub(crate) fn to_fixed_field<F: Field>(
    entity: &'static str,
    field: F,
    value: Decimal,
) -> Result<i64, RepositoryError> {
    catalog_core::to_fixed(value)
        .map_err(|e| RepositoryError::validation(entity, field.name(), e.to_string()))
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    const fn sql(self) -> &'static str {
        match self {
            // `IS` / `IS NOT` are null-safe in SQLite
            Self::Eq => " IS ",
            Self::Ne => " IS NOT ",
            Self::Lt => " < ",
            Self::Lte => " <= ",
            Self::Gt => " > ",
            Self::Gte => " >= ",
        }
    }
}

/// Case-sensitive substring match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Contains,
    StartsWith,
    EndsWith,
}

/// A single predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition<F> {
    /// `field <op> value`.
    Compare(F, Comparison, Value),
    /// `field IN (values)` or `NOT IN`.
    In {
        field: F,
        values: Vec<Value>,
        negated: bool,
    },
    /// Substring match on a text field.
    Text(F, TextMatch, String),
    /// `field IS NULL` or `IS NOT NULL`.
    Null { field: F, negated: bool },
    /// At least one of the nested filters holds.
    Any(Vec<Filter<F>>),
    /// The nested filter does not hold.
    Not(Box<Filter<F>>),
}

/// A conjunction of conditions. The empty filter matches every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter<F> {
    conditions: Vec<Condition<F>>,
}

impl<F> Default for Filter<F> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }
}

impl<F: Field> Filter<F> {
    /// The filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary condition.
    #[must_use]
    pub fn and(mut self, condition: Condition<F>) -> Self {
        self.conditions.push(condition);
        self
    }

    fn compare(self, field: F, op: Comparison, value: impl Into<Value>) -> Self {
        self.and(Condition::Compare(field, op, value.into()))
    }

    /// `field = value` (null-safe).
    #[must_use]
    pub fn eq(self, field: F, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Eq, value)
    }

    /// `field <> value` (null-safe).
    #[must_use]
    pub fn ne(self, field: F, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Ne, value)
    }

    /// `field < value`.
    #[must_use]
    pub fn lt(self, field: F, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Lt, value)
    }

    /// `field <= value`.
    #[must_use]
    pub fn lte(self, field: F, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Lte, value)
    }

    /// `field > value`.
    #[must_use]
    pub fn gt(self, field: F, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Gt, value)
    }

    /// `field >= value`.
    #[must_use]
    pub fn gte(self, field: F, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Gte, value)
    }

    /// `field IN (values)`. An empty set matches nothing.
    #[must_use]
    pub fn is_in<V: Into<Value>>(self, field: F, values: impl IntoIterator<Item = V>) -> Self {
        self.and(Condition::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        })
    }

    /// `field NOT IN (values)`. An empty set matches everything.
    #[must_use]
    pub fn not_in<V: Into<Value>>(self, field: F, values: impl IntoIterator<Item = V>) -> Self {
        self.and(Condition::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        })
    }

    /// Case-sensitive substring match.
    #[must_use]
    pub fn contains(self, field: F, needle: impl Into<String>) -> Self {
        self.and(Condition::Text(field, TextMatch::Contains, needle.into()))
    }

    /// Case-sensitive prefix match.
    #[must_use]
    pub fn starts_with(self, field: F, prefix: impl Into<String>) -> Self {
        self.and(Condition::Text(field, TextMatch::StartsWith, prefix.into()))
    }

    /// Case-sensitive suffix match.
    #[must_use]
    pub fn ends_with(self, field: F, suffix: impl Into<String>) -> Self {
        self.and(Condition::Text(field, TextMatch::EndsWith, suffix.into()))
    }

    /// `field IS NULL`.
    #[must_use]
    pub fn is_null(self, field: F) -> Self {
        self.and(Condition::Null {
            field,
            negated: false,
        })
    }

    /// `field IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self, field: F) -> Self {
        self.and(Condition::Null {
            field,
            negated: true,
        })
    }

    /// At least one of `filters` holds. No alternatives matches nothing.
    #[must_use]
    pub fn any_of(self, filters: impl IntoIterator<Item = Self>) -> Self {
        self.and(Condition::Any(filters.into_iter().collect()))
    }

    /// `filter` does not hold.
    #[must_use]
    pub fn not(self, filter: Self) -> Self {
        self.and(Condition::Not(Box::new(filter)))
    }

    /// Whether the filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE ...` (or nothing for the empty filter).
    pub(crate) fn push_where(
        &self,
        entity: &'static str,
        qb: &mut QueryBuilder<'_, Sqlite>,
    ) -> Result<(), RepositoryError> {
        if self.is_empty() {
            return Ok(());
        }
        qb.push(" WHERE ");
        self.render(entity, qb)
    }

    /// Render the conjunction as a parenthesised boolean expression.
    pub(crate) fn render(
        &self,
        entity: &'static str,
        qb: &mut QueryBuilder<'_, Sqlite>,
    ) -> Result<(), RepositoryError> {
        if self.conditions.is_empty() {
            qb.push("1");
            return Ok(());
        }
        qb.push("(");
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            render_condition(entity, condition, qb)?;
        }
        qb.push(")");
        Ok(())
    }
}

fn render_condition<F: Field>(
    entity: &'static str,
    condition: &Condition<F>,
    qb: &mut QueryBuilder<'_, Sqlite>,
) -> Result<(), RepositoryError> {
    match condition {
        Condition::Compare(field, op, value) => {
            let stored = to_stored(entity, *field, value.clone())?;
            if stored.is_null() && !matches!(op, Comparison::Eq | Comparison::Ne) {
                return Err(RepositoryError::validation(
                    entity,
                    field.name(),
                    "range comparison against null",
                ));
            }
            if field.kind() == FieldKind::Bool && !matches!(op, Comparison::Eq | Comparison::Ne) {
                return Err(RepositoryError::validation(
                    entity,
                    field.name(),
                    "range comparison on a boolean",
                ));
            }
            push_column(qb, *field);
            qb.push(op.sql());
            stored.bind(qb);
        }
        Condition::In {
            field,
            values,
            negated,
        } => {
            if values.is_empty() {
                qb.push(if *negated { "1" } else { "0" });
                return Ok(());
            }
            push_column(qb, *field);
            qb.push(if *negated { " NOT IN (" } else { " IN (" });
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                to_stored(entity, *field, value.clone())?.bind(qb);
            }
            qb.push(")");
        }
        Condition::Text(field, mode, needle) => {
            if field.kind() != FieldKind::Text {
                return Err(RepositoryError::validation(
                    entity,
                    field.name(),
                    "substring match on a non-text field",
                ));
            }
            match mode {
                TextMatch::Contains => {
                    qb.push("instr(");
                    push_column(qb, *field);
                    qb.push(", ");
                    qb.push_bind(needle.clone());
                    qb.push(") > 0");
                }
                TextMatch::StartsWith => {
                    qb.push("substr(");
                    push_column(qb, *field);
                    qb.push(", 1, length(");
                    qb.push_bind(needle.clone());
                    qb.push(")) = ");
                    qb.push_bind(needle.clone());
                }
                TextMatch::EndsWith => {
                    qb.push("(length(");
                    push_column(qb, *field);
                    qb.push(") >= length(");
                    qb.push_bind(needle.clone());
                    qb.push(") AND substr(");
                    push_column(qb, *field);
                    qb.push(", length(");
                    push_column(qb, *field);
                    qb.push(") - length(");
                    qb.push_bind(needle.clone());
                    qb.push(") + 1) = ");
                    qb.push_bind(needle.clone());
                    qb.push(")");
                }
            }
        }
        Condition::Null { field, negated } => {
            push_column(qb, *field);
            qb.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
        }
        Condition::Any(filters) => {
            if filters.is_empty() {
                qb.push("0");
                return Ok(());
            }
            qb.push("(");
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                filter.render(entity, qb)?;
            }
            qb.push(")");
        }
        Condition::Not(filter) => {
            qb.push("NOT ");
            filter.render(entity, qb)?;
        }
    }
    Ok(())
}

/// Push a double-quoted column identifier.
pub(crate) fn push_column<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, field: F) {
    push_ident(qb, field.column());
}

/// Push a double-quoted identifier.
pub(crate) fn push_ident(qb: &mut QueryBuilder<'_, Sqlite>, ident: &str) {
    qb.push("\"");
    qb.push(ident);
    qb.push("\"");
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    /// Field to sort on.
    pub field: F,
    /// Sort direction.
    pub direction: Direction,
}

impl<F> OrderBy<F> {
    /// Ascending on `field` (NULLs first).
    pub const fn asc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    /// Descending on `field` (NULLs last).
    pub const fn desc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Which slice of the ordered result to return.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Page {
    /// Every matching row.
    #[default]
    All,
    /// Skip `skip` rows, then return at most `take`.
    Offset {
        /// Rows to skip.
        skip: i64,
        /// Maximum rows to return.
        take: i64,
    },
    /// Return at most `take` rows that sort strictly after the row whose
    /// key is `key`.
    After {
        /// Key column values of the cursor row.
        key: Vec<Value>,
        /// Maximum rows to return.
        take: i64,
    },
}

impl Page {
    /// Offset pagination.
    #[must_use]
    pub const fn offset(skip: i64, take: i64) -> Self {
        Self::Offset { skip, take }
    }

    /// Keyset pagination after a single-column key.
    #[must_use]
    pub fn after(key: impl Into<Value>, take: i64) -> Self {
        Self::After {
            key: vec![key.into()],
            take,
        }
    }

    /// Keyset pagination after a compound key.
    #[must_use]
    pub const fn after_compound(key: Vec<Value>, take: i64) -> Self {
        Self::After { key, take }
    }
}

/// A complete `find_many` request.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<F> {
    /// Row predicate.
    pub filter: Filter<F>,
    /// Sort keys, most significant first. The primary key is always appended.
    pub order: Vec<OrderBy<F>>,
    /// Result window.
    pub page: Page,
}

impl<F> Default for Query<F> {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            order: Vec::new(),
            page: Page::All,
        }
    }
}

impl<F: Field> Query<F> {
    /// Every row, in primary-key order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = filter;
        self
    }

    /// Append a sort key.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy<F>) -> Self {
        self.order.push(order);
        self
    }

    /// Replace the page.
    #[must_use]
    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

impl<F: Field> From<Filter<F>> for Query<F> {
    fn from(filter: Filter<F>) -> Self {
        Self::new().filter(filter)
    }
}

/// Statistics for one numeric field over a filtered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAggregate<F> {
    /// The aggregated field.
    pub field: F,
    /// Number of non-null values.
    pub count: i64,
    /// Smallest value, `None` when no non-null values exist.
    pub min: Option<Decimal>,
    /// Largest value.
    pub max: Option<Decimal>,
    /// Exact sum.
    pub sum: Option<Decimal>,
    /// Exact mean (sum / count), rounded to 10 fractional digits.
    pub avg: Option<Decimal>,
}

/// Result of [`aggregate`](super::table::aggregate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate<F> {
    /// Number of rows matching the filter.
    pub count: i64,
    /// Per-field statistics, in the requested order.
    pub fields: Vec<FieldAggregate<F>>,
}

impl<F: Field + PartialEq> Aggregate<F> {
    /// Statistics for `field`, if it was requested.
    #[must_use]
    pub fn field(&self, field: F) -> Option<&FieldAggregate<F>> {
        self.fields.iter().find(|f| f.field == field)
    }
}
