//! Generic reads and writes shared by every repository.
//!
//! A [`Table`] describes one persisted entity: its table name, key columns,
//! declared references and restricting dependents. The functions here build
//! parameterised statements for it and translate driver failures into
//! [`RepositoryError`]s that name the offending field or constraint.

use std::borrow::Cow;
use std::fmt;

use chrono::Utc;
use futures::stream::BoxStream;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use catalog_core::{
    AccountId, BrandId, CategoryId, ProductId, ProductImageId, SessionId, SettingId, SliderId,
    TopBarId, TranslationId, UserId, from_fixed,
};

use super::RepositoryError;
use super::query::{
    Aggregate, Direction, Field, FieldAggregate, FieldKind, Filter, OrderBy, Page, Query, Stored,
    Value, push_column, push_ident, to_stored,
};

/// A foreign key column declared by a table. The target column is always `id`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reference {
    pub column: &'static str,
    pub table: &'static str,
}

/// A column in another table that restricts deletion of this table's rows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
}

/// Primary (or compound unique) key of a table.
pub(crate) trait TableKey: fmt::Display + Send + Sync {
    /// One value per key column, in [`Table::KEY`] order.
    fn key_values(&self) -> Vec<Value>;
}

macro_rules! table_key {
    ($($ty:ty),+ $(,)?) => {
        $(impl TableKey for $ty {
            fn key_values(&self) -> Vec<Value> {
                vec![Value::from(self.clone())]
            }
        })+
    };
}

table_key!(
    UserId,
    AccountId,
    SessionId,
    TranslationId,
    SliderId,
    TopBarId,
    CategoryId,
    BrandId,
    ProductId,
    ProductImageId,
    SettingId,
);

/// Persisted entity description.
pub(crate) trait Table: Sized + Send + Unpin + 'static {
    /// Table name.
    const NAME: &'static str;
    /// Entity name used in errors.
    const ENTITY: &'static str;
    /// Key columns, also the final sort tiebreaker.
    const KEY: &'static [Self::Field];
    /// Foreign keys this table declares.
    const REFERENCES: &'static [Reference] = &[];
    /// Restricting foreign keys that point at this table.
    const DEPENDENTS: &'static [Dependent] = &[];
    /// Whether the table carries `created_at`/`updated_at`.
    const TIMESTAMPS: bool = true;

    type Field: Field;
    type Key: TableKey;
    type Row: for<'r> FromRow<'r, SqliteRow> + Into<Self> + Send + Unpin;
}

/// Column assignments for an insert or update.
#[derive(Debug, Clone)]
pub(crate) struct ChangeSet<F> {
    entries: Vec<(F, Value)>,
}

impl<F: Field> ChangeSet<F> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Assign `value` to `field`.
    pub(crate) fn set(&mut self, field: F, value: impl Into<Value>) -> &mut Self {
        self.entries.push((field, value.into()));
        self
    }

    /// Assign `value` to `field` only when present.
    pub(crate) fn set_opt<V: Into<Value>>(&mut self, field: F, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_stored(
        self,
        entity: &'static str,
    ) -> Result<Vec<(&'static str, Stored)>, RepositoryError> {
        self.entries
            .into_iter()
            .map(|(field, value)| Ok((field.column(), to_stored(entity, field, value)?)))
            .collect()
    }
}

fn select_from<T: Table>() -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT * FROM ");
    push_ident(&mut qb, T::NAME);
    qb
}

fn push_key<T: Table>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    key: Vec<Value>,
) -> Result<(), RepositoryError> {
    if key.len() != T::KEY.len() {
        return Err(RepositoryError::validation(
            T::ENTITY,
            "key",
            format!("expected {} key values, got {}", T::KEY.len(), key.len()),
        ));
    }
    for (i, (field, value)) in T::KEY.iter().zip(key).enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        push_column(qb, *field);
        qb.push(" = ");
        to_stored(T::ENTITY, *field, value)?.bind(qb);
    }
    Ok(())
}

fn render_key(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fetch one row by key.
pub(crate) async fn fetch_by_key<T: Table>(
    conn: &mut SqliteConnection,
    key: &T::Key,
) -> Result<Option<T>, RepositoryError> {
    let mut qb = select_from::<T>();
    qb.push(" WHERE ");
    push_key::<T>(&mut qb, key.key_values())?;
    let row = qb.build_query_as::<T::Row>().fetch_optional(conn).await?;
    Ok(row.map(Into::into))
}

/// Fetch one row by key or fail with `NotFound`.
pub(crate) async fn get_by_key<T: Table>(
    conn: &mut SqliteConnection,
    key: &T::Key,
) -> Result<T, RepositoryError> {
    fetch_by_key::<T>(conn, key)
        .await?
        .ok_or_else(|| RepositoryError::not_found(T::ENTITY, key))
}

/// First row matching `filter` in key order.
pub(crate) async fn find_first<T: Table>(
    conn: &mut SqliteConnection,
    filter: Filter<T::Field>,
) -> Result<Option<T>, RepositoryError> {
    let query = Query::new().filter(filter).page(Page::offset(0, 1));
    Ok(find_many::<T>(conn, &query).await?.into_iter().next())
}

/// Sort keys with the key columns appended as tiebreakers.
fn sort_keys<T: Table>(order: &[OrderBy<T::Field>]) -> Vec<OrderBy<T::Field>> {
    let mut keys = order.to_vec();
    for field in T::KEY {
        if !keys.iter().any(|o| o.field == *field) {
            keys.push(OrderBy::asc(*field));
        }
    }
    keys
}

/// Read the sort-key values of the cursor row.
async fn cursor_values<T: Table>(
    conn: &mut SqliteConnection,
    key: &[Value],
    order: &[OrderBy<T::Field>],
) -> Result<Vec<Stored>, RepositoryError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
    for (i, o) in order.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_column(&mut qb, o.field);
    }
    qb.push(" FROM ");
    push_ident(&mut qb, T::NAME);
    qb.push(" WHERE ");
    push_key::<T>(&mut qb, key.to_vec())?;

    let row = qb
        .build()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found(T::ENTITY, render_key(key)))?;

    order
        .iter()
        .enumerate()
        .map(|(i, o)| decode_stored(&row, i, o.field.kind()))
        .collect()
}

/// Sort-key values of a fetched `SELECT *` row, read by column name.
fn sort_values<F: Field>(row: &SqliteRow, order: &[OrderBy<F>]) -> Result<Vec<Stored>, RepositoryError> {
    order
        .iter()
        .map(|o| decode_stored(row, o.field.column(), o.field.kind()))
        .collect()
}

fn decode_stored<I>(row: &SqliteRow, index: I, kind: FieldKind) -> Result<Stored, RepositoryError>
where
    I: sqlx::ColumnIndex<SqliteRow>,
{
    Ok(match kind {
        FieldKind::Int | FieldKind::Decimal => row
            .try_get::<Option<i64>, _>(index)?
            .map_or(Stored::Null, Stored::Int),
        FieldKind::Text => row
            .try_get::<Option<String>, _>(index)?
            .map_or(Stored::Null, Stored::Text),
        FieldKind::Bool => row
            .try_get::<Option<bool>, _>(index)?
            .map_or(Stored::Null, Stored::Bool),
        FieldKind::Timestamp => row
            .try_get::<Option<chrono::DateTime<Utc>>, _>(index)?
            .map_or(Stored::Null, Stored::Timestamp),
    })
}

/// Rows strictly after the cursor in `order`.
///
/// Ascending keys sort `NULL` first and descending keys sort it last,
/// matching `SQLite`'s default collation of `NULL`.
fn push_keyset<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, order: &[OrderBy<F>], cursor: &[Stored]) {
    qb.push("(");
    for (i, (key, value)) in order.iter().zip(cursor).enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push("(");
        for (prefix, prefix_value) in order.iter().zip(cursor).take(i) {
            push_column(qb, prefix.field);
            qb.push(" IS ");
            prefix_value.clone().bind(qb);
            qb.push(" AND ");
        }
        match (key.direction, value.is_null()) {
            (Direction::Asc, true) => {
                push_column(qb, key.field);
                qb.push(" IS NOT NULL");
            }
            (Direction::Asc, false) => {
                push_column(qb, key.field);
                qb.push(" > ");
                value.clone().bind(qb);
            }
            (Direction::Desc, true) => {
                qb.push("0");
            }
            (Direction::Desc, false) => {
                qb.push("(");
                push_column(qb, key.field);
                qb.push(" < ");
                value.clone().bind(qb);
                qb.push(" OR ");
                push_column(qb, key.field);
                qb.push(" IS NULL)");
            }
        }
        qb.push(")");
    }
    qb.push(")");
}

fn push_order<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, order: &[OrderBy<F>]) {
    qb.push(" ORDER BY ");
    for (i, o) in order.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_column(qb, o.field);
        qb.push(match o.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
    }
}

fn check_window(entity: &'static str, name: &'static str, n: i64) -> Result<i64, RepositoryError> {
    if n < 0 {
        return Err(RepositoryError::validation(
            entity,
            name,
            "must not be negative",
        ));
    }
    Ok(n)
}

/// Rows fetched per connection checkout while streaming.
const STREAM_BATCH: i64 = 256;

/// Render a select over `order`, starting after `cursor` when one is given.
fn render_select<T: Table>(
    filter: &Filter<T::Field>,
    order: &[OrderBy<T::Field>],
    cursor: Option<&[Stored]>,
    window: Option<(i64, i64)>,
) -> Result<QueryBuilder<'static, Sqlite>, RepositoryError> {
    let mut qb = select_from::<T>();
    filter.push_where(T::ENTITY, &mut qb)?;
    if let Some(cursor) = cursor {
        qb.push(if filter.is_empty() { " WHERE " } else { " AND " });
        push_keyset(&mut qb, order, cursor);
    }
    push_order(&mut qb, order);

    if let Some((take, skip)) = window {
        qb.push(" LIMIT ");
        qb.push_bind(take);
        if skip > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(skip);
        }
    }
    Ok(qb)
}

/// Resolve a page into its starting cursor and `(take, skip)` window.
async fn resolve_page<T: Table>(
    conn: &mut SqliteConnection,
    page: &Page,
    order: &[OrderBy<T::Field>],
) -> Result<(Option<Vec<Stored>>, Option<(i64, i64)>), RepositoryError> {
    Ok(match page {
        Page::All => (None, None),
        Page::Offset { skip, take } => (
            None,
            Some((
                check_window(T::ENTITY, "take", *take)?,
                check_window(T::ENTITY, "skip", *skip)?,
            )),
        ),
        Page::After { key, take } => {
            let take = check_window(T::ENTITY, "take", *take)?;
            (Some(cursor_values::<T>(conn, key, order).await?), Some((take, 0)))
        }
    })
}

/// Rows matching `query`.
pub(crate) async fn find_many<T: Table>(
    conn: &mut SqliteConnection,
    query: &Query<T::Field>,
) -> Result<Vec<T>, RepositoryError> {
    let order = sort_keys::<T>(&query.order);
    let (cursor, window) = resolve_page::<T>(conn, &query.page, &order).await?;
    let mut qb = render_select::<T>(&query.filter, &order, cursor.as_deref(), window)?;
    let rows = qb.build_query_as::<T::Row>().fetch_all(conn).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Lazily stream rows matching `query`. Each call starts a fresh scan.
///
/// Rows are read in keyset batches of [`STREAM_BATCH`]. A connection is only
/// held while a batch is fetched, never while the consumer handles a row, so
/// other repository calls can run between items.
pub(crate) fn stream<T: Table>(
    pool: &SqlitePool,
    query: Query<T::Field>,
) -> BoxStream<'static, Result<T, RepositoryError>> {
    let pool = pool.clone();
    Box::pin(async_stream::try_stream! {
        let order = sort_keys::<T>(&query.order);
        let (mut cursor, window) = {
            let mut conn = pool.acquire().await?;
            resolve_page::<T>(&mut conn, &query.page, &order).await?
        };
        let mut remaining = window.map(|(take, _)| take);
        let mut skip = window.map_or(0, |(_, skip)| skip);

        loop {
            let take = remaining.map_or(STREAM_BATCH, |left| left.min(STREAM_BATCH));
            if take == 0 {
                break;
            }

            let (records, next) = {
                let mut conn = pool.acquire().await?;
                let mut qb = render_select::<T>(
                    &query.filter,
                    &order,
                    cursor.as_deref(),
                    Some((take, skip)),
                )?;
                let rows = qb.build().fetch_all(&mut *conn).await?;
                let next = rows.last().map(|row| sort_values(row, &order)).transpose()?;
                let records = rows
                    .iter()
                    .map(|row| <T::Row as FromRow<'_, SqliteRow>>::from_row(row).map(Into::into))
                    .collect::<Result<Vec<T>, _>>()?;
                (records, next)
            };

            let fetched = i64::try_from(records.len()).unwrap_or(i64::MAX);
            if let Some(left) = remaining.as_mut() {
                *left -= fetched;
            }
            skip = 0;
            if let Some(next) = next {
                cursor = Some(next);
            }

            for record in records {
                yield record;
            }
            if fetched < take {
                break;
            }
        }
    })
}

/// Number of rows matching `filter`.
pub(crate) async fn count<T: Table>(
    conn: &mut SqliteConnection,
    filter: &Filter<T::Field>,
) -> Result<i64, RepositoryError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
    push_ident(&mut qb, T::NAME);
    filter.push_where(T::ENTITY, &mut qb)?;
    Ok(qb.build_query_scalar::<i64>().fetch_one(conn).await?)
}

/// Row count plus per-field statistics over rows matching `filter`.
pub(crate) async fn aggregate<T: Table>(
    conn: &mut SqliteConnection,
    filter: &Filter<T::Field>,
    fields: &[T::Field],
) -> Result<Aggregate<T::Field>, RepositoryError> {
    if let Some(field) = fields.iter().find(|f| !f.kind().is_numeric()) {
        return Err(RepositoryError::validation(
            T::ENTITY,
            field.name(),
            "aggregates are only defined for numeric fields",
        ));
    }

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
    for field in fields {
        for func in ["COUNT", "MIN", "MAX", "SUM"] {
            qb.push(", ");
            qb.push(func);
            qb.push("(");
            push_column(&mut qb, *field);
            qb.push(")");
        }
    }
    qb.push(" FROM ");
    push_ident(&mut qb, T::NAME);
    filter.push_where(T::ENTITY, &mut qb)?;

    let row = qb.build().fetch_one(conn).await?;
    let count: i64 = row.try_get(0)?;

    let mut stats = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let base = 1 + i * 4;
        let decode = |v: i64| match field.kind() {
            FieldKind::Decimal => from_fixed(v),
            _ => Decimal::from(v),
        };
        let non_null: i64 = row.try_get(base)?;
        let min = row.try_get::<Option<i64>, _>(base + 1)?.map(decode);
        let max = row.try_get::<Option<i64>, _>(base + 2)?.map(decode);
        let sum = row.try_get::<Option<i64>, _>(base + 3)?.map(decode);
        let avg = sum
            .filter(|_| non_null > 0)
            .and_then(|s| s.checked_div(Decimal::from(non_null)))
            .map(|a| a.round_dp(10).normalize());
        stats.push(FieldAggregate {
            field: *field,
            count: non_null,
            min,
            max,
            sum,
            avg,
        });
    }

    Ok(Aggregate {
        count,
        fields: stats,
    })
}

fn with_timestamps<T: Table>(values: &mut Vec<(&'static str, Stored)>, on_insert: bool) {
    if !T::TIMESTAMPS {
        return;
    }
    let now = Utc::now();
    let columns: &[&'static str] = if on_insert {
        &["created_at", "updated_at"]
    } else {
        &["updated_at"]
    };
    for &column in columns {
        if !values.iter().any(|(c, _)| *c == column) {
            values.push((column, Stored::Timestamp(now)));
        }
    }
}

/// Insert a row and return it as stored.
pub(crate) async fn insert<T: Table>(
    conn: &mut SqliteConnection,
    changes: ChangeSet<T::Field>,
) -> Result<T, RepositoryError> {
    let mut values = changes.into_stored(T::ENTITY)?;
    with_timestamps::<T>(&mut values, true);

    let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO ");
    push_ident(&mut qb, T::NAME);
    if values.is_empty() {
        qb.push(" DEFAULT VALUES");
    } else {
        qb.push(" (");
        for (i, (column, _)) in values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_ident(&mut qb, column);
        }
        qb.push(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            value.clone().bind(&mut qb);
        }
        qb.push(")");
    }
    qb.push(" RETURNING *");

    let result = qb.build_query_as::<T::Row>().fetch_one(&mut *conn).await;
    match result {
        Ok(row) => Ok(row.into()),
        Err(err) => Err(classify_write::<T>(conn, err, &values).await),
    }
}

/// Apply `changes` to the row with `key` and return the updated row.
pub(crate) async fn update<T: Table>(
    conn: &mut SqliteConnection,
    key: &T::Key,
    changes: ChangeSet<T::Field>,
) -> Result<T, RepositoryError> {
    if changes.is_empty() {
        return get_by_key::<T>(conn, key).await;
    }
    let mut values = changes.into_stored(T::ENTITY)?;
    with_timestamps::<T>(&mut values, false);

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE ");
    push_ident(&mut qb, T::NAME);
    qb.push(" SET ");
    for (i, (column, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_ident(&mut qb, column);
        qb.push(" = ");
        value.clone().bind(&mut qb);
    }
    qb.push(" WHERE ");
    push_key::<T>(&mut qb, key.key_values())?;
    qb.push(" RETURNING *");

    let result = qb
        .build_query_as::<T::Row>()
        .fetch_optional(&mut *conn)
        .await;
    match result {
        Ok(Some(row)) => Ok(row.into()),
        Ok(None) => Err(RepositoryError::not_found(T::ENTITY, key)),
        Err(err) => Err(classify_write::<T>(conn, err, &values).await),
    }
}

/// Delete the row with `key`.
///
/// Owned children go with it through `ON DELETE CASCADE`; restricting
/// dependents turn the failure into a [`RepositoryError::ForeignKeyViolation`]
/// naming the dependent column.
pub(crate) async fn delete<T: Table>(
    conn: &mut SqliteConnection,
    key: &T::Key,
) -> Result<(), RepositoryError> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM ");
    push_ident(&mut qb, T::NAME);
    qb.push(" WHERE ");
    push_key::<T>(&mut qb, key.key_values())?;

    let result = qb.build().execute(&mut *conn).await;
    match result {
        Ok(done) if done.rows_affected() == 0 => Err(RepositoryError::not_found(T::ENTITY, key)),
        Ok(_) => Ok(()),
        Err(err) => Err(classify_delete::<T>(conn, key, err).await),
    }
}

/// Whether `table` has a row whose `column` equals `value`.
pub(crate) async fn exists(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    value: Stored,
) -> Result<bool, RepositoryError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT EXISTS (SELECT 1 FROM ");
    push_ident(&mut qb, table);
    qb.push(" WHERE ");
    push_ident(&mut qb, column);
    qb.push(" = ");
    value.bind(&mut qb);
    qb.push(")");
    let found: i64 = qb.build_query_scalar().fetch_one(conn).await?;
    Ok(found != 0)
}

fn fkey_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_fkey")
}

/// Refine a foreign key failure on insert/update to the missing reference.
async fn classify_write<T: Table>(
    conn: &mut SqliteConnection,
    err: sqlx::Error,
    written: &[(&'static str, Stored)],
) -> RepositoryError {
    let error = RepositoryError::from_write(T::ENTITY, err);
    if !matches!(error, RepositoryError::ForeignKeyViolation { .. }) {
        return error;
    }

    for reference in T::REFERENCES {
        let Some((_, value)) = written.iter().find(|(c, _)| *c == reference.column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match exists(conn, reference.table, "id", value.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                return RepositoryError::ForeignKeyViolation {
                    entity: T::ENTITY,
                    field: Cow::Borrowed(reference.column),
                    constraint: fkey_name(T::NAME, reference.column),
                };
            }
            Err(lookup) => return lookup,
        }
    }
    error
}

/// Refine a foreign key failure on delete to the dependent that holds on.
async fn classify_delete<T: Table>(
    conn: &mut SqliteConnection,
    key: &T::Key,
    err: sqlx::Error,
) -> RepositoryError {
    let error = RepositoryError::from_write(T::ENTITY, err);
    if !matches!(error, RepositoryError::ForeignKeyViolation { .. }) {
        return error;
    }
    let Some(id) = key.key_values().into_iter().next() else {
        return error;
    };
    let Some(id_field) = T::KEY.first() else {
        return error;
    };
    let id = match to_stored(T::ENTITY, *id_field, id) {
        Ok(id) => id,
        Err(e) => return e,
    };

    for dependent in T::DEPENDENTS {
        match exists(conn, dependent.table, dependent.column, id.clone()).await {
            Ok(true) => {
                return RepositoryError::ForeignKeyViolation {
                    entity: T::ENTITY,
                    field: Cow::Borrowed(dependent.column),
                    constraint: fkey_name(dependent.table, dependent.column),
                };
            }
            Ok(false) => {}
            Err(lookup) => return lookup,
        }
    }
    error
}
