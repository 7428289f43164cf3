use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select, TryGetable,
};

use super::condition::enum_rank;
use super::field_map::FieldMap;
use crate::aggregate::AsyncQueryProvider;
use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::Value;

/// Awaitable aggregates computed by the database over a `SeaORM` select.
///
/// The select keeps whatever filters were already applied; each aggregate
/// replaces its projection with a single `result` column.
pub struct SeaOrmProvider<'a, E: EntityTrait, C> {
    select: Select<E>,
    conn: &'a C,
    fmap: &'a FieldMap<E>,
}

impl<'a, E, C> SeaOrmProvider<'a, E, C>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(select: Select<E>, conn: &'a C, fmap: &'a FieldMap<E>) -> Self {
        Self { select, conn, fmap }
    }

    fn column(&self, field: &FieldDescriptor) -> anyhow::Result<E::Column> {
        self.fmap
            .get(field.name)
            .map(|f| f.col)
            .ok_or_else(|| anyhow::anyhow!("no column mapped for field `{}`", field.name))
    }

    async fn scalar<T>(&self, expr: SimpleExpr) -> anyhow::Result<Option<T>>
    where
        T: TryGetable + Send,
    {
        let row = self
            .select
            .clone()
            .select_only()
            .column_as(expr, "result")
            .into_tuple::<Option<T>>()
            .one(self.conn)
            .await?;
        Ok(row.flatten())
    }

    /// Fetch `expr` decoded according to `kind`.
    async fn typed(&self, kind: FieldKind, expr: SimpleExpr) -> anyhow::Result<Value> {
        Ok(match kind {
            FieldKind::I64 => self.scalar::<i64>(expr).await?.into(),
            FieldKind::F64 => self.scalar::<f64>(expr).await?.into(),
            FieldKind::Decimal => decimal_value(self.scalar::<Decimal>(expr).await?)?,
            FieldKind::String | FieldKind::Enum(_) => self.scalar::<String>(expr).await?.into(),
            FieldKind::Bool => self.scalar::<bool>(expr).await?.into(),
            FieldKind::Uuid => self.scalar::<uuid::Uuid>(expr).await?.into(),
            FieldKind::DateTimeUtc => self
                .scalar::<chrono::DateTime<chrono::Utc>>(expr)
                .await?
                .into(),
            FieldKind::Date => self.scalar::<chrono::NaiveDate>(expr).await?.into(),
            FieldKind::Time => self.scalar::<chrono::NaiveTime>(expr).await?.into(),
            FieldKind::List => anyhow::bail!("collection columns cannot be aggregated"),
        })
    }

    /// `MIN`/`MAX` over an enum column, ranked by declaration order.
    async fn enum_extreme(
        &self,
        col: E::Column,
        variants: &'static [&'static str],
        max: bool,
    ) -> anyhow::Result<Value> {
        let rank = enum_rank(col, variants);
        let expr = if max { Func::max(rank) } else { Func::min(rank) };
        let idx = self.scalar::<i64>(expr.into()).await?;
        Ok(idx
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| variants.get(i))
            .map_or(Value::Null, |name| Value::from(*name)))
    }

    async fn extreme(&self, field: &FieldDescriptor, max: bool) -> anyhow::Result<Value> {
        let col = self.column(field)?;
        if let FieldKind::Enum(variants) = field.kind {
            return self.enum_extreme(col, variants, max).await;
        }
        let expr = if max {
            Func::max(Expr::col(col))
        } else {
            Func::min(Expr::col(col))
        };
        self.typed(field.kind, expr.into()).await
    }
}

fn decimal_value(d: Option<Decimal>) -> anyhow::Result<Value> {
    d.map_or(Ok(Value::Null), |d| {
        Ok(Value::Number(BigDecimal::from_str(&d.to_string())?))
    })
}

/// Integer sums are cast back to `BIGINT` and float sums and averages to
/// `DOUBLE PRECISION`; decimals are read as-is.
fn cast_for(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::I64 => Some("BIGINT"),
        FieldKind::Decimal => None,
        _ => Some("DOUBLE PRECISION"),
    }
}

#[async_trait]
impl<E, C> AsyncQueryProvider<E::Model> for SeaOrmProvider<'_, E, C>
where
    E: EntityTrait,
    E::Model: Sync,
    E::Column: ColumnTrait + Copy,
    C: ConnectionTrait,
{
    async fn sum(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        let col = self.column(field)?;
        let sum = Func::sum(Expr::col(col));
        match cast_for(field.kind) {
            Some(ty) => {
                let expr = Func::cast_as(sum, Alias::new(ty)).into();
                self.typed(field.kind, expr).await
            }
            None => self.typed(field.kind, sum.into()).await,
        }
    }

    async fn average(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        let col = self.column(field)?;
        let avg = Func::avg(Expr::col(col));
        if field.kind == FieldKind::Decimal {
            return self.typed(FieldKind::Decimal, avg.into()).await;
        }
        let expr = Func::cast_as(avg, Alias::new("DOUBLE PRECISION")).into();
        self.typed(FieldKind::F64, expr).await
    }

    async fn min(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        self.extreme(field, false).await
    }

    async fn max(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        self.extreme(field, true).await
    }

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.select.clone().count(self.conn).await?)
    }
}
