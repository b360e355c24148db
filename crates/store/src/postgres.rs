use async_trait::async_trait;
use common::{CartId, ReceiptId};
use domain::{
    Cart, CartLineItem, CatalogItem, ItemId, Money, PurchaseLine, Purchaser, Receipt,
    ReceiptCode, ResolvedCart, ResolvedLine, SalesSummary,
};
use sqlx::{
    PgConnection, PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    ReceiptQuery, Result, StoreError,
    store::{CartStore, InventoryStore, ReceiptStore},
};

/// PostgreSQL-backed storefront store.
///
/// Stock decrements are a single conditional `UPDATE`, so concurrent
/// purchases of the same item serialize on its row lock.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_item(row: &PgRow) -> Result<CatalogItem> {
        Ok(CatalogItem {
            id: ItemId::new(row.try_get::<String, _>("id")?),
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_stock(row.try_get("stock")?)?,
            active: row.try_get("active")?,
        })
    }

    fn row_to_receipt(row: PgRow) -> Result<Receipt> {
        let lines_json: serde_json::Value = row.try_get("lines")?;
        let lines: Vec<PurchaseLine> = serde_json::from_value(lines_json)?;

        let code = ReceiptCode::new(row.try_get::<String, _>("code")?)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let purchaser = Purchaser::new(row.try_get::<String, _>("purchaser")?)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Receipt::from_parts(
            ReceiptId::from_uuid(row.try_get::<Uuid, _>("id")?),
            code,
            purchaser,
            lines,
            Money::from_cents(row.try_get("total_cents")?),
            row.try_get("purchased_at")?,
        ))
    }

    fn owner_from_row(row: &PgRow) -> Result<Option<Purchaser>> {
        row.try_get::<Option<String>, _>("owner")?
            .map(Purchaser::new)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn cart_exists(&self, cart_id: CartId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM carts WHERE id = $1)")
            .bind(cart_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

fn to_stock(stock: i64) -> Result<u32> {
    u32::try_from(stock).map_err(|_| StoreError::Corrupt(format!("stock out of range: {stock}")))
}

fn to_quantity(quantity: i32) -> Result<u32> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity out of range: {quantity}")))
}

fn to_column_int<T>(value: T, what: &str) -> Result<i32>
where
    T: Copy + std::fmt::Display + TryInto<i32>,
{
    value
        .try_into()
        .map_err(|_| StoreError::Unavailable(format!("{what} {value} exceeds the column range")))
}

/// Writes a cart's lines in order. The caller owns the transaction.
async fn insert_lines(conn: &mut PgConnection, cart: &Cart) -> Result<()> {
    for (position, line) in cart.lines().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (cart_id, item_id, quantity, position)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(cart.id().as_uuid())
        .bind(line.item_id.as_str())
        .bind(to_column_int(line.quantity, "quantity")?)
        .bind(to_column_int(position, "line position")?)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Appends the receipt filters to `sql`, numbering placeholders from 1.
fn push_receipt_filters(sql: &mut String, query: &ReceiptQuery) -> usize {
    let mut param_count = 0;

    if query.purchaser.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND purchaser = ${param_count}"));
    }
    if query.from_timestamp.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND purchased_at >= ${param_count}"));
    }
    if query.to_timestamp.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND purchased_at <= ${param_count}"));
    }

    param_count
}

/// Binds the receipt filters in the order `push_receipt_filters` numbered them.
fn bind_receipt_filters<'q>(
    mut sqlx_query: Query<'q, Postgres, PgArguments>,
    query: &'q ReceiptQuery,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(ref purchaser) = query.purchaser {
        sqlx_query = sqlx_query.bind(purchaser.as_str());
    }
    if let Some(from_ts) = query.from_timestamp {
        sqlx_query = sqlx_query.bind(from_ts);
    }
    if let Some(to_ts) = query.to_timestamp {
        sqlx_query = sqlx_query.bind(to_ts);
    }
    sqlx_query
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn create_cart(&self, cart: &Cart) -> Result<CartId> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO carts (id, owner) VALUES ($1, $2)")
            .bind(cart.id().as_uuid())
            .bind(cart.owner().map(Purchaser::as_str))
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut *tx, cart).await?;

        tx.commit().await?;
        Ok(cart.id())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let Some(resolved) = self.load_cart_with_items(cart_id).await? else {
            return Ok(None);
        };
        Ok(Some(resolved.cart))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE carts SET owner = $2, updated_at = NOW() WHERE id = $1")
            .bind(cart.id().as_uuid())
            .bind(cart.owner().map(Purchaser::as_str))
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::CartNotFound(cart.id()));
        }

        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart.id().as_uuid())
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut *tx, cart).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_cart_with_items(&self, cart_id: CartId) -> Result<Option<ResolvedCart>> {
        let cart_row: Option<PgRow> = sqlx::query("SELECT id, owner FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(cart_row) = cart_row else {
            return Ok(None);
        };
        let owner = Self::owner_from_row(&cart_row)?;

        let rows = sqlx::query(
            r#"
            SELECT l.item_id, l.quantity,
                   i.id, i.title, i.price_cents, i.stock, i.active
            FROM cart_lines l
            LEFT JOIN catalog_items i ON i.id = l.item_id
            WHERE l.cart_id = $1
            ORDER BY l.position ASC
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let line = CartLineItem {
                item_id: ItemId::new(row.try_get::<String, _>("item_id")?),
                quantity: to_quantity(row.try_get("quantity")?)?,
            };
            let item = match row.try_get::<Option<String>, _>("id")? {
                Some(_) => Some(Self::row_to_item(&row)?),
                None => None,
            };
            lines.push(ResolvedLine { line, item });
        }

        let cart = Cart::from_parts(
            cart_id,
            owner,
            lines.iter().map(|resolved| resolved.line.clone()).collect(),
        );

        Ok(Some(ResolvedCart { cart, lines }))
    }

    async fn remove_line(&self, cart_id: CartId, item_id: &ItemId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1 AND item_id = $2")
            .bind(cart_id.as_uuid())
            .bind(item_id.as_str())
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 && !self.cart_exists(cart_id).await? {
            return Err(StoreError::CartNotFound(cart_id));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<CatalogItem>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, title, price_cents, stock, active FROM catalog_items WHERE id = $1",
        )
        .bind(item_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn list_items(&self, active_only: bool) -> Result<Vec<CatalogItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, price_cents, stock, active
            FROM catalog_items
            WHERE active OR NOT $1
            ORDER BY id ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn put_item(&self, item: &CatalogItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (id, title, price_cents, stock, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                active = EXCLUDED.active
            "#,
        )
        .bind(item.id.as_str())
        .bind(&item.title)
        .bind(item.price.cents())
        .bind(i64::from(item.stock))
        .bind(item.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read_stock(&self, item_id: &ItemId) -> Result<u32> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM catalog_items WHERE id = $1")
            .bind(item_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match stock {
            Some(stock) => to_stock(stock),
            None => Err(StoreError::ItemNotFound(item_id.clone())),
        }
    }

    #[tracing::instrument(skip(self), fields(item_id = %item_id))]
    async fn decrement_stock(&self, item_id: &ItemId, amount: u32) -> Result<u32> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE catalog_items
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(item_id.as_str())
        .bind(i64::from(amount))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return to_stock(remaining);
        }

        // Nothing updated: either the row is gone or the guard failed.
        let available = self.read_stock(item_id).await?;
        tracing::debug!(requested = amount, available, "Stock decrement rejected");
        Err(StoreError::InsufficientStock {
            item_id: item_id.clone(),
            requested: amount,
            available,
        })
    }
}

#[async_trait]
impl ReceiptStore for PostgresStore {
    async fn insert_receipt(&self, receipt: &Receipt) -> Result<ReceiptId> {
        let lines_json = serde_json::to_value(receipt.lines())?;

        sqlx::query(
            r#"
            INSERT INTO receipts (id, code, purchaser, lines, total_cents, purchased_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(receipt.id().as_uuid())
        .bind(receipt.code().as_str())
        .bind(receipt.purchaser().as_str())
        .bind(lines_json)
        .bind(receipt.total_amount().cents())
        .bind(receipt.purchased_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_receipt_code")
            {
                return StoreError::CodeCollision(receipt.code().clone());
            }
            StoreError::Database(e)
        })?;

        Ok(receipt.id())
    }

    async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, code, purchaser, lines, total_cents, purchased_at
            FROM receipts
            WHERE id = $1
            "#,
        )
        .bind(receipt_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_receipt).transpose()
    }

    async fn get_receipt_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, code, purchaser, lines, total_cents, purchased_at
            FROM receipts
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_receipt).transpose()
    }

    async fn find_receipts(&self, query: ReceiptQuery) -> Result<Vec<Receipt>> {
        let mut sql = String::from(
            "SELECT id, code, purchaser, lines, total_cents, purchased_at FROM receipts WHERE 1=1",
        );
        let mut param_count = push_receipt_filters(&mut sql, &query);

        sql.push_str(" ORDER BY purchased_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = bind_receipt_filters(sqlx::query(&sql), &query);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_receipt).collect()
    }

    async fn sales_summary(&self, query: ReceiptQuery) -> Result<SalesSummary> {
        let mut sql = String::from(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT AS total, COUNT(*) AS orders FROM receipts WHERE 1=1",
        );
        push_receipt_filters(&mut sql, &query);

        let row = bind_receipt_filters(sqlx::query(&sql), &query)
            .fetch_one(&self.pool)
            .await?;

        let total: i64 = row.try_get("total")?;
        let orders: i64 = row.try_get("orders")?;
        let orders = u64::try_from(orders)
            .map_err(|_| StoreError::Corrupt(format!("negative order count: {orders}")))?;

        Ok(SalesSummary::new(Money::from_cents(total), orders))
    }
}
