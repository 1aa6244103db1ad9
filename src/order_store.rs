use crate::errors::StoreError;
use crate::models::{NewOrder, Order};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence port for approved orders.
///
/// Each call is atomic: an order is either fully inserted with a generated
/// id, or not at all.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError>;
}

/// Postgres-backed order store. Ids come from the table's sequence.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recent orders first, for operator inspection.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, card_holder, card_brand, address_line, status, created_at
             FROM orders
             ORDER BY id DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let inserted = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (card_holder, card_brand, address_line, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, card_holder, card_brand, address_line, status, created_at",
        )
        .bind(&order.card_holder)
        .bind(order.card_brand.name())
        .bind(&order.address_line)
        .bind(&order.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert order: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(inserted)
    }
}

/// Thread-safe in-memory order store with ids starting at 1.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let stored = Order {
            id: orders.len() as i64 + 1,
            card_holder: order.card_holder.clone(),
            card_brand: order.card_brand.name().to_string(),
            address_line: order.address_line.clone(),
            status: order.status.clone(),
            created_at: Utc::now(),
        };
        orders.push(stored.clone());
        Ok(stored)
    }
}
