//! Utility to print the most recently recorded orders.
//!
//! Usage: `recent_orders [LIMIT]` (default 20).

use dotenvy::dotenv;
use rust_checkout_api::db::Database;
use rust_checkout_api::order_store::PgOrderStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let limit: i64 = env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()
        .map_err(|_| anyhow::anyhow!("LIMIT must be a number"))?
        .unwrap_or(20);

    let db = Database::new(&database_url).await?;
    let store = PgOrderStore::new(db.pool.clone());

    let orders = store.recent_orders(limit).await?;

    println!("Found {} order(s):", orders.len());
    for order in orders {
        println!(
            "- #{} [{}] {} / {} / {} @ {}",
            order.id,
            order.status,
            order.card_holder,
            order.card_brand,
            order.address_line,
            order.created_at.to_rfc3339()
        );
    }

    Ok(())
}
