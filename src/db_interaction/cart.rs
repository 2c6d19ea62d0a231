use std::{collections::HashMap, error::Error, fmt::Debug};

use chrono::Utc;
use diesel::{upsert::excluded, Connection, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use thiserror::Error;
use uuid::Uuid;

use crate::{models::{CartItemModel, CartLine}, schema::{cart_items, products}, telemetry::spawn_blocking_with_tracing, utils::{error_fmt_chain, DbConnection}};

// Lines of a user's cart joined with the current product data
pub fn load_cart_lines(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Vec<CartLine>>{
    cart_items::table
        .inner_join(products::table)
        .filter(cart_items::user_id.eq(user_id))
        .select((
            cart_items::product_id,
            products::name,
            products::brand,
            products::price,
            products::stock,
            products::images,
            cart_items::quantity
        ))
        .order((cart_items::added_at.asc(), cart_items::product_id.asc()))
        .load::<CartLine>(conn)
}

pub fn delete_cart(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<usize>{
    diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id)))
        .execute(conn)
}

fn product_stock(conn: &mut PgConnection, product_id: Uuid) -> QueryResult<Option<i32>>{
    products::table
        .find(product_id)
        .select(products::stock)
        .first::<i32>(conn)
        .optional()
}

fn cart_quantity(conn: &mut PgConnection, user_id: Uuid, product_id: Uuid) -> QueryResult<Option<i32>>{
    cart_items::table
        .filter(cart_items::user_id.eq(user_id))
        .filter(cart_items::product_id.eq(product_id))
        .select(cart_items::quantity)
        .first::<i32>(conn)
        .optional()
}

fn upsert_cart_quantity(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32
) -> QueryResult<usize>{
    diesel::insert_into(cart_items::table)
        .values(CartItemModel{
            cart_item_id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            added_at: Utc::now()
        })
        .on_conflict((cart_items::user_id, cart_items::product_id))
        .do_update()
        .set(cart_items::quantity.eq(excluded(cart_items::quantity)))
        .execute(conn)
}

#[derive(Error)]
pub enum CartUpdateError{
    #[error("Failed due to threadpool error")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    QueryError(#[from] diesel::result::Error),
    #[error("product {0} does not exist")]
    ProductNotFound(Uuid),
    #[error("product {0} is not in the cart")]
    NotInCart(Uuid),
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("only {available} left in stock")]
    InsufficientStock{ available: i32 }
}

impl Debug for CartUpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "Getting cart of user",
    skip(conn)
)]
pub async fn get_cart(
    mut conn: DbConnection,
    user_id: Uuid
) -> Result<Vec<CartLine>, CartUpdateError>{
    let lines = spawn_blocking_with_tracing(move || {
        load_cart_lines(&mut conn, user_id)
    })
    .await??;

    Ok(lines)
}

/// Adds `quantity` to the existing line, or creates it. The resulting quantity
/// may not exceed the product's stock.
#[tracing::instrument(
    "Adding item to cart",
    skip(conn)
)]
pub async fn add_to_cart(
    mut conn: DbConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32
) -> Result<Vec<CartLine>, CartUpdateError>{
    if quantity < 1 {
        return Err(CartUpdateError::InvalidQuantity)
    }

    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, CartUpdateError, _>(|conn| {
            let stock = product_stock(conn, product_id)?
                .ok_or(CartUpdateError::ProductNotFound(product_id))?;

            let current = cart_quantity(conn, user_id, product_id)?.unwrap_or(0);
            let wanted = current.saturating_add(quantity);

            if wanted > stock {
                return Err(CartUpdateError::InsufficientStock{ available: stock })
            }

            upsert_cart_quantity(conn, user_id, product_id, wanted)?;

            Ok(load_cart_lines(conn, user_id)?)
        })
    })
    .await?
}

// A quantity of zero removes the line
#[tracing::instrument(
    "Setting cart item quantity",
    skip(conn)
)]
pub async fn set_cart_quantity(
    mut conn: DbConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32
) -> Result<Vec<CartLine>, CartUpdateError>{
    if quantity < 0 {
        return Err(CartUpdateError::InvalidQuantity)
    }

    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, CartUpdateError, _>(|conn| {
            if cart_quantity(conn, user_id, product_id)?.is_none() {
                return Err(CartUpdateError::NotInCart(product_id))
            }

            if quantity == 0 {
                diesel::delete(
                    cart_items::table
                        .filter(cart_items::user_id.eq(user_id))
                        .filter(cart_items::product_id.eq(product_id))
                )
                .execute(conn)?;
            } else {
                let stock = product_stock(conn, product_id)?
                    .ok_or(CartUpdateError::ProductNotFound(product_id))?;

                if quantity > stock {
                    return Err(CartUpdateError::InsufficientStock{ available: stock })
                }

                diesel::update(
                    cart_items::table
                        .filter(cart_items::user_id.eq(user_id))
                        .filter(cart_items::product_id.eq(product_id))
                )
                .set(cart_items::quantity.eq(quantity))
                .execute(conn)?;
            }

            Ok(load_cart_lines(conn, user_id)?)
        })
    })
    .await?
}

#[tracing::instrument(
    "Removing item from cart",
    skip(conn)
)]
pub async fn remove_from_cart(
    mut conn: DbConnection,
    user_id: Uuid,
    product_id: Uuid
) -> Result<bool, CartUpdateError>{
    let affected_rows = spawn_blocking_with_tracing(move || {
        diesel::delete(
            cart_items::table
                .filter(cart_items::user_id.eq(user_id))
                .filter(cart_items::product_id.eq(product_id))
        )
        .execute(&mut conn)
    })
    .await??;

    Ok(affected_rows > 0)
}

#[tracing::instrument(
    "Clearing cart",
    skip(conn)
)]
pub async fn clear_cart(
    mut conn: DbConnection,
    user_id: Uuid
) -> Result<(), CartUpdateError>{
    spawn_blocking_with_tracing(move || delete_cart(&mut conn, user_id))
        .await??;

    Ok(())
}

/// Replaces the whole cart with `items`. Duplicate products are summed, unknown
/// or sold out products are dropped and quantities are clamped to stock.
#[tracing::instrument(
    "Replacing cart",
    skip(conn, items)
)]
pub async fn replace_cart(
    mut conn: DbConnection,
    user_id: Uuid,
    items: Vec<(Uuid, i32)>
) -> Result<Vec<CartLine>, CartUpdateError>{
    let mut merged: Vec<(Uuid, i32)> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for (product_id, quantity) in items.into_iter().filter(|(_, q)| *q > 0) {
        match positions.get(&product_id) {
            Some(&i) => merged[i].1 = merged[i].1.saturating_add(quantity),
            None => {
                positions.insert(product_id, merged.len());
                merged.push((product_id, quantity));
            }
        }
    }

    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, CartUpdateError, _>(|conn| {
            delete_cart(conn, user_id)?;

            for (product_id, quantity) in merged {
                let stock = match product_stock(conn, product_id)? {
                    Some(stock) if stock > 0 => stock,
                    _ => {
                        tracing::info!(%product_id, "Dropping unavailable product from synced cart");
                        continue
                    }
                };

                upsert_cart_quantity(conn, user_id, product_id, quantity.min(stock))?;
            }

            Ok(load_cart_lines(conn, user_id)?)
        })
    })
    .await?
}
