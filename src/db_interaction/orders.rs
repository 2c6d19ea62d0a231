use std::{collections::HashMap, error::Error, fmt::Debug};

use chrono::Utc;
use diesel::{sql_types::Text, Connection, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{configuration::StoreSettings, domain::{order_status::{check_transition, OrderStatus, TransitionError}, payment::{PaymentChoice, PaymentMethod, PaymentStatus}, pricing::{find_shortages, OrderTotals, PricingError, Shortage}, shipping::ShippingDetails}, models::{CartLine, Order, OrderItemModel}, schema::{order_items, orders, products}, telemetry::spawn_blocking_with_tracing, utils::{error_fmt_chain, DbConnection, Pagination}};

use super::cart::{delete_cart, load_cart_lines};

// Name postgres gives the UNIQUE (user_id, idempotency_key) constraint
const IDEMPOTENCY_CONSTRAINT: &str = "orders_user_id_idempotency_key_key";

// Struct to represent an order (with associated items)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemModel>,
}

pub fn generate_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!("WS-{}-{}", Utc::now().format("%Y%m%d"), suffix.to_uppercase())
}

pub fn load_order_items(conn: &mut PgConnection, order_id: Uuid) -> QueryResult<Vec<OrderItemModel>> {
    order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::product_name.asc())
        .load::<OrderItemModel>(conn)
}

// Fetch the items of several orders with a single query
fn attach_items(conn: &mut PgConnection, orders: Vec<Order>) -> QueryResult<Vec<OrderWithItems>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.order_id).collect();

    let mut grouped: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    for item in order_items::table
        .filter(order_items::order_id.eq_any(ids))
        .order(order_items::product_name.asc())
        .load::<OrderItemModel>(conn)?
    {
        grouped.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.order_id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect())
}

/// Typed view of the state columns of a stored order.
pub(crate) struct OrderState {
    pub status: OrderStatus,
    pub method: PaymentMethod,
    pub payment: PaymentStatus,
}

impl OrderState {
    pub(crate) fn of(order: &Order) -> Result<OrderState, String> {
        Ok(OrderState {
            status: order.status.parse()?,
            method: order.payment_method.parse()?,
            payment: order.payment_status.parse()?,
        })
    }
}

pub(crate) fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> QueryResult<Option<Order>> {
    orders::table
        .find(order_id)
        .for_update()
        .first::<Order>(conn)
        .optional()
}

// Put the stock of a cancelled order back on the shelf
fn restock_items(conn: &mut PgConnection, order_id: Uuid) -> QueryResult<()> {
    for item in load_order_items(conn, order_id)? {
        if let Some(product_id) = item.product_id {
            diesel::update(products::table.find(product_id))
                .set(products::stock.eq(products::stock + item.quantity))
                .execute(conn)?;
        }
    }
    Ok(())
}

pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub shipping: ShippingDetails,
    pub payment: PaymentChoice,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}

pub struct PlacedOrder {
    pub order: OrderWithItems,
    // true when an earlier order with the same idempotency key was returned
    pub replayed: bool,
}

// Error associated with creating orders and decrementing stock
#[derive(Error)]
pub enum PlaceOrderError {
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Some items are out of stock")]
    OutOfStock(Vec<Shortage>),
    #[error("Failed to price order")]
    PricingError(#[from] PricingError),
    #[error("An order with this idempotency key is already being placed")]
    DuplicateRequest,
}

impl Debug for PlaceOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

/// Turns the user's cart into an order. Stock is decremented, the order and its
/// items are written and the cart is cleared in a single transaction.
#[tracing::instrument(
    "Creating order from cart and updating stock",
    skip_all,
    fields(user_id = %request.user_id)
)]
pub async fn place_order(
    mut conn: DbConnection,
    request: CheckoutRequest,
    store: StoreSettings,
) -> Result<PlacedOrder, PlaceOrderError> {
    spawn_blocking_with_tracing(move || {
        conn.transaction::<PlacedOrder, PlaceOrderError, _>(|conn| {
            let user_id = request.user_id;

            if let Some(key) = &request.idempotency_key {
                // Serialises concurrent requests sharing a key, the later one
                // waits for the first to commit and then replays its order
                diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
                    .bind::<Text, _>(format!("{}:{}", user_id, key))
                    .execute(conn)?;

                let existing = orders::table
                    .filter(orders::user_id.eq(user_id))
                    .filter(orders::idempotency_key.eq(key))
                    .first::<Order>(conn)
                    .optional()?;

                if let Some(order) = existing {
                    tracing::info!(order_id = %order.order_id, "Replaying order for idempotency key");
                    let items = load_order_items(conn, order.order_id)?;
                    return Ok(PlacedOrder { order: OrderWithItems { order, items }, replayed: true });
                }
            }

            let lines = load_cart_lines(conn, user_id)?;
            if lines.is_empty() {
                return Err(PlaceOrderError::EmptyCart);
            }

            let shortages = find_shortages(&lines);
            if !shortages.is_empty() {
                return Err(PlaceOrderError::OutOfStock(shortages));
            }

            let totals = OrderTotals::compute(&lines, &store, request.payment.method)?;

            // Guarded decrement, a concurrent checkout may have taken the stock since
            // the cart was read. Rows are locked in product order to avoid deadlocks.
            let mut by_product: Vec<&CartLine> = lines.iter().collect();
            by_product.sort_by_key(|line| line.product_id);

            let mut lost = Vec::new();
            for line in by_product {
                let affected_rows = diesel::update(
                        products::table
                            .filter(products::product_id.eq(line.product_id))
                            .filter(products::stock.ge(line.quantity))
                    )
                    .set(products::stock.eq(products::stock - line.quantity))
                    .execute(conn)?;

                if affected_rows == 0 {
                    let available = products::table
                        .find(line.product_id)
                        .select(products::stock)
                        .first::<i32>(conn)
                        .optional()?
                        .unwrap_or(0);

                    lost.push(Shortage {
                        product_id: line.product_id,
                        name: line.name.clone(),
                        requested: line.quantity,
                        available,
                    });
                }
            }

            if !lost.is_empty() {
                return Err(PlaceOrderError::OutOfStock(lost));
            }

            let now = Utc::now();
            let order = Order {
                order_id: Uuid::new_v4(),
                order_number: generate_order_number(),
                user_id,
                status: OrderStatus::Pending.as_str().to_string(),
                payment_method: request.payment.method.as_str().to_string(),
                wallet_provider: request.payment.wallet_provider.clone(),
                payment_status: PaymentStatus::Pending.as_str().to_string(),
                payment_reference: None,
                payment_proof_url: None,
                payment_note: None,
                subtotal: totals.subtotal,
                shipping_fee: totals.shipping_fee,
                cod_fee: totals.cod_fee,
                total: totals.total,
                shipping_name: request.shipping.full_name.clone(),
                shipping_phone: request.shipping.phone.inner(),
                shipping_address: request.shipping.address.clone(),
                shipping_city: request.shipping.city.clone(),
                notes: request.notes.clone(),
                idempotency_key: request.idempotency_key.clone(),
                order_date: now,
                updated_at: now,
            };

            diesel::insert_into(orders::table)
                .values(&order)
                .execute(conn)
                .map_err(|e| match &e {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        info
                    ) if info.constraint_name() == Some(IDEMPOTENCY_CONSTRAINT) => PlaceOrderError::DuplicateRequest,
                    _ => PlaceOrderError::RunQueryError(e),
                })?;

            let items: Vec<OrderItemModel> = lines
                .iter()
                .map(|line| OrderItemModel {
                    order_item_id: Uuid::new_v4(),
                    order_id: order.order_id,
                    product_id: Some(line.product_id),
                    product_name: format!("{} {}", line.brand, line.name),
                    unit_price: line.price,
                    quantity: line.quantity,
                })
                .collect();

            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            delete_cart(conn, user_id)?;

            let items = load_order_items(conn, order.order_id)?;
            Ok(PlacedOrder { order: OrderWithItems { order, items }, replayed: false })
        })
    })
    .await?
}

#[tracing::instrument(
    "Getting orders of user with their items",
    skip(conn)
)]
pub async fn list_user_orders(
    mut conn: DbConnection,
    user_id: Uuid,
    pagination: Pagination,
) -> Result<Vec<OrderWithItems>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let orders = orders::table
                .filter(orders::user_id.eq(user_id))
                .order(orders::order_date.desc())
                .limit(pagination.limit())
                .offset(pagination.offset())
                .load::<Order>(conn)?;

            attach_items(conn, orders)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Getting all orders with their items",
    skip(conn)
)]
pub async fn list_all_orders(
    mut conn: DbConnection,
    status: Option<OrderStatus>,
    payment_status: Option<PaymentStatus>,
    pagination: Pagination,
) -> Result<Vec<OrderWithItems>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let mut query = orders::table.into_boxed();

            if let Some(status) = status {
                query = query.filter(orders::status.eq(status.as_str()));
            }
            if let Some(payment_status) = payment_status {
                query = query.filter(orders::payment_status.eq(payment_status.as_str()));
            }

            let orders = query
                .order(orders::order_date.desc())
                .limit(pagination.limit())
                .offset(pagination.offset())
                .load::<Order>(conn)?;

            attach_items(conn, orders)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Getting order with items by id",
    skip(conn)
)]
pub async fn get_order_with_items(
    mut conn: DbConnection,
    order_id: Uuid,
) -> Result<Option<OrderWithItems>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || -> Result<Option<OrderWithItems>, diesel::result::Error> {
        let order = orders::table
            .find(order_id)
            .first::<Order>(&mut conn)
            .optional()?;

        match order {
            Some(order) => {
                let items = load_order_items(&mut conn, order_id)?;
                Ok(Some(OrderWithItems { order, items }))
            }
            None => Ok(None),
        }
    })
    .await??;

    Ok(res)
}

// Error associated with updating order status
#[derive(Error)]
pub enum UpdateOrderStatusError {
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("order_id: {0} doesn't exist")]
    NoOrderIdError(Uuid),
    #[error("{0}")]
    TransitionError(#[from] TransitionError),
    #[error("order has an invalid stored state: {0}")]
    CorruptOrder(String),
}

impl Debug for UpdateOrderStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

fn change_status(
    conn: &mut PgConnection,
    order: Order,
    next: OrderStatus,
) -> Result<OrderWithItems, UpdateOrderStatusError> {
    let state = OrderState::of(&order).map_err(UpdateOrderStatusError::CorruptOrder)?;
    check_transition(state.status, next, state.method, state.payment)?;

    if next == OrderStatus::Cancelled {
        restock_items(conn, order.order_id)?;
    }

    // Cash is collected by the courier
    let payment_status = if next == OrderStatus::Delivered && state.method == PaymentMethod::Cod {
        PaymentStatus::Paid
    } else {
        state.payment
    };

    let order = diesel::update(orders::table.find(order.order_id))
        .set((
            orders::status.eq(next.as_str()),
            orders::payment_status.eq(payment_status.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .get_result::<Order>(conn)?;

    let items = load_order_items(conn, order.order_id)?;
    Ok(OrderWithItems { order, items })
}

// Function to perform update order status operation
#[tracing::instrument(
    "Updating order status",
    skip(conn)
)]
pub async fn update_order_status(
    mut conn: DbConnection,
    status: OrderStatus,
    order_id: Uuid,
) -> Result<OrderWithItems, UpdateOrderStatusError> {
    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, UpdateOrderStatusError, _>(|conn| {
            let order = lock_order(conn, order_id)?
                .ok_or(UpdateOrderStatusError::NoOrderIdError(order_id))?;

            change_status(conn, order, status)
        })
    })
    .await?
}

// Customers may only withdraw orders nobody has acted on yet
#[tracing::instrument(
    "Cancelling order of user",
    skip(conn)
)]
pub async fn cancel_user_order(
    mut conn: DbConnection,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<OrderWithItems, UpdateOrderStatusError> {
    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, UpdateOrderStatusError, _>(|conn| {
            let order = lock_order(conn, order_id)?
                .filter(|o| o.user_id == user_id)
                .ok_or(UpdateOrderStatusError::NoOrderIdError(order_id))?;

            let current: OrderStatus = order.status.parse()
                .map_err(UpdateOrderStatusError::CorruptOrder)?;

            if current != OrderStatus::Pending {
                return Err(TransitionError::NotAllowed { from: current, to: OrderStatus::Cancelled }.into());
            }

            change_status(conn, order, OrderStatus::Cancelled)
        })
    })
    .await?
}
