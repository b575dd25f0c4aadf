use chrono::Utc;
use courier_core::{Order, OrderRepository, OrderStatus};
use courier_shared::Caller;
use std::sync::Arc;
use uuid::Uuid;

use crate::authorization::{authorize, Action};
use crate::error::OrderError;

/// Result of a successful take-order call.
#[derive(Debug, Clone, PartialEq)]
pub enum TakeOutcome {
    /// The order was unassigned and now belongs to the caller.
    Claimed(Order),
    /// The caller already held the order (e.g. admin pre-assignment) and it
    /// has now been moved out for delivery.
    Confirmed(Order),
    /// Nothing to do; the caller is already delivering it.
    AlreadyOutForDelivery(Order),
}

impl TakeOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TakeOutcome::Claimed(order)
            | TakeOutcome::Confirmed(order)
            | TakeOutcome::AlreadyOutForDelivery(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            TakeOutcome::Claimed(order)
            | TakeOutcome::Confirmed(order)
            | TakeOutcome::AlreadyOutForDelivery(order) => order,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            TakeOutcome::Claimed(_) => "Order assigned to you.",
            TakeOutcome::Confirmed(_) => "Order confirmed for delivery.",
            TakeOutcome::AlreadyOutForDelivery(_) => {
                "Order already assigned to you and is out for delivery."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TakePlan {
    Claim,
    Confirm { expected: OrderStatus },
    NoOp,
    HeldByOther,
    Closed,
}

fn plan_take(order: &Order, driver_id: Uuid) -> TakePlan {
    match order.driver_id {
        Some(holder) if holder != driver_id => TakePlan::HeldByOther,
        Some(_) if order.status == OrderStatus::OutForDelivery => TakePlan::NoOp,
        _ if order.status.is_terminal() => TakePlan::Closed,
        Some(_) => TakePlan::Confirm {
            expected: order.status,
        },
        None => TakePlan::Claim,
    }
}

/// Resolves driver claims on orders. The unassigned-to-claimed step is a
/// single conditional update in the store, so of two drivers racing for the
/// same order exactly one wins.
pub struct AssignmentCoordinator {
    orders: Arc<dyn OrderRepository>,
}

impl AssignmentCoordinator {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn take_order(
        &self,
        caller: &Caller,
        order_id: Uuid,
    ) -> Result<TakeOutcome, OrderError> {
        authorize(caller, Action::TakeOrder)?;

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        let now = Utc::now();
        match plan_take(&order, caller.id) {
            TakePlan::HeldByOther => Err(already_taken()),
            TakePlan::Closed => Err(closed(order.status)),
            TakePlan::NoOp => Ok(TakeOutcome::AlreadyOutForDelivery(order)),
            TakePlan::Claim => {
                match self.orders.claim_unassigned(order_id, caller.id, now).await? {
                    Some(claimed) => {
                        tracing::info!(order_id = %order_id, driver_id = %caller.id, "Order claimed");
                        Ok(TakeOutcome::Claimed(claimed))
                    }
                    None => self.after_lost_race(caller, order_id).await,
                }
            }
            TakePlan::Confirm { expected } => {
                match self
                    .orders
                    .confirm_assignment(order_id, caller.id, expected, now)
                    .await?
                {
                    Some(confirmed) => {
                        tracing::info!(
                            order_id = %order_id,
                            driver_id = %caller.id,
                            from = %expected,
                            "Pre-assigned order confirmed for delivery"
                        );
                        Ok(TakeOutcome::Confirmed(confirmed))
                    }
                    None => self.after_lost_race(caller, order_id).await,
                }
            }
        }
    }

    /// The conditional write matched nothing. Re-read and report what the
    /// order looks like now: a parallel request from the same driver leaves
    /// the claim standing, anything else is a conflict naming the reason.
    async fn after_lost_race(
        &self,
        caller: &Caller,
        order_id: Uuid,
    ) -> Result<TakeOutcome, OrderError> {
        let current = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        let plan = plan_take(&current, caller.id);
        tracing::debug!(
            order_id = %order_id,
            driver_id = %caller.id,
            holder = ?current.driver_id,
            status = %current.status,
            plan = ?plan,
            "Lost take-order race"
        );
        match plan {
            TakePlan::NoOp => Ok(TakeOutcome::AlreadyOutForDelivery(current)),
            TakePlan::HeldByOther => Err(already_taken()),
            TakePlan::Closed => Err(closed(current.status)),
            TakePlan::Claim | TakePlan::Confirm { .. } => Err(OrderError::Conflict(
                "Order was modified concurrently; retry.".to_string(),
            )),
        }
    }
}

fn already_taken() -> OrderError {
    OrderError::Conflict("Order already assigned to another driver.".to_string())
}

fn closed(status: OrderStatus) -> OrderError {
    OrderError::Conflict(format!("Order is already in a final state ('{}').", status))
}
