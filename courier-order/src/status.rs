use chrono::Utc;
use courier_core::{Order, OrderRepository, OrderStatus};
use courier_shared::{Caller, Role};
use std::sync::Arc;
use uuid::Uuid;

use crate::authorization::{authorize, settable_statuses, Action};
use crate::error::OrderError;

/// A validated status change, ready to be applied against `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Validates and applies role-scoped status updates.
pub struct StatusMachine {
    orders: Arc<dyn OrderRepository>,
}

impl StatusMachine {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Applies `requested` to the order on behalf of `caller`.
    ///
    /// The write is conditional on the status read here, so a concurrent
    /// update in between surfaces as `Conflict` rather than being overwritten.
    pub async fn update_status(
        &self,
        caller: &Caller,
        order_id: Uuid,
        requested: &str,
    ) -> Result<Order, OrderError> {
        authorize(caller, Action::UpdateOrderStatus)
            .inspect_err(|e| log_rejection(caller, order_id, requested, e))?;
        let target = parse_target(caller.role, requested)
            .inspect_err(|e| log_rejection(caller, order_id, requested, e))?;

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        let transition = plan_transition(caller, &order, target)
            .inspect_err(|e| log_rejection(caller, order_id, requested, e))?;

        let updated = self
            .orders
            .transition_status(order_id, transition.from, transition.to, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    order_id = %order_id,
                    from = %transition.from,
                    to = %transition.to,
                    "Status changed concurrently, rejecting update"
                );
                OrderError::Conflict("Order was modified concurrently; retry.".to_string())
            })?;

        tracing::info!(
            order_id = %order_id,
            role = %caller.role,
            from = %transition.from,
            to = %transition.to,
            "Order status updated"
        );
        Ok(updated)
    }
}

fn log_rejection(caller: &Caller, order_id: Uuid, requested: &str, err: &OrderError) {
    match err {
        OrderError::Conflict(_) => tracing::warn!(
            order_id = %order_id,
            caller_id = %caller.id,
            role = %caller.role,
            requested,
            error = %err,
            "Status update rejected"
        ),
        _ => tracing::debug!(
            order_id = %order_id,
            caller_id = %caller.id,
            role = %caller.role,
            requested,
            error = %err,
            "Status update rejected"
        ),
    }
}

/// Parses the requested status and checks it against what the role may set.
/// Runs before the order is loaded, so a driver asking for `confirmed` is
/// rejected no matter which order it is.
pub fn parse_target(role: Role, requested: &str) -> Result<OrderStatus, OrderError> {
    requested
        .parse::<OrderStatus>()
        .ok()
        .filter(|status| settable_statuses(role).contains(status))
        .ok_or_else(|| OrderError::InvalidTransition {
            role,
            requested: requested.to_string(),
        })
}

/// Decides whether `caller` may move `order` to `target`.
pub fn plan_transition(
    caller: &Caller,
    order: &Order,
    target: OrderStatus,
) -> Result<Transition, OrderError> {
    let transition = Transition {
        from: order.status,
        to: target,
    };

    match caller.role {
        // Admins override anything, terminal states included.
        Role::Admin => Ok(transition),
        Role::Delivery => {
            if !order.is_assigned_to(caller.id) {
                return Err(OrderError::Forbidden(
                    "You can only update orders assigned to you.".to_string(),
                ));
            }
            if order.status.is_terminal() {
                return Err(OrderError::Conflict(format!(
                    "Order is already in a final state ('{}') and cannot be updated by driver.",
                    order.status
                )));
            }
            Ok(transition)
        }
        Role::Customer => Err(OrderError::Forbidden(
            "Unauthorized to update order status.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_store::memory::InMemoryOrderStore;
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log lines for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn order_for(driver: Option<Uuid>, status: OrderStatus) -> Order {
        let mut order = Order::new(
            Uuid::new_v4(),
            "1 Main St".to_string(),
            None,
            dec!(15.00),
            dec!(2.00),
            None,
        );
        order.driver_id = driver;
        order.status = status;
        order
    }

    #[test]
    fn test_driver_cannot_request_confirmed() {
        let err = parse_target(Role::Delivery, "confirmed").unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                role: Role::Delivery,
                ..
            }
        ));
        assert!(parse_target(Role::Delivery, "out_for_delivery").is_err());
        assert_eq!(
            parse_target(Role::Delivery, "delivered").unwrap(),
            OrderStatus::Delivered
        );
    }

    #[test]
    fn test_unknown_status_rejected_for_admin() {
        let err = parse_target(Role::Admin, "shipped").unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(
            parse_target(Role::Admin, "preparing").unwrap(),
            OrderStatus::Preparing
        );
    }

    #[test]
    fn test_driver_must_hold_order() {
        let driver = Uuid::new_v4();
        let order = order_for(Some(Uuid::new_v4()), OrderStatus::OutForDelivery);
        let err =
            plan_transition(&Caller::delivery(driver), &order, OrderStatus::Delivered).unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));

        let unassigned = order_for(None, OrderStatus::Pending);
        let err = plan_transition(&Caller::delivery(driver), &unassigned, OrderStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[test]
    fn test_terminal_lock_for_driver() {
        let driver = Uuid::new_v4();
        for status in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            let order = order_for(Some(driver), status);
            let err = plan_transition(&Caller::delivery(driver), &order, OrderStatus::Delivered)
                .unwrap_err();
            assert!(matches!(err, OrderError::Conflict(_)));
        }
    }

    #[test]
    fn test_admin_overrides_terminal_state() {
        let order = order_for(None, OrderStatus::Cancelled);
        let transition =
            plan_transition(&Caller::admin(Uuid::new_v4()), &order, OrderStatus::Pending).unwrap();
        assert_eq!(
            transition,
            Transition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Pending
            }
        );
    }

    #[tokio::test]
    async fn test_customer_forbidden_before_lookup() {
        let store = Arc::new(InMemoryOrderStore::new());
        let machine = StatusMachine::new(store);
        let err = machine
            .update_status(&Caller::customer(Uuid::new_v4()), Uuid::new_v4(), "cancelled")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_driver_delivers_assigned_order() {
        let driver = Uuid::new_v4();
        let store = Arc::new(InMemoryOrderStore::new());
        let order = order_for(Some(driver), OrderStatus::OutForDelivery);
        store.create_order(&order, &[]).await.unwrap();

        let machine = StatusMachine::new(store.clone());
        let updated = machine
            .update_status(&Caller::delivery(driver), order.id, "delivered")
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Delivered);
        assert_eq!(updated.driver_id, Some(driver));

        let err = machine
            .update_status(&Caller::delivery(driver), order.id, "failed")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let machine = StatusMachine::new(Arc::new(InMemoryOrderStore::new()));
        let id = Uuid::new_v4();
        let err = machine
            .update_status(&Caller::admin(Uuid::new_v4()), id, "confirmed")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_rejected_updates_are_logged() {
        let driver = Uuid::new_v4();
        let store = Arc::new(InMemoryOrderStore::new());
        let delivered = order_for(Some(driver), OrderStatus::Delivered);
        let foreign = order_for(Some(Uuid::new_v4()), OrderStatus::OutForDelivery);
        store.create_order(&delivered, &[]).await.unwrap();
        store.create_order(&foreign, &[]).await.unwrap();
        let machine = StatusMachine::new(store);

        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let caller = Caller::delivery(driver);
        assert!(machine.update_status(&caller, delivered.id, "confirmed").await.is_err());
        assert!(machine.update_status(&caller, foreign.id, "delivered").await.is_err());
        assert!(machine.update_status(&caller, delivered.id, "failed").await.is_err());

        let output = logs.contents();
        let rejections: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("Status update rejected"))
            .collect();
        assert_eq!(rejections.len(), 3, "{}", output);
        assert!(rejections[0].contains("DEBUG") && rejections[0].contains("confirmed"));
        assert!(rejections[1].contains("DEBUG") && rejections[1].contains(&foreign.id.to_string()));
        assert!(rejections[2].contains("WARN") && rejections[2].contains("final state"));
    }
}
