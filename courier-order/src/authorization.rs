use courier_core::{Order, OrderStatus};
use courier_shared::{Caller, Role};

use crate::error::OrderError;

/// Operations a caller can attempt on the order API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOrder,
    ListOrders,
    ViewOrder,
    UpdateOrderStatus,
    TakeOrder,
}

// (role, action) pairs that are allowed; everything else is denied.
const PERMISSIONS: &[(Role, Action)] = &[
    (Role::Customer, Action::CreateOrder),
    (Role::Customer, Action::ListOrders),
    (Role::Customer, Action::ViewOrder),
    (Role::Delivery, Action::CreateOrder),
    (Role::Delivery, Action::ListOrders),
    (Role::Delivery, Action::ViewOrder),
    (Role::Delivery, Action::UpdateOrderStatus),
    (Role::Delivery, Action::TakeOrder),
    (Role::Admin, Action::CreateOrder),
    (Role::Admin, Action::ListOrders),
    (Role::Admin, Action::ViewOrder),
    (Role::Admin, Action::UpdateOrderStatus),
];

const DRIVER_TARGETS: &[OrderStatus] = &[OrderStatus::Delivered, OrderStatus::Failed];

pub fn is_allowed(role: Role, action: Action) -> bool {
    PERMISSIONS.contains(&(role, action))
}

pub fn authorize(caller: &Caller, action: Action) -> Result<(), OrderError> {
    if is_allowed(caller.role, action) {
        return Ok(());
    }
    let message = match action {
        Action::TakeOrder => "Only delivery personnel can take orders.",
        Action::UpdateOrderStatus => "Unauthorized to update order status.",
        _ => "You are not authorized to perform this action.",
    };
    Err(OrderError::Forbidden(message.to_string()))
}

/// Statuses a role may request through a direct status update.
/// `out_for_delivery` reaches drivers only through take-order.
pub fn settable_statuses(role: Role) -> &'static [OrderStatus] {
    match role {
        Role::Admin => &OrderStatus::ALL,
        Role::Delivery => DRIVER_TARGETS,
        Role::Customer => &[],
    }
}

/// Admins see everything, drivers see the unassigned pool and their own
/// orders, customers see what they own.
pub fn can_view(caller: &Caller, order: &Order) -> bool {
    match caller.role {
        Role::Admin => true,
        Role::Delivery => order.is_unassigned() || order.is_assigned_to(caller.id),
        Role::Customer => order.user_id == caller.id,
    }
}
