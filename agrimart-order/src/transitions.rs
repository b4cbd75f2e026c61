use agrimart_core::order::{DeliveryDestination, Order, OrderStatus};
use agrimart_core::{Actor, CoreError, CoreResult, Role};

/// One allowed move and the role that performs it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub handler: Role,
}

const fn edge(from: OrderStatus, to: OrderStatus, handler: Role) -> Edge {
    Edge { from, to, handler }
}

pub const EDGES: [Edge; 8] = [
    edge(OrderStatus::Pending, OrderStatus::Confirmed, Role::Seller),
    edge(OrderStatus::Pending, OrderStatus::Cancelled, Role::Buyer),
    edge(OrderStatus::Confirmed, OrderStatus::DispatchedToLogistics, Role::Seller),
    edge(OrderStatus::DispatchedToLogistics, OrderStatus::DispatchedToColdstorage, Role::Logistics),
    edge(OrderStatus::DispatchedToLogistics, OrderStatus::DispatchedToCustomer, Role::Logistics),
    edge(OrderStatus::DispatchedToColdstorage, OrderStatus::InColdstorage, Role::Coldstorage),
    edge(OrderStatus::InColdstorage, OrderStatus::DispatchedToCustomer, Role::Coldstorage),
    edge(OrderStatus::DispatchedToCustomer, OrderStatus::Delivered, Role::Driver),
];

pub fn handler_for(from: OrderStatus, to: OrderStatus) -> Option<Role> {
    EDGES
        .iter()
        .find(|e| e.from == from && e.to == to)
        .map(|e| e.handler)
}

/// Statuses a role acts on next. Drives the logistics, cold storage and
/// driver work queues.
pub fn queue_for(role: Role) -> Vec<OrderStatus> {
    let mut statuses: Vec<OrderStatus> = EDGES
        .iter()
        .filter(|e| e.handler == role)
        .map(|e| e.from)
        .collect();
    statuses.dedup();
    statuses
}

/// Check that `actor` may move `order` to `to`.
///
/// Unknown edges and edges that contradict the delivery destination are
/// state errors; a wrong role or a stranger is `Forbidden`.
pub fn authorize(order: &Order, to: OrderStatus, actor: &Actor) -> CoreResult<()> {
    let handler = handler_for(order.status, to).ok_or_else(|| CoreError::transition(order.status, to))?;

    if order.status == OrderStatus::DispatchedToLogistics {
        let wanted = match order.delivery_destination {
            DeliveryDestination::Customer => OrderStatus::DispatchedToCustomer,
            DeliveryDestination::Coldstorage => OrderStatus::DispatchedToColdstorage,
        };
        if to != wanted {
            return Err(CoreError::transition(order.status, to));
        }
    }

    if actor.is_admin() {
        return Err(CoreError::Forbidden(format!(
            "admins cannot move orders; {} is a {} action",
            to, handler
        )));
    }

    match handler {
        Role::Seller => actor.require_owner(Role::Seller, order.seller_id),
        Role::Buyer => actor.require_owner(Role::Buyer, order.buyer_id),
        Role::Logistics => require_assignee(actor, Role::Logistics, order.logistics_id),
        Role::Coldstorage => require_assignee(actor, Role::Coldstorage, order.coldstorage_id),
        Role::Driver => require_assignee(actor, Role::Driver, order.driver_id),
        Role::Insurance | Role::Admin => Err(CoreError::Forbidden(format!("{} does not handle orders", handler))),
    }
}

/// First handler of a stage claims it; later moves must come from them
fn require_assignee(actor: &Actor, role: Role, assigned: Option<uuid::Uuid>) -> CoreResult<()> {
    actor.require_role(role)?;
    match assigned {
        Some(id) if id != actor.user_id => Err(CoreError::Forbidden(format!(
            "order is assigned to another {} partner",
            role
        ))),
        _ => Ok(()),
    }
}

/// Record who handled the stage the order is leaving
pub fn assign(order: &mut Order, actor: &Actor) {
    match order.status {
        OrderStatus::DispatchedToLogistics => order.logistics_id = Some(actor.user_id),
        OrderStatus::DispatchedToColdstorage | OrderStatus::InColdstorage => {
            order.coldstorage_id = Some(actor.user_id)
        }
        OrderStatus::DispatchedToCustomer => order.driver_id = Some(actor.user_id),
        _ => {}
    }
}
