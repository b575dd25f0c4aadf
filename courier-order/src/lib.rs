pub mod assignment;
pub mod authorization;
pub mod error;
pub mod manager;
pub mod query;
pub mod status;

pub use assignment::{AssignmentCoordinator, TakeOutcome};
pub use authorization::{Action, authorize, can_view, is_allowed};
pub use error::OrderError;
pub use manager::{NewOrderRequest, OrderManager};
pub use query::{OrderQueryService, Projection};
pub use status::{StatusMachine, Transition};
