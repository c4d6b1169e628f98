pub mod costing;
pub mod error;
pub mod event;
pub mod gateway;
pub mod ids;
pub mod money;
pub mod notify;
pub mod payment;
pub mod store;
