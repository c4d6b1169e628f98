pub mod api_errors;
pub mod http;
pub mod mock_gateway;
pub mod mock_notifier;
pub mod notify;
pub mod signature;
