pub mod messages_request;
pub mod messages_route;
