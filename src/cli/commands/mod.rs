pub mod auth;
pub mod compliance;
pub mod server;
pub mod tenant;
