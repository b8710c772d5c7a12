pub mod error;
pub mod notification;
pub mod presence;
pub mod request;
