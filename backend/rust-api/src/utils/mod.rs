pub mod request;
pub mod sanitize;
