pub mod admin;
pub mod chat;
pub mod cost;
pub mod dashboard;
pub mod error;
pub mod member;
pub mod package;
pub mod payment;
pub mod ports;
pub mod review;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
