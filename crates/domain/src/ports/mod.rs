use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod admin;
pub mod chat;
pub mod cost;
pub mod member;
pub mod package;
pub mod payment;
pub mod review;
