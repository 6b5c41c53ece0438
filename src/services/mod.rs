//! Application services

mod link_service;

pub use link_service::{BatchItem, LinkService};
