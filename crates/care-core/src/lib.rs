//! Core types and trait definitions for the consultation service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! visibility resolver in [`visibility`] is the one piece of decision logic;
//! everything else is data and the [`store::CareStore`] abstraction.

#![allow(async_fn_in_trait)]

pub mod actor;
pub mod consultation;
pub mod daily_round;
pub mod error;
pub mod facility;
pub mod filter;
pub mod page;
pub mod patch;
pub mod store;
pub mod visibility;

pub use error::{Error, Result};
