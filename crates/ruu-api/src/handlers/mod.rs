//! API handlers
//!
//! Author: alfredo.tarigan@gmail.com

pub mod auth;
pub mod clients;
pub mod features;
pub mod health;
pub mod properties;
pub mod users;
