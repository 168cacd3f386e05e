//! # Shop server
//! This crate hosts the HTTP server for the shop engine. It is responsible for:
//! * Verifying the session token on every shopper and administrator request.
//! * Translating requests into calls on the engine APIs, and engine errors into HTTP responses.
//! * Opening charges with the payment gateway, and accepting its signed payment status callbacks.
//! * Logging the order and wallet events that the engine raises.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following route groups:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/user/...`: Cart, addresses, checkout, order management, wallet, referrals and coupons for the signed-in shopper.
//! * `/admin/...`: Catalog, coupon, order, user and wallet administration. Requires the `Admin` role.
//! * `/gateway/payment-status`: Payment status callbacks from the payment gateway.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod gateway;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
