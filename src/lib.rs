//! Checkout API Library
//!
//! Simulated e-commerce checkout: card number validation, shipping address
//! verification against a postal (CEP) lookup service, and recording of
//! approved orders.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `bin_client`: BIN lookup client.
//! - `card`: Card brand classification.
//! - `cep_client`: Postal lookup client and cache.
//! - `checkout`: Checkout validation pipeline.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `models`: Request, response and order models.
//! - `order_store`: Order persistence port and adapters.
//! - `validators`: CPF, Luhn and expiration validators.

pub mod api;
pub mod core;
pub mod integrations;

pub mod bin_client;
pub mod card;
pub mod cep_client;
pub mod checkout;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod order_store;
pub mod validators;
