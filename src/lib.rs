//! SoundDrops - payment entitlements for a sample-pack marketplace
//!
//! This crate turns gateway payments into purchases and time-limited
//! subscriptions, reconciles the client's status poll with the gateway's
//! webhooks, and gates content downloads on the resulting entitlements.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
