//! Mol-Bhav - AI Negotiation Engine
//!
//! This crate implements Indian bazaar-style price haggling for e-commerce
//! through a deterministic pricing engine wrapped in AI-generated dialogue.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
