//! Billing Provisioner - Outbox consumer for billing workspaces
//!
//! This crate polls the transactional outbox for `organization.created`
//! events and provisions exactly one billing workspace per organization,
//! marking each event published in the same transaction.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
