//! Application layer - Use cases and ports
//!
//! - DTOs: quest files and action payloads
//! - Ports: traits the infrastructure implements
//! - Services: the quest service driving the domain

pub mod dto;
pub mod ports;
pub mod services;
