//! Core types shared by every stage: configuration, errors and the documented file set

pub mod config;
pub mod error;
pub mod sources;
