// src/lib.rs

//! Novel metadata sync engine.
//!
//! Keeps locally stored novel records reconciled with their upstream
//! providers while preserving translator-owned fields.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
