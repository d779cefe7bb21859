// src/lib.rs

//! feedwatch: polls feeds, release listings, news pages and social
//! timelines, and notifies once per new keyword-matching item.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
