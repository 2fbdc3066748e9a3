//! taixiu-node: Tai/Xiu lottery relay with pattern prediction
//!
//! Fetches the latest three-dice draw from the upstream feed, classifies it
//! as Tai (high) or Xiu (low), keeps a rolling history of the last outcomes
//! and predicts the next one with a small rule chain.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod predictor;
pub mod upstream;
