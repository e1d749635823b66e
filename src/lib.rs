//! Vender - Sales panel diagnostics with least-squares factor attribution
//!
//! This library normalizes heterogeneous monthly retail sheets into a
//! canonical panel, aggregates it into a portfolio time series, relates
//! sales to explanatory factors, and explains month-over-month sales
//! changes by decomposing them into per-factor contributions from a single
//! linear fit. Association only: none of this establishes causality.

pub mod attribution;
pub mod config;
pub mod correlation;
pub mod factor;
pub mod monthly;
pub mod panel;
pub mod standardize;
