//! Annual Operational Plan records: plans of ordered rows with quarterly
//! targets and actuals, cost, risk notes and evidence attachments.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod evidence;
pub mod model;
pub mod proof;
pub mod quarter;
pub mod store;
pub mod util;
