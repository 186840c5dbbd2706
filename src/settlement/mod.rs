//! Settlement: Phase B2 maturity settlement (L9, §4.4) and Phase C interbank
//! clearing (L10, §4.5). Both run once per simulated day, in that order, as
//! part of the daily loop (§4.6).

mod clearing;
mod waterfall;

pub use clearing::run_clearing;
pub use waterfall::run_settlement;
