//! Core primitives shared by every layer of the simulator.
//!
//! - `ids`: fresh id allocation with a kind-prefixed, monotonic scheme (L1)
//! - `decimal`: rounding conventions for converting exact decimals to minor units

pub mod decimal;
pub mod ids;

pub use decimal::round_half_up_to_i64;
pub use ids::IdAllocator;
