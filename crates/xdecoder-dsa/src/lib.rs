//! # xdecoder-dsa: Search Foundations
//!
//! Index-addressed storage for the decoder hot loop: a recycling object pool
//! for search tokens and an insertion-ordered hash list for the active set.
#![no_std]
extern crate alloc;

pub mod hash_list;
pub mod pool;

pub use hash_list::{ElemId, HashList, NULL_ELEM};
pub use pool::{ObjectPool, PoolStats};
