//! Pending-work collections.

pub(crate) mod memory;

pub(crate) use memory::{DelayHeap, ReadyQueue};
