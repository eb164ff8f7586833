//! Hardware transaction layer for the BDIC.

pub mod bus;
