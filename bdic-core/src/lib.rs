#![no_std]

// Shared power and interrupt control logic for the BDIC driver.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library; every hardware sequence enters through a trait so
// the state machines can be exercised in host tests.

pub mod error;
pub mod irq;
pub mod power;
pub mod recovery;
pub mod sensor;
pub mod wake;
