//! Lane rover control core
//!
//! Turns ultrasonic ranging and a vision accelerator's lane estimate into
//! differential wheel duty cycles, and decodes manual drive commands from a
//! serial byte stream. Everything in here runs inside one cooperative control
//! loop; the firmware binary only supplies the register bus, the delay source
//! and the serial bytes.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module below.
mod fmt;

/// Control core: state, decoding, fusion and actuation
pub mod system;
