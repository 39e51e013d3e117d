//! # UI Module
//!
//! This module contains all UI components for the spectrum tuner.

pub mod main_display;
pub mod spectrum_curve;
