//! Unit tests for the resilience SDK
//!
//! This module contains tests for various components of the SDK.

pub mod manager_tests;
