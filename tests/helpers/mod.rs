//! Shared fixtures for integration tests.

pub mod audio_generator;
