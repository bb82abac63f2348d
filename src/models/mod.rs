//! Data models for ReviewLens

pub mod review;
