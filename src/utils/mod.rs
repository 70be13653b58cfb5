// src/utils/mod.rs

pub mod markdown;
