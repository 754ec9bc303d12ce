//! Infrastructure layer: concrete stores and wire DTOs.

pub mod dto;
pub mod repository;
