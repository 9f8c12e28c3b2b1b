//! Domain layer - Core acquisition concepts
//!
//! Entities, collaborator ports and recognition strategies. Checksum rules,
//! candidate extraction and read consensus live in `linha_core`.

pub mod entities;
pub mod repositories;
pub mod services;
