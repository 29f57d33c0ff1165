//! Database model modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table.

pub mod articles;  // articles (catalogue, immutable after seeding)
pub mod purchases; // purchases (unique per txid)
