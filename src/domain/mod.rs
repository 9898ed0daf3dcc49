//! Domain types for the ProofRegistry read model.

pub mod definitions;
pub mod types;

pub use definitions::{ProofDefinition, ProofDefinitions};
pub use types::{format_address, parse_address, parse_type_hash, Proof, Snapshot, TypeName};
