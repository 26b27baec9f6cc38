pub mod profile;

pub use profile::{CanonicalProfile, Node};
