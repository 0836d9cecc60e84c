//! Lake Module - Boundary to the remote lake engine
//!
//! - `types`: self-describing type descriptors
//! - `zjson`: wire decoding of query responses
//! - `client`: the `LakeEngine` trait and its HTTP implementation

pub mod client;
pub mod types;
pub mod zjson;

pub use client::{LakeClient, LakeEngine, QueryResponse};
pub use types::{Field, LakeType};
pub use zjson::Decoder;
