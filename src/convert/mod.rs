//! Host adapter between `AvroValue` and host-side representations.
//!
//! Two stateless views of the same value: the generic JSON mapping
//! ([`to_json`], [`from_json`]) and the object view built by a
//! [`TypeFactory`].

mod factory;
mod json;

pub use factory::{RecordInstance, RecordType, TypeFactory};
pub use json::{from_json, to_json};
