//! I/O for samples and other serializable artifacts
//!
//! Samples are exchanged as a flat JSON container ([`SampleFile`]) so that
//! any external loader can hand data to the pipeline without linking to it.

mod json;

pub use json::{read_json, read_sample, write_json, write_sample, SampleFile};
