//! Integrity-checked compression of sequencing data.
//!
//! FASTQ pairs are compressed with SPRING and BAM files with samtools; both
//! tools run as subprocesses. Archives can be verified by decompressing them
//! and comparing checksums, and originals are only removed after such a
//! verification succeeded.

pub mod cli;
pub mod error;
pub mod files;
pub mod integrity;
pub mod metadata;
pub mod pipeline;
pub mod tools;

pub use error::{CrunchError, Result};
