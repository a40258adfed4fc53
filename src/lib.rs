// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]

//! SEAM: seed-extend-and-map read mapper.
//!
//! SEAM indexes a DNA reference with an FM-index (Burrows-Wheeler
//! transform, bit-packed rank table, sampled suffix array and a k-mer
//! lookup table) and maps short reads by maximal-exact-match seeding,
//! reporting each read's best Hamming-scored position together with a
//! calibrated false-discovery probability.
//!
//! # Features
//!
//! - **Flat artifacts**: index components persist as header-prefixed
//!   packed buffers and are memory-mapped back, ready to query.
//! - **Parallel mapping**: reads are scored in parallel batches while the
//!   output preserves input order.
//! - **Calibrated confidence**: a duplication/divergence estimator turns
//!   backward-search cascades into a per-read error probability.
//!
//! # Example
//!
//! ```rust,no_run
//! use seam_mapper::commands::{IndexCommand, MemCommand};
//! use std::path::Path;
//!
//! IndexCommand::new().run(Path::new("ref.fa")).unwrap();
//! MemCommand::new()
//!     .run(Path::new("ref.fa"), Path::new("reads.txt"), std::io::stdout())
//!     .unwrap();
//! ```

pub mod alphabet;
pub mod bwt;
pub mod commands;
pub mod csa;
pub mod error;
pub mod genome;
pub mod index;
pub mod lut;
pub mod mapper;
pub mod occ;
pub mod quality;
pub mod seedprob;
pub mod store;

// Re-export commonly used types
pub use error::{Result, SeamError};
pub use genome::{Genome, Strand};
pub use index::{BuildParams, Index};
pub use mapper::{Alignment, Mapper};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{IndexCommand, MemCommand};
    pub use crate::error::{Result, SeamError};
    pub use crate::genome::{Genome, Strand};
    pub use crate::index::{BuildParams, Index};
    pub use crate::mapper::{Alignment, Mapper};
    pub use crate::quality::quality;
}
