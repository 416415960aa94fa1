//! Bidirectional translation between SMILES text and an immutable
//! structural tree of chains, rings, fused ring systems and molecules.
//!
//! ```no_run
//! use smiles_tree::*;
//!
//! let naphthalene = parse("c1ccc2ccccc2c1")?;
//! assert_eq!(serialize(&naphthalene)?, "c1ccc2ccccc2c1");
//!
//! let pyridine = Ring::new("c", 6)?.substitute(1, "n")?;
//! assert_eq!(serialize(&pyridine.into())?, "n1ccccc1");
//! # Ok::<(), smiles_tree::Error>(())
//! ```

mod bond;
pub use bond::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod tree;
pub use tree::*;

pub mod layout;
pub use layout::{Fusion, Layout, SequentialRing};

mod codegen;
pub use codegen::*;

pub mod parse;
pub use parse::{parse, parse_with};

mod decompile;
pub use decompile::*;

pub mod roundtrip;
pub use roundtrip::{is_valid_round_trip, normalize, RoundTripReport, RoundTripStatus};

use tracing::Level;

/// Install a `fmt` subscriber printing events up to `level` (`"trace"`,
/// `"debug"`, `"info"`, `"warn"` or `"error"`; anything else means info).
/// Only the first call in a process has any effect.
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
