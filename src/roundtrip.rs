//! Round-trip validation: parse, serialize, and do it again.

use crate::{parse_with, serialize_with, Config, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::*;

/// How a SMILES string survives `serialize(parse(..))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundTripStatus {
    /// The first pass reproduces the input.
    Perfect,
    /// The first pass changes the input; the second pass changes nothing.
    Stabilizes,
    /// The second pass still changes the text.
    Unstable,
}

impl RoundTripStatus {
    pub fn name(self) -> &'static str {
        match self {
            RoundTripStatus::Perfect => "perfect",
            RoundTripStatus::Stabilizes => "stabilizes",
            RoundTripStatus::Unstable => "unstable",
        }
    }

    pub fn is_valid(self) -> bool {
        self != RoundTripStatus::Unstable
    }
}

impl Display for RoundTripStatus {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub input: String,
    /// `serialize(parse(input))`
    pub first: String,
    /// `serialize(parse(first))`
    pub second: String,
    pub status: RoundTripStatus,
}

impl Display for RoundTripReport {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self.status {
            RoundTripStatus::Perfect => write!(f, "{}: {}", self.status, self.input),
            RoundTripStatus::Stabilizes => {
                write!(f, "{}: {} -> {}", self.status, self.input, self.first)
            }
            RoundTripStatus::Unstable => write!(
                f,
                "{}: {} -> {} -> {}",
                self.status, self.input, self.first, self.second
            ),
        }
    }
}

/// The canonical form this crate writes for `smiles`.
pub fn normalize(smiles: &str) -> Result<String> {
    normalize_with(smiles, &Config::default())
}

pub fn normalize_with(smiles: &str, config: &Config) -> Result<String> {
    serialize_with(&parse_with(smiles, config)?, config)
}

pub fn round_trip(smiles: &str) -> Result<RoundTripReport> {
    round_trip_with(smiles, &Config::default())
}

pub fn round_trip_with(smiles: &str, config: &Config) -> Result<RoundTripReport> {
    let first = normalize_with(smiles, config)?;
    let second = normalize_with(&first, config)?;
    let status = if first == smiles {
        RoundTripStatus::Perfect
    } else if second == first {
        RoundTripStatus::Stabilizes
    } else {
        RoundTripStatus::Unstable
    };
    match status {
        RoundTripStatus::Unstable => warn!("{smiles} does not stabilize: {first} -> {second}"),
        _ => debug!("{smiles} round-trips as {status}"),
    }
    Ok(RoundTripReport {
        input: smiles.to_string(),
        first,
        second,
        status,
    })
}

/// True when `smiles` parses and its serialization is a fixed point.
pub fn is_valid_round_trip(smiles: &str) -> bool {
    round_trip(smiles).is_ok_and(|report| report.status.is_valid())
}

/// Round-trip every input; failures are reported per input.
pub fn check_many<I, S>(inputs: I, config: &Config) -> Vec<(String, Result<RoundTripReport>)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let results: Vec<(String, Result<RoundTripReport>)> = inputs
        .into_iter()
        .map(|smiles| {
            let smiles = smiles.as_ref();
            (smiles.to_string(), round_trip_with(smiles, config))
        })
        .collect();
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    info!("Checked {} inputs, {failed} failed to parse", results.len());
    results
}
