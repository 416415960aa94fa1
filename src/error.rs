use thiserror::Error;

/// Malformed token in the SMILES text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unclosed bracket atom '[' at offset {offset}")]
    UnclosedBracket { offset: usize },
    #[error("Empty bracket atom '[]' at offset {offset}")]
    EmptyBracket { offset: usize },
    #[error("'%' at offset {offset} must be followed by two digits (10-99) or three digits (100-999)")]
    ShortRingEscape { offset: usize },
    #[error("Unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnclosedBracket { offset }
            | LexError::EmptyBracket { offset }
            | LexError::ShortRingEscape { offset }
            | LexError::UnexpectedChar { offset, .. } => *offset,
        }
    }
}

/// Token sequence that does not form a valid SMILES.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Two bond markers in a row at offset {offset}")]
    ConsecutiveBonds { offset: usize },
    #[error("Bond marker at offset {offset} is not followed by an atom or ring bond")]
    DanglingBond { offset: usize },
    #[error("Bond marker at offset {offset} has no preceding atom")]
    BondWithoutAtom { offset: usize },
    #[error("Branch start '(' at offset {offset} without a current atom")]
    BranchWithoutAtom { offset: usize },
    #[error("Branch end ')' at offset {offset} without a matching '('")]
    UnmatchedBranchClose { offset: usize },
    #[error("Empty branch at offset {offset}")]
    EmptyBranch { offset: usize },
    #[error("Branch opened at offset {offset} is never closed")]
    UnclosedBranch { offset: usize },
    #[error("Ring bond {number} at offset {offset} without a preceding atom")]
    RingWithoutAtom { number: u16, offset: usize },
    #[error("Ring bond {number} opened at offset {offset} is never closed")]
    UnclosedRing { number: u16, offset: usize },
    #[error("Ring bond {number} at offset {offset} closes on the atom that opened it")]
    SelfClosingRing { number: u16, offset: usize },
    #[error("Ring bond {number} at offset {offset} has conflicting bond markers at its two ends")]
    RingBondConflict { number: u16, offset: usize },
    #[error("Ring bond {number} at offset {offset} spans only {size} atoms (rings need at least 3)")]
    RingTooSmall { number: u16, offset: usize, size: usize },
    #[error("Ring bond {number} at offset {offset} joins two '.'-separated fragments")]
    RingAcrossDot { number: u16, offset: usize },
    #[error("'.' at offset {offset} without a preceding atom")]
    DotWithoutAtom { offset: usize },
}

impl ParseError {
    /// Byte offset of the offending token, when there is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Empty => None,
            ParseError::ConsecutiveBonds { offset }
            | ParseError::DanglingBond { offset }
            | ParseError::BondWithoutAtom { offset }
            | ParseError::BranchWithoutAtom { offset }
            | ParseError::UnmatchedBranchClose { offset }
            | ParseError::EmptyBranch { offset }
            | ParseError::UnclosedBranch { offset }
            | ParseError::RingWithoutAtom { offset, .. }
            | ParseError::UnclosedRing { offset, .. }
            | ParseError::SelfClosingRing { offset, .. }
            | ParseError::RingBondConflict { offset, .. }
            | ParseError::RingTooSmall { offset, .. }
            | ParseError::RingAcrossDot { offset, .. }
            | ParseError::DotWithoutAtom { offset } => Some(*offset),
        }
    }
}

/// The recursion cap was exceeded while parsing, building or emitting a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Nesting depth exceeds the limit of {limit} while {context}")]
pub struct DepthError {
    pub limit: usize,
    pub context: &'static str,
}

/// A tree operation was called with arguments that do not fit the node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("{op}: position {position} is out of range 1..={len}")]
    PositionOutOfRange {
        op: &'static str,
        position: usize,
        len: usize,
    },
    #[error("{op}: needs at least one atom or component")]
    Empty { op: &'static str },
    #[error("{op}: component index {index} is out of range (molecule has {len})")]
    ComponentOutOfRange {
        op: &'static str,
        index: usize,
        len: usize,
    },
    #[error("{op}: no ring numbered {number}")]
    UnknownRing { op: &'static str, number: u16 },
    #[error("{op}: not supported on a {found} node")]
    WrongVariant {
        op: &'static str,
        found: &'static str,
    },
    #[error("{op}: {atom:?} is not a SMILES atom")]
    InvalidAtom { op: &'static str, atom: String },
    #[error("{op}: ring size {size} is below 3")]
    InvalidSize { op: &'static str, size: usize },
    #[error("{op}: ring number {number} is outside 1..=999")]
    InvalidRingNumber { op: &'static str, number: usize },
    #[error("{op}: expected {expected} bond markers, got {found}")]
    BondCount {
        op: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{op}: '.' cannot join atoms inside a chain or ring")]
    DotInsideNode { op: &'static str },
    #[error("{op}: offset {offset} does not touch the rings placed so far")]
    InvalidOffset { op: &'static str, offset: usize },
    #[error("{op}: depth {depth} skips a level (deepest open level is {max})")]
    InvalidDepth {
        op: &'static str,
        depth: usize,
        max: usize,
    },
    #[error("{op}: {reason}")]
    InvalidLayout { op: &'static str, reason: String },
}

/// Internal inconsistency found while emitting SMILES.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[error("Ring {number} has size {size}, rings need at least 3 atoms")]
    InvalidRingSize { number: u16, size: usize },
    #[error("Ring {number} is not opened and closed exactly once")]
    UnpairedRing { number: u16 },
    #[error("Slot {slot} has no atom value")]
    MissingAtom { slot: usize },
    #[error("Fused ring windows leave slot {slot} disconnected")]
    DisconnectedWindow { slot: usize },
    #[error("Layout is inconsistent: {reason}")]
    BadLayout { reason: String },
    #[error("All ring numbers up to 999 are open at once")]
    RingNumbersExhausted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Depth(#[from] DepthError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl Error {
    /// Process exit code a command-line wrapper reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Lex(_) | Error::Parse(_) => 2,
            Error::Serialize(_) => 3,
            Error::Operation(_) => 4,
            Error::Depth(_) => 5,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(Error::from(LexError::UnclosedBracket { offset: 0 }).exit_code(), 2);
        assert_eq!(Error::from(ParseError::Empty).exit_code(), 2);
        assert_eq!(
            Error::from(SerializeError::UnpairedRing { number: 1 }).exit_code(),
            3
        );
        assert_eq!(
            Error::from(OperationError::UnknownRing { op: "renumber", number: 4 }).exit_code(),
            4
        );
        assert_eq!(
            Error::from(DepthError { limit: 8, context: "parsing" }).exit_code(),
            5
        );
    }

    #[test]
    fn messages_carry_offsets() {
        let err = ParseError::UnclosedBranch { offset: 3 };
        assert_eq!(err.offset(), Some(3));
        assert_eq!(err.to_string(), "Branch opened at offset 3 is never closed");
        let err = LexError::ShortRingEscape { offset: 5 };
        assert!(err.to_string().contains("offset 5"));
    }
}
