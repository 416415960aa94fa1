use std::fmt::{Display, Formatter, Result as FmtResult};

/// Highest ring-bond number expressible in SMILES text (`%999`).
pub const MAX_RING_NUMBER: u16 = 999;

/// An explicit bond marker as written in SMILES text.
///
/// An implicit bond (nothing written between two atoms) is represented
/// by `None` wherever an `Option<Bond>` appears in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
    Up,
    Down,
    /// Fragment separator `.`; only ever the entry bond of a node.
    Dot,
}

impl Bond {
    pub fn symbol(self) -> char {
        match self {
            Bond::Single => '-',
            Bond::Double => '=',
            Bond::Triple => '#',
            Bond::Aromatic => ':',
            Bond::Up => '/',
            Bond::Down => '\\',
            Bond::Dot => '.',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        Some(match c {
            '-' => Bond::Single,
            '=' => Bond::Double,
            '#' => Bond::Triple,
            ':' => Bond::Aromatic,
            '/' => Bond::Up,
            '\\' => Bond::Down,
            '.' => Bond::Dot,
            _ => return None,
        })
    }

    /// Name of the variant as Rust source, used by the decompiler.
    pub fn variant_name(self) -> &'static str {
        match self {
            Bond::Single => "Single",
            Bond::Double => "Double",
            Bond::Triple => "Triple",
            Bond::Aromatic => "Aromatic",
            Bond::Up => "Up",
            Bond::Down => "Down",
            Bond::Dot => "Dot",
        }
    }
}

impl Display for Bond {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

/// Write an optional bond marker, nothing for an implicit bond.
pub(crate) fn push_bond(out: &mut String, bond: Option<Bond>) {
    if let Some(bond) = bond {
        out.push(bond.symbol());
    }
}

/// Ring-bond label as it appears in SMILES: `1`..`9`, `%10`..`%99`, `%100`..`%999`.
pub fn format_ring_number(number: u16) -> String {
    match number {
        0..=9 => number.to_string(),
        _ => format!("%{number}"),
    }
}

const ORGANIC: [&str; 16] = [
    "B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I", "b", "c", "n", "o", "p", "s",
];

/// Is `atom` a single SMILES atom: an organic-subset symbol or an opaque bracket atom?
pub fn is_valid_atom(atom: &str) -> bool {
    if ORGANIC.contains(&atom) {
        return true;
    }
    is_bracket_atom(atom)
}

pub fn is_bracket_atom(atom: &str) -> bool {
    atom.len() > 2
        && atom.starts_with('[')
        && atom.ends_with(']')
        && !atom[1..atom.len() - 1].contains(|c| c == '[' || c == ']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols() {
        for bond in [
            Bond::Single,
            Bond::Double,
            Bond::Triple,
            Bond::Aromatic,
            Bond::Up,
            Bond::Down,
            Bond::Dot,
        ] {
            assert_eq!(Bond::from_symbol(bond.symbol()), Some(bond));
        }
        assert_eq!(Bond::from_symbol('x'), None);
        assert_eq!(Bond::Down.to_string(), "\\");
    }

    #[test]
    fn ring_numbers() {
        assert_eq!(format_ring_number(1), "1");
        assert_eq!(format_ring_number(9), "9");
        assert_eq!(format_ring_number(10), "%10");
        assert_eq!(format_ring_number(42), "%42");
        assert_eq!(format_ring_number(123), "%123");
    }

    #[test]
    fn atoms() {
        assert!(is_valid_atom("C"));
        assert!(is_valid_atom("Cl"));
        assert!(is_valid_atom("c"));
        assert!(is_valid_atom("[NH3+]"));
        assert!(is_valid_atom("[C@@H]"));
        assert!(!is_valid_atom("CC"));
        assert!(!is_valid_atom("[]"));
        assert!(!is_valid_atom("[C[N]"));
        assert!(!is_valid_atom("X"));
    }
}
