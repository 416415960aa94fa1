//! Lazy SMILES tokenizer built from nom combinators.

use crate::{Bond, LexError};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while_m_n},
    character::complete::{char, one_of, satisfy},
    combinator::{map, map_opt, map_res, recognize, value, verify},
    sequence::{delimited, preceded},
    IResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Organic-subset symbol or a bracket atom kept verbatim, brackets included.
    Atom(String),
    Bond(Bond),
    BranchOpen,
    BranchClose,
    RingBond(u16),
    Dot,
}

/// A token together with its byte offset and length in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
    pub len: usize,
}

fn organic_atom(input: &str) -> IResult<&str, Token> {
    map(
        alt((
            tag("Cl"),
            tag("Br"),
            recognize(one_of("BCNOPSFI")),
            recognize(one_of("bcnops")),
        )),
        |s: &str| Token::Atom(s.to_string()),
    )(input)
}

fn bracket_atom(input: &str) -> IResult<&str, Token> {
    map(
        recognize(delimited(
            char('['),
            verify(take_until("]"), |inner: &str| {
                !inner.is_empty() && !inner.contains('[')
            }),
            char(']'),
        )),
        |s: &str| Token::Atom(s.to_string()),
    )(input)
}

fn bond(input: &str) -> IResult<&str, Token> {
    map_opt(one_of("-=#:/\\"), |c| Bond::from_symbol(c).map(Token::Bond))(input)
}

fn digits(count: usize) -> impl FnMut(&str) -> IResult<&str, u16> {
    move |input| {
        map_res(
            take_while_m_n(count, count, |c: char| c.is_ascii_digit()),
            |s: &str| s.parse::<u16>(),
        )(input)
    }
}

fn ring_bond(input: &str) -> IResult<&str, Token> {
    map(
        alt((
            // `%NNN` is read greedily when it names 100..=999, otherwise `%NN`.
            preceded(char('%'), verify(digits(3), |n: &u16| *n >= 100)),
            preceded(char('%'), verify(digits(2), |n: &u16| *n >= 10)),
            map(satisfy(|c| ('1'..='9').contains(&c)), |c| {
                c as u16 - '0' as u16
            }),
        )),
        Token::RingBond,
    )(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        organic_atom,
        bracket_atom,
        bond,
        value(Token::BranchOpen, char('(')),
        value(Token::BranchClose, char(')')),
        ring_bond,
        value(Token::Dot, char('.')),
    ))(input)
}

/// Iterator over the tokens of a SMILES string.
///
/// Stops after the first error; the error carries the byte offset of the
/// offending character.
pub struct Tokenizer<'a> {
    input: &'a str,
    rest: &'a str,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            rest: input,
            failed: false,
        }
    }

    fn offset(&self) -> usize {
        self.input.len() - self.rest.len()
    }

    fn error_here(&self) -> LexError {
        let offset = self.offset();
        let mut chars = self.rest.chars();
        match chars.next() {
            Some('[') => match self.rest.find(']') {
                Some(1) => LexError::EmptyBracket { offset },
                Some(end) => match self.rest[1..end].find('[') {
                    Some(inner) => LexError::UnexpectedChar {
                        ch: '[',
                        offset: offset + 1 + inner,
                    },
                    None => LexError::UnclosedBracket { offset },
                },
                None => LexError::UnclosedBracket { offset },
            },
            Some('%') => LexError::ShortRingEscape { offset },
            Some(ch) => LexError::UnexpectedChar { ch, offset },
            None => LexError::UnexpectedChar { ch: '\0', offset },
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Spanned, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        let offset = self.offset();
        match token(self.rest) {
            Ok((rest, token)) => {
                let len = self.rest.len() - rest.len();
                self.rest = rest;
                Some(Ok(Spanned { token, offset, len }))
            }
            Err(_) => {
                self.failed = true;
                Some(Err(self.error_here()))
            }
        }
    }
}

/// Tokenize the whole input eagerly.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, LexError> {
    Tokenizer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(
            tokens("CC(=O)C"),
            vec![
                Token::Atom("C".into()),
                Token::Atom("C".into()),
                Token::BranchOpen,
                Token::Bond(Bond::Double),
                Token::Atom("O".into()),
                Token::BranchClose,
                Token::Atom("C".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_two_letter_halogens() {
        assert_eq!(
            tokens("ClCBr"),
            vec![
                Token::Atom("Cl".into()),
                Token::Atom("C".into()),
                Token::Atom("Br".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_bracket_atoms_verbatim() {
        assert_eq!(
            tokens("[NH3+][C@@H]"),
            vec![Token::Atom("[NH3+]".into()), Token::Atom("[C@@H]".into())]
        );
    }

    #[test]
    fn test_tokenize_ring_numbers() {
        assert_eq!(
            tokens("C1%42%123"),
            vec![
                Token::Atom("C".into()),
                Token::RingBond(1),
                Token::RingBond(42),
                Token::RingBond(123),
            ]
        );
        // Two-digit escapes start at 10.
        assert_eq!(
            tokens("C%10%99"),
            vec![
                Token::Atom("C".into()),
                Token::RingBond(10),
                Token::RingBond(99),
            ]
        );
        for short in ["C%00", "C%05", "C%012"] {
            assert_eq!(tokenize(short), Err(LexError::ShortRingEscape { offset: 1 }), "{short}");
        }
    }

    #[test]
    fn test_tokenize_offsets() {
        let spanned = tokenize("C.[Na+]").unwrap();
        assert_eq!(spanned[1].token, Token::Dot);
        assert_eq!(spanned[1].offset, 1);
        assert_eq!(spanned[2].offset, 2);
        assert_eq!(spanned[2].len, 5);
    }

    #[test]
    fn test_tokenize_errors() {
        assert_eq!(
            tokenize("CC[NH3"),
            Err(LexError::UnclosedBracket { offset: 2 })
        );
        assert_eq!(tokenize("C[]"), Err(LexError::EmptyBracket { offset: 1 }));
        assert_eq!(
            tokenize("C%4"),
            Err(LexError::ShortRingEscape { offset: 1 })
        );
        assert_eq!(
            tokenize("CX"),
            Err(LexError::UnexpectedChar { ch: 'X', offset: 1 })
        );
        assert_eq!(
            tokenize("C0"),
            Err(LexError::UnexpectedChar { ch: '0', offset: 1 })
        );
    }

    #[test]
    fn test_tokenizer_is_lazy() {
        let mut tokens = Tokenizer::new("CC?");
        assert!(tokens.next().unwrap().is_ok());
        assert!(tokens.next().unwrap().is_ok());
        assert!(tokens.next().unwrap().is_err());
        assert!(tokens.next().is_none());
    }
}
