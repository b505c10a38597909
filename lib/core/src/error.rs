//! Error handling foundation for weft.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums and wraps them in rootcause's `Report` as they propagate, adding
//! context with `.context()` where a layer knows more than the one below.

use rootcause::Report;
use rootcause::markers::Dynamic;

/// A Result type alias using rootcause's Report for error handling.
///
/// `Result<T>` carries a dynamic report; typed layers name their context,
/// e.g. `Result<(), GraphError>`.
pub type Result<T, C = Dynamic> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, PartialEq, Eq)]
    struct Odd(u16);

    impl fmt::Display for Odd {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} is odd", self.0)
        }
    }

    impl std::error::Error for Odd {}

    fn parse(input: &str) -> Result<u16> {
        let value = input.parse::<u16>()?;
        Ok(value)
    }

    fn even(value: u16) -> Result<u16, Odd> {
        if value % 2 == 1 {
            return Err(Report::new(Odd(value)));
        }
        Ok(value)
    }

    #[test]
    fn question_mark_lifts_std_errors() {
        assert_eq!(parse("42").expect("should parse"), 42);
        assert!(parse("forty-two").is_err());
    }

    #[test]
    fn typed_context_is_preserved() {
        assert_eq!(even(4).expect("even"), 4);
        let err = even(3).unwrap_err();
        assert_eq!(err.current_context(), &Odd(3));
    }
}
