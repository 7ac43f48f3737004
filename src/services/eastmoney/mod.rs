//! Eastmoney daily kline quote source
//!
//! Identifiers are Eastmoney `secid`s of the form `{market}.{code}`,
//! e.g. `1.600519`.

pub mod parser;
pub mod provider;

pub use parser::{parse_kline, parse_response, strip_envelope};
pub use provider::EastmoneyQuoteSource;

/// True for a well-formed `{market}.{code}` secid
pub fn is_valid_secid(identifier: &str) -> bool {
    match identifier.split_once('.') {
        Some((market, code)) => {
            !market.is_empty()
                && market.bytes().all(|b| b.is_ascii_digit())
                && !code.is_empty()
                && code.bytes().all(|b| b.is_ascii_alphanumeric())
        }
        None => false,
    }
}
