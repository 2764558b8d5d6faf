//! Signed, TTL-bound quotes issued when a negotiation closes.

mod quote;
mod signer;

pub use quote::{Quote, SignedQuote};
pub use signer::QuoteSigner;
