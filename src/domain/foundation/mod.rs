//! Foundation layer - shared value objects, errors, and traits.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;
mod token;

pub use errors::{DomainError, ErrorKind, ValidationError};
pub use ids::{ProductId, QuoteId, SessionId};
pub use money::{ceil_rupees, clamp_rupees, round_rupees, Rupees};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
pub use token::SessionToken;
