//! Application layer - orchestration over the domain and ports.

mod coupon_service;
mod dialogue;
mod negotiation_service;

pub use coupon_service::CouponService;
pub use dialogue::{
    message_price_consistent, sanitize_buyer_message, DialogueGenerator, DialogueOutput,
    SanitizedMessage,
};
pub use negotiation_service::{
    NegotiationConfig, NegotiationService, OfferRequest, SessionReply,
};
