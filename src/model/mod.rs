pub mod ids;
pub mod contact;
pub mod identity;

// Re-exports for convenience
pub use ids::ContactId;
pub use contact::{Contact, LinkPrecedence, NewContact};
pub use identity::{ConsolidatedIdentity, IdentifyRequest, IdentifyResponse};
