// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (session token required, AuthUser in extensions)
pub mod protected;
pub mod public;
pub mod validation;
