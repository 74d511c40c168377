// Public handlers: account creation, sign-in, token exchange and
// read-only board access. Every input is untrusted.
pub mod auth;
pub mod board;
pub mod tokens;
