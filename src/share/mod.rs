//! Token-gated public profile sharing.
//!
//! An owner mints a public key (`HID-…`) plus a 3-hour access token and hands
//! out the resulting link / QR code. Anyone holding both can read a sanitized
//! subset of the owner's profile until the token expires.
//!
//! ## Flow
//!
//! ```text
//! owner ──POST /mint──► authenticate ─► key (given or generated)
//!                         ─► store.upsert_mapping ─► tokens.issue ─► share URL
//!
//! holder ──GET /profile?key&t──► shape checks ─► tokens.verify
//!                         ─► store.lookup_owner ─► store.get_profile ─► sanitize
//! ```
//!
//! Tokens are stateless and cannot be revoked; the short lifetime is the only
//! limit on a leaked link.

pub mod api;
pub mod key;
pub mod sanitize;
pub mod token;
