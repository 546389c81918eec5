//! Authority signing for the token side of the bridge: cross-chain mint
//! vouchers, token redemption documents, and privilege-authority documents,
//! all signed through the remote signing oracle with deterministic
//! recovery-identifier resolution.

pub mod document;
pub mod errors;
pub mod eth;
pub mod recovery;
pub mod voucher;

pub use document::{
    sign_privilege_authority, sign_privilege_verified, sign_token_authority,
    sign_token_redemption, SignOutcome, TokenRedemptionItem,
};
pub use errors::AuthorityError;
pub use eth::pubkey_to_eth_address;
pub use recovery::recover_matching_identifier;
pub use voucher::{sign_voucher, voucher_digest, MintVoucher};
