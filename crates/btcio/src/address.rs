//! Address validation and script derivation for the active network.

use bitcoin::{Address, CompressedPublicKey, Network, ScriptBuf};

use crate::errors::BuildError;

/// Validates `addr` against `network` and returns its script form.
pub fn to_output_script(addr: &str, network: Network) -> Result<ScriptBuf, BuildError> {
    let parsed = addr
        .parse::<Address<bitcoin::address::NetworkUnchecked>>()
        .map_err(|_| BuildError::InvalidAddress(addr.to_string()))?;
    let checked = parsed
        .require_network(network)
        .map_err(|_| BuildError::InvalidAddress(addr.to_string()))?;
    Ok(checked.script_pubkey())
}

/// Whether `addr` parses as any supported format on `network`.
pub fn is_valid_address(addr: &str, network: Network) -> bool {
    to_output_script(addr, network).is_ok()
}

/// The bridge's own receiving address: p2wpkh over the service key.
pub fn pubkey_to_p2wpkh(pubkey: &[u8], network: Network) -> Result<Address, BuildError> {
    let key = CompressedPublicKey::from_slice(pubkey)?;
    Ok(Address::p2wpkh(&key, network))
}
