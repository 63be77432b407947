use ed25519_dalek::{Signature, Signer as _, Verifier as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::base64url;
use crate::errors::TokenError;
use crate::keys::Keyring;

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    kid: String,
}

impl ProtectedHeader {
    fn new(kid: &str) -> Self {
        Self {
            alg: "EdDSA".to_string(),
            kid: kid.to_string(),
        }
    }
}

/// Compact JWS with attached JSON payload: `header.payload.signature`.
pub fn sign<T: Serialize>(keyring: &Keyring, claims: &T) -> Result<String, TokenError> {
    let header = ProtectedHeader::new(&keyring.kid);
    let header_bytes = serde_json::to_vec(&header)
        .map_err(|err| TokenError::internal(&format!("encode protected header: {err}")))?;
    let payload_bytes = serde_json::to_vec(claims)
        .map_err(|err| TokenError::internal(&format!("encode claims: {err}")))?;

    let header_segment = base64url::encode(&header_bytes);
    let payload_segment = base64url::encode(&payload_bytes);
    let signing_input = signing_input(&header_segment, &payload_segment);
    let signature = keyring.signing_key.sign(&signing_input);
    let signature_segment = base64url::encode(&signature.to_bytes());
    Ok(format!("{header_segment}.{payload_segment}.{signature_segment}"))
}

/// Verifies the signature against this keyring only; a token minted under a
/// different kid or key is rejected. Expiry is the caller's concern.
pub fn verify<T: DeserializeOwned>(keyring: &Keyring, token: &str) -> Result<T, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::unauthenticated(
            "expected compact JWS with three segments",
        ));
    }
    let (header_segment, payload_segment, signature_segment) =
        (segments[0], segments[1], segments[2]);

    let header_bytes = base64url::decode(header_segment)?;
    let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
        .map_err(|err| TokenError::unauthenticated(&format!("decode protected header: {err}")))?;
    if header.alg != "EdDSA" {
        return Err(TokenError::unauthenticated(&format!(
            "unsupported jws alg {}",
            header.alg
        )));
    }
    if header.kid != keyring.kid {
        return Err(TokenError::unauthenticated(&format!(
            "token kid {} does not belong to this trust domain",
            header.kid
        )));
    }

    let signature = parse_signature(signature_segment)?;
    let signing_input = signing_input(header_segment, payload_segment);
    keyring
        .verifying_key
        .verify(&signing_input, &signature)
        .map_err(|err| {
            TokenError::unauthenticated(&format!("signature verification failed: {err}"))
        })?;

    let payload_bytes = base64url::decode(payload_segment)?;
    serde_json::from_slice(&payload_bytes)
        .map_err(|err| TokenError::unauthenticated(&format!("decode claims: {err}")))
}

fn signing_input(header_segment: &str, payload_segment: &str) -> Vec<u8> {
    let mut input = Vec::with_capacity(header_segment.len() + 1 + payload_segment.len());
    input.extend_from_slice(header_segment.as_bytes());
    input.push(b'.');
    input.extend_from_slice(payload_segment.as_bytes());
    input
}

fn parse_signature(encoded: &str) -> Result<Signature, TokenError> {
    let bytes = base64url::decode(encoded)?;
    let arr: [u8; 64] = bytes
        .try_into()
        .map_err(|_| TokenError::unauthenticated("invalid signature length"))?;
    Ok(Signature::from_bytes(&arr))
}
