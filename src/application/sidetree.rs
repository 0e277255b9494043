//! Sidetree create and update operation requests
//!
//! Keys are P-256. Hashes are SHA2-256 multihashes, base64url encoded without
//! padding. JSON is canonicalized (sorted keys, no whitespace) before hashing
//! or encoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use p256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::application::error_ext::JsonResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::JsonPatchOp;

/// Multihash code for SHA2-256.
pub const SHA2_256: u8 = 0x12;

/// Key ID placed in the JWS header of update requests.
pub const UPDATE_KEY_ID: &str = "update-key";

/// Public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl Jwk {
    pub fn from_public_key(key: &PublicKey) -> ApplicationResult<Self> {
        let point = key.to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(ApplicationError::precondition("invalid public key"));
        };
        Ok(Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        })
    }
}

/// Parse a PKIX (`BEGIN PUBLIC KEY`) PEM.
pub fn public_key_from_pem(pem: &str) -> ApplicationResult<PublicKey> {
    if !pem.contains("-----BEGIN") {
        return Err(ApplicationError::precondition("public key not found in PEM"));
    }
    PublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| ApplicationError::precondition(format!("invalid public key: {e}")))
}

/// Parse an EC private key PEM, SEC1 (`BEGIN EC PRIVATE KEY`) or PKCS#8.
pub fn private_key_from_pem(pem: &str) -> ApplicationResult<SecretKey> {
    if !pem.contains("-----BEGIN") {
        return Err(ApplicationError::precondition("private key not found in PEM"));
    }
    let pem = pem.trim();
    let parsed = if pem.contains("EC PRIVATE KEY") {
        SecretKey::from_sec1_pem(pem).map_err(|e| e.to_string())
    } else {
        SecretKey::from_pkcs8_pem(pem).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| ApplicationError::precondition(format!("invalid private key: {e}")))
}

/// Recursively sort object keys.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON bytes: sorted keys, no whitespace.
pub fn canonicalize<T: Serialize>(value: &T) -> ApplicationResult<Vec<u8>> {
    let value = serde_json::to_value(value).json_context("canonicalize JSON")?;
    serde_json::to_vec(&canonical_value(&value)).json_context("canonicalize JSON")
}

/// SHA2-256 multihash of `data`: code, length, digest.
pub fn multihash(data: &[u8]) -> Vec<u8> {
    let digest = Sha256::digest(data);
    let mut out = Vec::with_capacity(2 + digest.len());
    out.push(SHA2_256);
    out.push(digest.len() as u8);
    out.extend_from_slice(&digest);
    out
}

pub fn encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Encoded multihash of the canonical form of `value`.
pub fn encoded_multihash<T: Serialize>(value: &T) -> ApplicationResult<String> {
    Ok(encode(&multihash(&canonicalize(value)?)))
}

/// Commitment to a public key: multihash over the SHA-256 of its canonical JWK.
pub fn commitment(jwk: &Jwk) -> ApplicationResult<String> {
    let digest = Sha256::digest(canonicalize(jwk)?);
    Ok(encode(&multihash(&digest)))
}

/// Build a create request anchoring `document`.
pub fn create_request(
    document: &Value,
    recovery_key: &PublicKey,
    update_key: &PublicKey,
) -> ApplicationResult<Vec<u8>> {
    let recovery_commitment = commitment(&Jwk::from_public_key(recovery_key)?)?;
    let update_commitment = commitment(&Jwk::from_public_key(update_key)?)?;

    let delta = json!({
        "update_commitment": update_commitment,
        "patches": [{"action": "replace", "document": document}],
    });
    let suffix_data = json!({
        "delta_hash": encoded_multihash(&delta)?,
        "recovery_commitment": recovery_commitment,
    });

    let request = json!({
        "type": "create",
        "suffix_data": encode(&canonicalize(&suffix_data)?),
        "delta": encode(&canonicalize(&delta)?),
    });
    canonicalize(&request)
}

/// Build a signed update request applying `patches` to the document `did_suffix`.
pub fn update_request(
    did_suffix: &str,
    patches: &[JsonPatchOp],
    signing_key: &SecretKey,
    next_update_key: &PublicKey,
) -> ApplicationResult<Vec<u8>> {
    let delta = json!({
        "update_commitment": commitment(&Jwk::from_public_key(next_update_key)?)?,
        "patches": [{"action": "ietf-json-patch", "patches": patches}],
    });
    let signed_payload = json!({
        "update_key": Jwk::from_public_key(&signing_key.public_key())?,
        "delta_hash": encoded_multihash(&delta)?,
    });

    let request = json!({
        "type": "update",
        "did_suffix": did_suffix,
        "signed_data": sign_compact_jws(&signed_payload, signing_key)?,
        "delta": encode(&canonicalize(&delta)?),
    });
    canonicalize(&request)
}

/// ES256 compact JWS over the canonical payload.
fn sign_compact_jws(payload: &Value, key: &SecretKey) -> ApplicationResult<String> {
    let header = json!({"alg": "ES256", "kid": UPDATE_KEY_ID});
    let signing_input = format!(
        "{}.{}",
        encode(&canonicalize(&header)?),
        encode(&canonicalize(payload)?)
    );
    let signer = SigningKey::from(key);
    let signature: Signature = signer.sign(signing_input.as_bytes());
    Ok(format!("{}.{}", signing_input, encode(&signature.to_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::VerifyingKey;

    const SIGNING_PEM: &str = include_str!("../../tests/fixtures/keys/signing.pem");
    const SIGNING_PUB_PEM: &str = include_str!("../../tests/fixtures/keys/signing.pub.pem");
    const NEXT_PUB_PEM: &str = include_str!("../../tests/fixtures/keys/next.pub.pem");

    fn decode_json(segment: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_jwk_and_commitment() {
        let key = public_key_from_pem(SIGNING_PUB_PEM).unwrap();
        let jwk = Jwk::from_public_key(&key).unwrap();
        assert_eq!(jwk.x, "nSJKmJE7H3yMbjseVLLf9slwloHgdyjUA6YBLHM2rgc");
        assert_eq!(jwk.y, "insK3zRXibAxstlBaQKRfxAyzdkGxDRI48zTJg-L8Bg");
        assert_eq!(
            String::from_utf8(canonicalize(&jwk).unwrap()).unwrap(),
            r#"{"crv":"P-256","kty":"EC","x":"nSJKmJE7H3yMbjseVLLf9slwloHgdyjUA6YBLHM2rgc","y":"insK3zRXibAxstlBaQKRfxAyzdkGxDRI48zTJg-L8Bg"}"#
        );
        assert_eq!(
            commitment(&jwk).unwrap(),
            "EiAAasFy_V4P664SUWITyt6s4M9h6Jr_290N2B-KVc4MxA"
        );
    }

    #[test]
    fn test_private_key_matches_public_key() {
        let secret = private_key_from_pem(SIGNING_PEM).unwrap();
        let public = public_key_from_pem(SIGNING_PUB_PEM).unwrap();
        assert_eq!(secret.public_key(), public);
    }

    #[test]
    fn test_missing_pem_block() {
        assert_eq!(
            public_key_from_pem("garbage").unwrap_err().to_string(),
            "public key not found in PEM"
        );
        assert_eq!(
            private_key_from_pem("garbage").unwrap_err().to_string(),
            "private key not found in PEM"
        );
    }

    #[test]
    fn test_canonicalize_sorts_nested_keys() {
        let value = json!({"b": {"d": 1, "c": 2}, "a": [{"z": 0, "y": 1}]});
        assert_eq!(
            String::from_utf8(canonicalize(&value).unwrap()).unwrap(),
            r#"{"a":[{"y":1,"z":0}],"b":{"c":2,"d":1}}"#
        );
    }

    #[test]
    fn test_create_request_shape() {
        let key = public_key_from_pem(SIGNING_PUB_PEM).unwrap();
        let doc = json!({"fileIndex": {"basePath": "/content"}});
        let request: Value = serde_json::from_slice(&create_request(&doc, &key, &key).unwrap()).unwrap();

        assert_eq!(request["type"], "create");
        let delta = decode_json(request["delta"].as_str().unwrap());
        assert_eq!(delta["patches"][0]["action"], "replace");
        assert_eq!(delta["patches"][0]["document"], doc);

        let suffix = decode_json(request["suffix_data"].as_str().unwrap());
        assert_eq!(
            suffix["recovery_commitment"],
            "EiAAasFy_V4P664SUWITyt6s4M9h6Jr_290N2B-KVc4MxA"
        );
        assert_eq!(suffix["delta_hash"], encoded_multihash(&delta).unwrap());
    }

    #[test]
    fn test_update_request_signature_verifies() {
        let signing = private_key_from_pem(SIGNING_PEM).unwrap();
        let next = public_key_from_pem(NEXT_PUB_PEM).unwrap();
        let patches = vec![JsonPatchOp {
            op: "add".into(),
            path: "/fileIndex/mappings/a.json".into(),
            value: "hash1".into(),
        }];
        let request: Value =
            serde_json::from_slice(&update_request("suffix1", &patches, &signing, &next).unwrap())
                .unwrap();

        assert_eq!(request["type"], "update");
        assert_eq!(request["did_suffix"], "suffix1");

        let jws = request["signed_data"].as_str().unwrap();
        let parts: Vec<&str> = jws.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(decode_json(parts[0])["kid"], UPDATE_KEY_ID);

        let payload = decode_json(parts[1]);
        let delta = decode_json(request["delta"].as_str().unwrap());
        assert_eq!(payload["delta_hash"], encoded_multihash(&delta).unwrap());
        assert_eq!(delta["patches"][0]["patches"][0]["op"], "add");

        let signature =
            Signature::from_slice(&URL_SAFE_NO_PAD.decode(parts[2]).unwrap()).unwrap();
        let verifier = VerifyingKey::from(signing.public_key());
        verifier
            .verify(format!("{}.{}", parts[0], parts[1]).as_bytes(), &signature)
            .unwrap();
    }
}
