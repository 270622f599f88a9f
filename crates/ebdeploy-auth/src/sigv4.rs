//! AWS Signature Version 4 signing.
//!
//! This module implements the signing flow:
//!
//! 1. Add the computed headers (`host`, `x-amz-date`, `x-amz-content-sha256`,
//!    and `x-amz-security-token` for temporary credentials).
//! 2. Build the canonical request from the descriptor.
//! 3. Build the string to sign from the timestamp, credential scope, and
//!    canonical request hash.
//! 4. Derive the signing key and compute the signature.
//! 5. Emit the `authorization` header.
//!
//! The main entry point is [`sign_request`]. The timestamp is captured once by
//! the caller and reused for every step, so the output is a pure function of
//! the descriptor and that timestamp.

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::canonical::{build_canonical_headers, build_canonical_request};
use crate::request::{RequestDescriptor, SignedRequest};

/// The signing algorithm.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Credential scope terminator.
const SCOPE_TERMINATOR: &str = "aws4_request";

/// Format of the `x-amz-date` header (ISO-8601 basic).
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Sign `request` for the instant `now`.
///
/// Never fails: the descriptor already carries validated credentials.
#[must_use]
pub fn sign_request(request: &RequestDescriptor, now: DateTime<Utc>) -> SignedRequest {
    let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
    let scope_date = now.format(SCOPE_DATE_FORMAT).to_string();
    let payload_hash = hash_payload(&request.payload);

    let mut headers: Vec<(String, String)> = request.headers.clone();
    if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("host")) {
        headers.push(("host".to_owned(), request.host.clone()));
    }
    headers.push(("x-amz-date".to_owned(), amz_date.clone()));
    headers.push(("x-amz-content-sha256".to_owned(), payload_hash.clone()));
    if let Some(token) = request.credentials.session_token() {
        headers.push(("x-amz-security-token".to_owned(), token.to_owned()));
    }

    let header_refs: Vec<(&str, &str)> = headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let (canonical_headers, signed_headers) = build_canonical_headers(&header_refs);

    let canonical_request = build_canonical_request(
        request.method.as_str(),
        &request.encoded_path(),
        &request.encoded_query(),
        &canonical_headers,
        &signed_headers,
        &payload_hash,
    );
    trace!(canonical_request, "built canonical request");

    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let credential_scope = format!(
        "{scope_date}/{}/{}/{SCOPE_TERMINATOR}",
        request.region, request.service
    );
    let string_to_sign = build_string_to_sign(&amz_date, &credential_scope, &canonical_hash);
    trace!(string_to_sign, "built string to sign");

    let signing_key = derive_signing_key(
        request.credentials.secret_access_key(),
        &scope_date,
        request.region.as_str(),
        &request.service,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    headers.push((
        "authorization".to_owned(),
        format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            request.credentials.access_key_id()
        ),
    ));

    SignedRequest {
        descriptor: request.clone(),
        timestamp: now,
        headers,
    }
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute the SHA-256 hash of the payload as a hex string.
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
