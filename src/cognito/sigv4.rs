//! AWS Signature Version 4 request signing
//!
//! The admin confirm call is an IAM-authenticated operation, unlike the
//! client-side auth calls which are unauthenticated. This module derives the
//! `Authorization` header for such requests from a static AWS key pair,
//! using the same HMAC-SHA256 primitives the session issuer signs with.

use crate::utils::crypto::{hex_encode, hmac_sha256, sha256_hex};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use url::Url;

/// Signing scope and key material for one request
pub struct SigV4Params<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

/// Headers produced by signing: the `Authorization` value plus the
/// `x-amz-date` timestamp that was signed into it.
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
}

/// Sign a POST request for the given target operation and JSON payload.
///
/// The canonical request covers `content-type`, `host`, `x-amz-date` and
/// `x-amz-target`, which matches how the signed Cognito admin calls are
/// sent by [`CognitoClient`](crate::cognito::CognitoClient).
///
/// # Errors
///
/// Returns an error if the endpoint URL has no host or HMAC computation
/// fails.
pub fn sign_post_request(
    params: &SigV4Params<'_>,
    endpoint: &Url,
    amz_target: &str,
    content_type: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<SignedHeaders> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| anyhow!("endpoint URL has no host"))?;
    let host = match endpoint.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let canonical_uri = if endpoint.path().is_empty() {
        "/"
    } else {
        endpoint.path()
    };

    // Canonical headers must be sorted by (lowercase) header name
    let canonical_headers = format!(
        "content-type:{content_type}\nhost:{host}\nx-amz-date:{amz_date}\nx-amz-target:{amz_target}\n"
    );
    let signed_headers = "content-type;host;x-amz-date;x-amz-target";

    let payload_hash = sha256_hex(payload);
    let canonical_request = format!(
        "POST\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );

    let credential_scope = format!(
        "{date_stamp}/{}/{}/aws4_request",
        params.region, params.service
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(params, &date_stamp)?;
    let signature = hex_encode(&hmac_sha256(string_to_sign.as_bytes(), &signing_key)?);

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        params.access_key_id
    );

    Ok(SignedHeaders {
        authorization,
        amz_date,
    })
}

/// Derive the per-day signing key: HMAC chain over date, region, service.
fn derive_signing_key(params: &SigV4Params<'_>, date_stamp: &str) -> Result<Vec<u8>> {
    let secret = format!("AWS4{}", params.secret_access_key);
    let k_date = hmac_sha256(date_stamp.as_bytes(), secret.as_bytes())?;
    let k_region = hmac_sha256(params.region.as_bytes(), &k_date)?;
    let k_service = hmac_sha256(params.service.as_bytes(), &k_region)?;
    hmac_sha256(b"aws4_request", &k_service)
}
