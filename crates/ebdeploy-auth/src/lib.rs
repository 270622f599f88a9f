//! AWS Signature Version 4 request signing for ebdeploy.
//!
//! This crate implements the signing side of SigV4: given a
//! [`RequestDescriptor`] and a timestamp, it produces the header set that
//! authenticates the request against the control plane. No vendor SDK is
//! involved; every step is computed here.
//!
//! # Overview
//!
//! Signing follows a fixed four-step derivation:
//!
//! 1. Canonicalize the request (method, path, query, headers, payload hash).
//! 2. Build a scoped string to sign from the hash of the canonical request.
//! 3. Derive a signing key by chaining HMAC-SHA256 over date, region, service
//!    and the `aws4_request` terminator, seeded from the secret key.
//! 4. HMAC the string to sign with the derived key and hex-encode the result.
//!
//! # Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use ebdeploy_auth::{Credentials, RequestDescriptor, sign_request};
//! use ebdeploy_core::AwsRegion;
//!
//! let credentials = Credentials::new("AKIDEXAMPLE", "secret", None).unwrap();
//! let request = RequestDescriptor::new(
//!     "elasticbeanstalk",
//!     http::Method::GET,
//!     "elasticbeanstalk.us-east-1.amazonaws.com",
//!     "/",
//!     AwsRegion::new("us-east-1"),
//!     credentials,
//! )
//! .with_query("Action", "DescribeEnvironments");
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let signed = sign_request(&request, now);
//! assert!(signed.authorization().starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/"));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction and the two percent-encoders
//! - [`credentials`] - Long-term credential triple
//! - [`request`] - Request descriptor and signed request values
//! - [`sigv4`] - Key derivation and signature computation

pub mod canonical;
pub mod credentials;
pub mod request;
pub mod sigv4;

pub use credentials::Credentials;
pub use request::{RequestDescriptor, SignedRequest};
pub use sigv4::{hash_payload, sign_request};
