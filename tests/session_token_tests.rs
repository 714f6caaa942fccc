// SPDX-License-Identifier: MIT

//! Session token compatibility tests.
//!
//! These tests verify that tokens minted with the service's claim
//! shapes decode in the middleware's verification path, catching claim
//! drift between issuance and verification early.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use slope_registry::config::Config;
use slope_registry::db::FirestoreDb;
use slope_registry::services::tokens::{
    AccessClaims, TokenService, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS,
};

/// Refresh claims as the rotation path decodes them.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    iat: usize,
    exp: usize,
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn mint_access(user_id: &str, signing_key: &[u8], ttl: usize) -> String {
    let now = unix_now();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        phone: "01012345678".to_string(),
        name: "Test User".to_string(),
        admin: false,
        iat: now,
        exp: now + ttl,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("Failed to create access token")
}

fn offline_service(config: &Config) -> TokenService {
    TokenService::new(FirestoreDb::new_mock(), config)
}

#[test]
fn test_access_token_roundtrip_through_service() {
    let config = Config::test_default();
    let service = offline_service(&config);

    let token = mint_access("user-42", &config.access_token_secret, 900);
    let claims = service
        .verify_access(&token)
        .expect("Service should verify its own claim shape");

    assert_eq!(claims.sub, "user-42");
    assert_eq!(claims.phone, "01012345678");
    assert!(!claims.admin);
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_access_and_refresh_keys_are_distinct() {
    // A refresh-signed token must never pass access verification.
    let config = Config::test_default();
    let service = offline_service(&config);

    let token = mint_access("user-42", &config.refresh_token_secret, 900);
    assert!(service.verify_access(&token).is_err());
}

#[test]
fn test_expired_access_token_rejected() {
    let config = Config::test_default();
    let service = offline_service(&config);

    let now = unix_now();
    let claims = AccessClaims {
        sub: "user-42".to_string(),
        phone: "01012345678".to_string(),
        name: "Test User".to_string(),
        admin: true,
        iat: now - 2 * ACCESS_TOKEN_TTL_SECS as usize,
        exp: now - ACCESS_TOKEN_TTL_SECS as usize,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.access_token_secret),
    )
    .unwrap();

    assert!(service.verify_access(&token).is_err());
}

#[test]
fn test_refresh_claims_decode_with_refresh_key() {
    let config = Config::test_default();

    let now = unix_now();
    let claims = RefreshClaims {
        sub: "user-42".to_string(),
        iat: now,
        exp: now + REFRESH_TOKEN_TTL_SECS as usize,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.refresh_token_secret),
    )
    .unwrap();

    let key = DecodingKey::from_secret(&config.refresh_token_secret);
    let validation = Validation::new(Algorithm::HS256);
    let decoded = decode::<RefreshClaims>(&token, &key, &validation)
        .expect("Refresh claim shape should decode");

    assert_eq!(decoded.claims.sub, "user-42");
    assert!(decoded.claims.exp > decoded.claims.iat);
}

#[test]
fn test_token_lifetimes() {
    // Access tokens are short-lived; refresh tokens span a week.
    assert_eq!(ACCESS_TOKEN_TTL_SECS, 15 * 60);
    assert_eq!(REFRESH_TOKEN_TTL_SECS, 7 * 24 * 60 * 60);
    assert!(REFRESH_TOKEN_TTL_SECS > ACCESS_TOKEN_TTL_SECS);
}
