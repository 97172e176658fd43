use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

/// Holds the authenticated-user value gating the dashboard view.
///
/// The identity token is decoded locally without signature verification, so
/// the profile is a display hint only, never an access-control decision;
/// anything trust-bearing must be verified by the issuing provider.
#[derive(Default)]
pub struct SessionGate {
    user: Mutex<Option<UserProfile>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<UserProfile> {
        self.user.lock().unwrap().clone()
    }

    /// Restores a previously persisted session, if any. Best-effort: a
    /// missing or unreadable file just leaves the gate closed.
    pub fn restore_best_effort(&self, data_dir: &Path) {
        match load_session(data_dir) {
            Ok(Some(profile)) => {
                *self.user.lock().unwrap() = Some(profile);
            }
            Ok(None) => {}
            Err(e) => {
                crate::safe_eprintln!("session: restore failed: {e:#}");
            }
        }
    }

    /// Decodes the token payload, persists the profile for future launches,
    /// and opens the gate. Concurrent logins race on the file; last write
    /// wins.
    pub fn complete_login(&self, data_dir: &Path, id_token: &str) -> Result<UserProfile> {
        let profile = decode_profile(id_token)?;
        save_session(data_dir, &profile)?;
        *self.user.lock().unwrap() = Some(profile.clone());
        Ok(profile)
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    name: Option<String>,
    email: Option<String>,
}

/// Extracts a display name from a compact JWS without verifying it.
pub fn decode_profile(id_token: &str) -> Result<UserProfile> {
    let payload = id_token
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("id token has no payload segment"))?;
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .context("decode id token payload failed")?;
    let claims: IdTokenClaims =
        serde_json::from_slice(&raw).context("parse id token payload failed")?;
    let name = claims
        .name
        .filter(|s| !s.trim().is_empty())
        .or_else(|| claims.email.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "Authenticated User".to_string());
    Ok(UserProfile { name })
}

pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}

pub fn load_session(data_dir: &Path) -> Result<Option<UserProfile>> {
    let p = session_path(data_dir);
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&p).context("read session.json failed")?;
    let v: UserProfile = serde_json::from_str(&s).context("parse session.json failed")?;
    Ok(Some(v))
}

pub fn save_session(data_dir: &Path, profile: &UserProfile) -> Result<()> {
    std::fs::create_dir_all(data_dir).ok();
    let p = session_path(data_dir);
    let s = serde_json::to_string_pretty(profile).context("serialize session failed")?;
    fs::write(&p, s).context("write session.json failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn token_with_payload(payload: &str) -> String {
        let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.{}",
            b64.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
            b64.encode(payload),
            "unverified-signature"
        )
    }

    #[test]
    fn decode_prefers_name_claim() {
        let tok = token_with_payload(r#"{"name":"Jane Doe","email":"jane@example.com"}"#);
        let p = decode_profile(&tok).expect("decode");
        assert_eq!(p.name, "Jane Doe");
    }

    #[test]
    fn decode_falls_back_to_email_then_placeholder() {
        let tok = token_with_payload(r#"{"email":"jane@example.com"}"#);
        assert_eq!(decode_profile(&tok).expect("decode").name, "jane@example.com");

        let tok = token_with_payload(r#"{"sub":"12345"}"#);
        assert_eq!(decode_profile(&tok).expect("decode").name, "Authenticated User");
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(decode_profile("not-a-jwt").is_err());
        assert!(decode_profile("a..c").is_err());
        let bad_b64 = format!("h.{}.s", "!!!not base64url!!!");
        assert!(decode_profile(&bad_b64).is_err());
        let bad_json = token_with_payload("not json");
        assert!(decode_profile(&bad_json).is_err());
    }

    #[test]
    fn login_persists_and_restore_reopens_the_gate() {
        let td = tempfile::tempdir().expect("tempdir");
        let gate = SessionGate::new();
        assert!(gate.current().is_none());

        let tok = token_with_payload(r#"{"name":"Jane Doe"}"#);
        let p = gate.complete_login(td.path(), &tok).expect("login");
        assert_eq!(p.name, "Jane Doe");
        assert_eq!(gate.current(), Some(p.clone()));

        // Fresh gate, same data dir: session survives the restart.
        let gate2 = SessionGate::new();
        gate2.restore_best_effort(td.path());
        assert_eq!(gate2.current(), Some(p));
    }

    #[test]
    fn failed_login_leaves_the_gate_closed() {
        let td = tempfile::tempdir().expect("tempdir");
        let gate = SessionGate::new();
        assert!(gate.complete_login(td.path(), "garbage").is_err());
        assert!(gate.current().is_none());
        assert!(load_session(td.path()).expect("load").is_none());
    }
}
