use std::path::Path;

use reqwest::{multipart, Client};
use serde::Deserialize;

use crate::debug_log;
use crate::trace::Span;

pub const DEFAULT_API_URL: &str = "https://micrositegenerator.onrender.com/transcribe";
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct MicrositeApiConfig {
    pub url: String,
}

/// Deployment details for a generated microsite.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteOutcome {
    pub url: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MicrositeApiError {
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for MicrositeApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MicrositeApiError {}

fn err(code: &str, message: impl Into<String>) -> MicrositeApiError {
    MicrositeApiError {
        code: code.to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Deserialize)]
struct TranscribeResp {
    status: Option<String>,
    deployment: Option<Deployment>,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    site: Option<Site>,
}

#[derive(Debug, Deserialize)]
struct Site {
    url: Option<String>,
    name: Option<String>,
}

/// Submits one audio payload to the microsite endpoint. Exactly one attempt:
/// no retry, no timeout beyond the transport's own.
pub async fn generate_site(
    data_dir: &Path,
    demo_id: &str,
    client: &Client,
    cfg: &MicrositeApiConfig,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<SiteOutcome, MicrositeApiError> {
    let span = Span::start(
        data_dir,
        Some(demo_id),
        "Ingest",
        "API.generate_site",
        Some(serde_json::json!({
            "url": cfg.url,
            "file_name": file_name,
            "payload_bytes": bytes.len(),
        })),
    );

    let out = generate_site_inner(data_dir, demo_id, client, cfg, file_name, bytes).await;
    match &out {
        Ok(v) => span.ok(Some(serde_json::json!({
            "site_url": v.url,
            "has_name": v.name.is_some(),
        }))),
        Err(e) => span.err("remote", &e.code, &e.message, None),
    }
    out
}

async fn generate_site_inner(
    data_dir: &Path,
    demo_id: &str,
    client: &Client,
    cfg: &MicrositeApiConfig,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<SiteOutcome, MicrositeApiError> {
    let url = cfg.url.trim();
    if url.is_empty() {
        return Err(err("E_MICROSITE_CONFIG", "api_url is required"));
    }

    let part = multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(audio_mime(file_name))
        .map_err(|e| err("E_MICROSITE_CONFIG", format!("invalid mime: {e}")))?;
    let form = multipart::Form::new().part("file", part);

    let resp = client
        .post(url.to_string())
        .multipart(form)
        .send()
        .await
        .map_err(|e| err("E_MICROSITE_HTTP_SEND", format!("request failed: {e}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| err("E_MICROSITE_PARSE", format!("read response failed: {e}")))?;

    if !status.is_success() {
        debug_log::write_payload_best_effort(
            data_dir,
            demo_id,
            "response_body.txt",
            body.clone().into_bytes(),
        );
        let code = format!("E_MICROSITE_HTTP_STATUS_{}", status.as_u16());
        return Err(err(&code, clamp_chars(&body, MAX_ERROR_BODY_CHARS)));
    }

    parse_success_body(&body).map_err(|e| {
        debug_log::write_payload_best_effort(
            data_dir,
            demo_id,
            "response_body.txt",
            body.into_bytes(),
        );
        e
    })
}

/// A 2xx body counts as success only when it carries the success marker and
/// a deployed site url; anything else fails the ingestion.
pub(crate) fn parse_success_body(body: &str) -> Result<SiteOutcome, MicrositeApiError> {
    let parsed: TranscribeResp = serde_json::from_str(body)
        .map_err(|e| err("E_MICROSITE_PARSE", format!("invalid json response: {e}")))?;

    match parsed.status.as_deref() {
        Some("success") => {}
        Some(other) => {
            return Err(err(
                "E_MICROSITE_REJECTED",
                format!("response status was {other:?}"),
            ));
        }
        None => {
            return Err(err("E_MICROSITE_REJECTED", "response status is missing"));
        }
    }

    let site = parsed.deployment.and_then(|d| d.site);
    let url = site
        .as_ref()
        .and_then(|s| s.url.clone())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| err("E_MICROSITE_NO_URL", "deployment site url is missing"))?;
    let name = site
        .and_then(|s| s.name)
        .filter(|n| !n.trim().is_empty());
    Ok(SiteOutcome { url, name })
}

/// The backend rejects anything whose content type is not audio/*, so the
/// mime is derived from the file extension rather than sniffed.
fn audio_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "wav" => "audio/wav",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        _ => "audio/mpeg",
    }
}

fn clamp_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{head}...(truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_yields_url_and_name() {
        let body = r#"{"status":"success","deployment":{"site":{"url":"https://x/y","name":"Call One"}}}"#;
        let out = parse_success_body(body).expect("parse");
        assert_eq!(out.url, "https://x/y");
        assert_eq!(out.name.as_deref(), Some("Call One"));
    }

    #[test]
    fn success_without_name_is_still_success() {
        let body = r#"{"status":"success","deployment":{"site":{"url":"https://x/y"}}}"#;
        let out = parse_success_body(body).expect("parse");
        assert_eq!(out.url, "https://x/y");
        assert!(out.name.is_none());
    }

    #[test]
    fn empty_deployment_is_a_semantic_failure() {
        let body = r#"{"status":"success","deployment":{}}"#;
        let e = parse_success_body(body).expect_err("must fail");
        assert_eq!(e.code, "E_MICROSITE_NO_URL");
    }

    #[test]
    fn non_success_status_is_rejected() {
        let body = r#"{"status":"partial_success","deployment":{"site":{"url":"https://x/y"}}}"#;
        let e = parse_success_body(body).expect_err("must fail");
        assert_eq!(e.code, "E_MICROSITE_REJECTED");

        let body = r#"{"deployment":{"site":{"url":"https://x/y"}}}"#;
        let e = parse_success_body(body).expect_err("must fail");
        assert_eq!(e.code, "E_MICROSITE_REJECTED");
    }

    #[test]
    fn malformed_body_is_a_parse_failure() {
        let e = parse_success_body("<html>oops</html>").expect_err("must fail");
        assert_eq!(e.code, "E_MICROSITE_PARSE");
    }

    #[test]
    fn mime_follows_the_extension() {
        assert_eq!(audio_mime("call1.mp3"), "audio/mpeg");
        assert_eq!(audio_mime("call1.WAV"), "audio/wav");
        assert_eq!(audio_mime("call1.m4a"), "audio/mp4");
        assert_eq!(audio_mime("noext"), "audio/mpeg");
    }

    #[test]
    fn clamp_chars_truncates_long_bodies() {
        let long = "x".repeat(600);
        let out = clamp_chars(&long, 512);
        assert!(out.ends_with("...(truncated)"));
        assert!(out.len() < long.len());
        assert_eq!(clamp_chars("short", 512), "short");
    }
}
