//! `otpauth://` key-URI ingestion and generation.
//!
//! This is the seam between QR scanning and account creation: the
//! scanner hands over the decoded text and gets back an [`AccountDraft`]
//! ready for `POST /accounts`. Generation is the reverse direction,
//! used when rendering an account back out as a QR code.
//!
//! Format reference:
//! <https://github.com/google/google-authenticator/wiki/Key-Uri-Format>

use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse an `otpauth://` URI into an [`AccountDraft`].
///
/// Tolerant of sloppy input the way authenticator apps are in
/// practice: unknown query parameters are ignored and out-of-range
/// `digits`/`period` values fall back to their defaults. Only a
/// missing secret or an unrecognisable URI is an error.
pub fn parse_otpauth_uri(uri: &str) -> Result<AccountDraft, OtpError> {
    let url = url::Url::parse(uri).map_err(|e| {
        OtpError::new(OtpErrorKind::InvalidUri, "Not a valid otpauth URI")
            .with_detail(e.to_string())
    })?;

    if url.scheme() != "otpauth" {
        return Err(OtpError::new(
            OtpErrorKind::InvalidUri,
            format!("Unsupported scheme '{}'", url.scheme()),
        ));
    }

    let kind = match url.host_str() {
        Some("totp") => OtpKind::Totp,
        Some("hotp") => OtpKind::Hotp,
        other => {
            return Err(OtpError::new(
                OtpErrorKind::InvalidUri,
                format!("Unknown OTP type '{}'", other.unwrap_or_default()),
            ))
        }
    };

    let (path_issuer, label) = split_label(url.path());
    let params = read_params(&url);

    let secret = params.secret.ok_or_else(|| {
        OtpError::new(OtpErrorKind::InvalidUri, "URI has no 'secret' parameter")
    })?;

    // Issuer precedence: query param, then "ISSUER:" path prefix, then
    // the bare label (the account list always needs something to show).
    let issuer = params
        .issuer
        .or(path_issuer)
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| label.clone());

    let mut draft = AccountDraft::new(issuer, secret);
    draft.kind = kind;
    draft.algorithm = params.algorithm;
    draft.digits = params.digits;
    draft.period = params.period;
    if kind == OtpKind::Hotp {
        draft.counter = params.counter;
    }
    if !label.is_empty() && label != draft.issuer {
        draft.username = Some(label);
    }

    Ok(draft)
}

/// Split "/LABEL" or "/ISSUER:LABEL" into its decoded parts.
fn split_label(path: &str) -> (Option<String>, String) {
    let raw = percent_decode(path.trim_start_matches('/'));
    match raw.split_once(':') {
        Some((issuer, label)) => (
            Some(issuer.trim().to_string()),
            label.trim().to_string(),
        ),
        None => (None, raw),
    }
}

struct UriParams {
    secret: Option<String>,
    issuer: Option<String>,
    algorithm: Algorithm,
    digits: u8,
    period: u32,
    counter: u64,
}

fn read_params(url: &url::Url) -> UriParams {
    let mut params = UriParams {
        secret: None,
        issuer: None,
        algorithm: Algorithm::Sha1,
        digits: 6,
        period: 30,
        counter: 0,
    };

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => params.secret = Some(value.into_owned()),
            "issuer" => params.issuer = Some(value.into_owned()),
            "algorithm" => {
                if let Some(algo) = Algorithm::from_str_loose(&value) {
                    params.algorithm = algo;
                }
            }
            "digits" => match value.parse::<u8>() {
                Ok(d @ 6..=8) => params.digits = d,
                _ => log::debug!("ignoring digits={}", value),
            },
            "period" => match value.parse::<u32>() {
                Ok(p) if p > 0 => params.period = p,
                _ => log::debug!("ignoring period={}", value),
            },
            "counter" => {
                if let Ok(c) = value.parse::<u64>() {
                    params.counter = c;
                }
            }
            _ => {}
        }
    }

    params
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Render a draft as an `otpauth://` URI, omitting parameters that are
/// still at their default value. Steam accounts render as plain TOTP.
pub fn build_otpauth_uri(draft: &AccountDraft) -> String {
    let kind = match draft.kind {
        OtpKind::Hotp => OtpKind::Hotp,
        _ => OtpKind::Totp,
    };

    let path = match draft.username.as_deref() {
        Some(user) if !user.is_empty() => {
            format!("{}:{}", percent_encode(&draft.issuer), percent_encode(user))
        }
        _ => percent_encode(&draft.issuer),
    };

    let secret = draft.secret.replace([' ', '-'], "").to_uppercase();

    let mut uri = format!(
        "otpauth://{}/{}?secret={}&issuer={}",
        kind,
        path,
        secret,
        percent_encode(&draft.issuer)
    );
    if draft.algorithm != Algorithm::Sha1 {
        uri.push_str("&algorithm=");
        uri.push_str(draft.algorithm.uri_name());
    }
    if draft.digits != 6 {
        uri.push_str(&format!("&digits={}", draft.digits));
    }
    if kind == OtpKind::Totp && draft.period != 30 {
        uri.push_str(&format!("&period={}", draft.period));
    }
    if kind == OtpKind::Hotp {
        uri.push_str(&format!("&counter={}", draft.counter));
    }

    uri
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Percent encoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Parsing ──────────────────────────────────────────────────

    #[test]
    fn parse_fills_defaults() {
        let draft = parse_otpauth_uri(
            "otpauth://totp/Proton:kev@proton.me?secret=JBSWY3DPEHPK3PXP&issuer=Proton",
        )
        .unwrap();
        assert_eq!(draft.issuer, "Proton");
        assert_eq!(draft.username.as_deref(), Some("kev@proton.me"));
        assert_eq!(draft.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(draft.kind, OtpKind::Totp);
        assert_eq!(
            (draft.algorithm, draft.digits, draft.period),
            (Algorithm::Sha1, 6, 30)
        );
    }

    #[test]
    fn parse_reads_explicit_params() {
        let draft = parse_otpauth_uri(
            "otpauth://totp/X?secret=AAAA&algorithm=SHA512&digits=7&period=90",
        )
        .unwrap();
        assert_eq!(draft.algorithm, Algorithm::Sha512);
        assert_eq!(draft.digits, 7);
        assert_eq!(draft.period, 90);
    }

    #[test]
    fn parse_hotp_keeps_counter() {
        let draft =
            parse_otpauth_uri("otpauth://hotp/Bank:kev?secret=JBSWY3DPEHPK3PXP&counter=17")
                .unwrap();
        assert_eq!(draft.kind, OtpKind::Hotp);
        assert_eq!(draft.counter, 17);
    }

    #[test]
    fn parse_issuer_precedence_is_param_then_path() {
        let from_param =
            parse_otpauth_uri("otpauth://totp/PathCo:kev?secret=AAAA&issuer=ParamCo").unwrap();
        assert_eq!(from_param.issuer, "ParamCo");

        let from_path = parse_otpauth_uri("otpauth://totp/PathCo:kev?secret=AAAA").unwrap();
        assert_eq!(from_path.issuer, "PathCo");
        assert_eq!(from_path.username.as_deref(), Some("kev"));
    }

    #[test]
    fn parse_bare_label_doubles_as_issuer() {
        let draft = parse_otpauth_uri("otpauth://totp/standalone?secret=AAAA").unwrap();
        assert_eq!(draft.issuer, "standalone");
        assert!(draft.username.is_none());
    }

    #[test]
    fn parse_decodes_percent_escapes() {
        let draft =
            parse_otpauth_uri("otpauth://totp/Big%20Corp:kev%40big.corp?secret=AAAA").unwrap();
        assert_eq!(draft.issuer, "Big Corp");
        assert_eq!(draft.username.as_deref(), Some("kev@big.corp"));
    }

    #[test]
    fn parse_ignores_junk_params_and_bad_ranges() {
        let draft = parse_otpauth_uri(
            "otpauth://totp/X?secret=AAAA&digits=99&period=0&image=foo&color=red",
        )
        .unwrap();
        assert_eq!(draft.digits, 6);
        assert_eq!(draft.period, 30);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse_otpauth_uri("totally not a uri").is_err());
        assert!(parse_otpauth_uri("https://example.com/x?secret=AAAA").is_err());
        assert!(parse_otpauth_uri("otpauth://motp/X?secret=AAAA").is_err());
        // secret is the one mandatory parameter
        let err = parse_otpauth_uri("otpauth://totp/X?issuer=X").unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::InvalidUri);
    }

    // ── Building ─────────────────────────────────────────────────

    #[test]
    fn build_minimal_uri_omits_defaults() {
        let draft = AccountDraft::new("Kevlify", "jbswy3dp ehpk3pxp");
        let uri = build_otpauth_uri(&draft);
        assert_eq!(
            uri,
            "otpauth://totp/Kevlify?secret=JBSWY3DPEHPK3PXP&issuer=Kevlify"
        );
    }

    #[test]
    fn build_includes_non_default_params() {
        let mut draft = AccountDraft::new("Acme", "AAAA");
        draft.username = Some("kev".into());
        draft.algorithm = Algorithm::Sha256;
        draft.digits = 8;
        draft.period = 60;
        let uri = build_otpauth_uri(&draft);
        assert!(uri.starts_with("otpauth://totp/Acme:kev?"));
        assert!(uri.contains("&algorithm=SHA256"));
        assert!(uri.contains("&digits=8"));
        assert!(uri.contains("&period=60"));
    }

    #[test]
    fn build_hotp_always_carries_counter() {
        let mut draft = AccountDraft::new("Bank", "AAAA");
        draft.kind = OtpKind::Hotp;
        let uri = build_otpauth_uri(&draft);
        assert!(uri.starts_with("otpauth://hotp/"));
        assert!(uri.ends_with("&counter=0"));
    }

    #[test]
    fn build_steam_renders_as_totp() {
        let mut draft = AccountDraft::new("Steam", "AAAA");
        draft.kind = OtpKind::Steam;
        assert!(build_otpauth_uri(&draft).starts_with("otpauth://totp/"));
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let mut draft = AccountDraft::new("Big Corp", "JBSWY3DPEHPK3PXP");
        draft.username = Some("kev@big.corp".into());
        draft.algorithm = Algorithm::Sha256;
        draft.digits = 8;

        let reparsed = parse_otpauth_uri(&build_otpauth_uri(&draft)).unwrap();
        assert_eq!(reparsed.issuer, draft.issuer);
        assert_eq!(reparsed.username, draft.username);
        assert_eq!(reparsed.algorithm, draft.algorithm);
        assert_eq!(reparsed.digits, draft.digits);
        assert_eq!(reparsed.secret, draft.secret);
    }

    // ── Percent helpers ──────────────────────────────────────────

    #[test]
    fn percent_encode_escapes_reserved() {
        assert_eq!(percent_encode("plain-text_1.0~"), "plain-text_1.0~");
        assert_eq!(percent_encode("a b@c"), "a%20b%40c");
    }

    #[test]
    fn percent_decode_handles_escapes_and_garbage() {
        assert_eq!(percent_decode("a%20b%40c"), "a b@c");
        assert_eq!(percent_decode("1+2"), "1 2");
        // A dangling or malformed escape passes through literally.
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn percent_decode_multibyte_utf8() {
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }
}
