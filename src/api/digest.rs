//! HTTP Digest access authentication (RFC 2617, MD5).

use crate::prelude::*;

const NONCE_COUNT: &str = "00000001";

/// Parsed `WWW-Authenticate: Digest …` challenge.
#[derive(Debug)]
pub struct Challenge {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    uses_auth_qop: bool,
}

impl Challenge {
    pub fn parse(header: &str) -> Result<Self> {
        let parameters = header
            .trim_start()
            .strip_prefix("Digest ")
            .with_context(|| format!("not a Digest challenge: `{header}`"))?;

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop = None;
        for parameter in split_quoted(parameters) {
            let Some((name, value)) = parameter.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_owned();
            match name.trim() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop = Some(value),
                _ => {}
            }
        }

        let uses_auth_qop = match qop {
            Some(qop) => {
                ensure!(
                    qop.split(',').map(str::trim).any(|directive| directive == "auth"),
                    "unsupported qop `{qop}`"
                );
                true
            }
            None => false,
        };
        Ok(Self {
            realm: realm.context("the challenge is missing `realm`")?,
            nonce: nonce.context("the challenge is missing `nonce`")?,
            opaque,
            uses_auth_qop,
        })
    }

    /// Build the `Authorization` header value answering this challenge.
    #[must_use]
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let ha1 = md5_hex(&format!("{username}:{}:{password}", self.realm));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let response = if self.uses_auth_qop {
            md5_hex(&format!("{ha1}:{}:{NONCE_COUNT}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            r#"Digest username="{username}", realm="{}", nonce="{}", uri="{uri}""#,
            self.realm, self.nonce,
        );
        if self.uses_auth_qop {
            header.push_str(&format!(r#", qop=auth, nc={NONCE_COUNT}, cnonce="{cnonce}""#));
        }
        header.push_str(&format!(r#", response="{response}""#));
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        header
    }
}

/// Fresh client nonce.
#[must_use]
pub fn cnonce() -> String {
    let nanoseconds = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{:x}", md5::compute(nanoseconds.to_le_bytes()))
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// Split on commas outside quoted strings (`qop="auth,auth-int"` stays whole).
fn split_quoted(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (index, character) in input.char_indices() {
        match character {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}
