//! Answers to RTSP `WWW-Authenticate` challenges.
//!
//! Cameras ask for either Basic or Digest (RFC 2617, MD5) credentials on
//! `DESCRIBE`. Digest is preferred when a camera offers both.

use base64::Engine;
use md5::{Digest, Md5};

/// A parsed authentication challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Challenge {
    Basic,
    Digest {
        realm: String,
        nonce: String,
        /// Set when the camera offers `qop="auth"`
        qop_auth: bool,
        opaque: Option<String>,
    },
}

impl Challenge {
    /// Parse one `WWW-Authenticate` value. Unknown schemes yield `None`.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Some(Self::Basic);
        }
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let params = parse_params(rest);
        let param = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        Some(Self::Digest {
            realm: param("realm").unwrap_or_default(),
            nonce: param("nonce")?,
            qop_auth: param("qop")
                .is_some_and(|qop| qop.split(',').any(|q| q.trim() == "auth")),
            opaque: param("opaque"),
        })
    }

    /// Pick the strongest challenge among several header values.
    pub fn select<'a>(headers: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut basic = None;
        for header in headers {
            match Self::parse(header) {
                Some(digest @ Self::Digest { .. }) => return Some(digest),
                Some(Self::Basic) => basic = Some(Self::Basic),
                None => {}
            }
        }
        basic
    }

    /// Build the `Authorization` header value for `method` on `uri`.
    pub fn authorization(&self, username: &str, password: &str, method: &str, uri: &str) -> String {
        let cnonce = uuid::Uuid::new_v4().simple().to_string();
        self.authorization_with_cnonce(username, password, method, uri, &cnonce[..16])
    }

    fn authorization_with_cnonce(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        match self {
            Self::Basic => {
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                format!("Basic {}", token)
            }
            Self::Digest {
                realm,
                nonce,
                qop_auth,
                opaque,
            } => {
                let ha1 = md5_hex(&format!("{}:{}:{}", username, realm, password));
                let ha2 = md5_hex(&format!("{}:{}", method, uri));

                let mut header = format!(
                    "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\"",
                    username, realm, nonce, uri
                );
                if *qop_auth {
                    let nc = "00000001";
                    let response =
                        md5_hex(&format!("{}:{}:{}:{}:auth:{}", ha1, nonce, nc, cnonce, ha2));
                    header.push_str(&format!(
                        ", response=\"{}\", qop=auth, nc={}, cnonce=\"{}\"",
                        response, nc, cnonce
                    ));
                } else {
                    let response = md5_hex(&format!("{}:{}:{}", ha1, nonce, ha2));
                    header.push_str(&format!(", response=\"{}\"", response));
                }
                if let Some(opaque) = opaque {
                    header.push_str(&format!(", opaque=\"{}\"", opaque));
                }
                header
            }
        }
    }
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split `key=value, key="quoted, value"` pairs. Keys are lowercased.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = input.trim();

    while let Some((key, after)) = rest.split_once('=') {
        let after = after.trim_start();
        let (value, tail) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(',') {
                Some(end) => (after[..end].trim_end(), &after[end..]),
                None => (after.trim_end(), ""),
            },
        };

        params.push((key.trim().to_ascii_lowercase(), value.to_string()));
        rest = tail.trim_start().trim_start_matches(',').trim_start();
    }

    params
}
