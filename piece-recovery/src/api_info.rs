use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;

pub const API_INFO_VAR: &str = "MINER_API_INFO";

const RPC_PATH: &str = "rpc/v0";

/// Where the storage node's API listens and the token to call it with.
///
/// Parsed from `token:/ip4/<host>/tcp/<port>/http`, `token:/dns/<host>/tcp/<port>/http`
/// or `token:http://<host>:<port>`; the token part may be empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiInfo {
    pub token: Option<String>,
    pub url: Url,
}

impl ApiInfo {
    pub fn from_env() -> Result<Self> {
        let value = std::env::var(API_INFO_VAR)
            .with_context(|| format!("{} is not set; pass --api instead", API_INFO_VAR))?;
        value.parse()
    }
}

impl FromStr for ApiInfo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (token, addr) = match s.find(':') {
            Some(i) if !s[..i].contains('/') && !s[i + 1..].starts_with("//") => {
                (&s[..i], &s[i + 1..])
            }
            _ => ("", s),
        };
        let token = Some(token.to_string()).filter(|t| !t.is_empty());

        let base = if addr.starts_with("http://") || addr.starts_with("https://") {
            Url::parse(addr).with_context(|| format!("invalid api url {:?}", addr))?
        } else {
            multiaddr_to_url(addr)?
        };
        let url = if base.path().trim_matches('/').is_empty() {
            base.join(RPC_PATH)?
        } else {
            base
        };

        Ok(ApiInfo { token, url })
    }
}

impl fmt::Debug for ApiInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiInfo")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url.as_str())
            .finish()
    }
}

fn multiaddr_to_url(addr: &str) -> Result<Url> {
    let parts: Vec<&str> = addr.trim_start_matches('/').split('/').collect();
    let (host, port, scheme) = match parts.as_slice() {
        ["ip4", host, "tcp", port, scheme] | ["dns", host, "tcp", port, scheme] => {
            (host.to_string(), *port, *scheme)
        }
        ["dns4", host, "tcp", port, scheme] => (host.to_string(), *port, *scheme),
        ["ip6", host, "tcp", port, scheme] => (format!("[{}]", host), *port, *scheme),
        _ => bail!("unsupported api address {:?}", addr),
    };
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow!("invalid port in api address {:?}", addr))?;

    match scheme {
        "http" | "https" | "ws" | "wss" => {}
        other => bail!("unsupported api protocol {:?}", other),
    }
    let scheme = match scheme {
        "ws" => "http",
        "wss" => "https",
        s => s,
    };

    Url::parse(&format!("{}://{}:{}/", scheme, host, port))
        .with_context(|| format!("invalid api address {:?}", addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parses_multiaddr_form() {
        let info: ApiInfo = "eyJhbGciOi.token:/ip4/127.0.0.1/tcp/2345/http"
            .parse()
            .expect("valid api info");
        assert_eq!(info.token.as_deref(), Some("eyJhbGciOi.token"));
        assert_eq!(info.url.as_str(), "http://127.0.0.1:2345/rpc/v0");

        let info: ApiInfo = "/dns/miner.local/tcp/1234/ws".parse().expect("no token");
        assert_eq!(info.token, None);
        assert_eq!(info.url.as_str(), "http://miner.local:1234/rpc/v0");
    }

    #[test]
    fn parses_url_form() {
        let info: ApiInfo = "tok:http://127.0.0.1:8080".parse().expect("valid api info");
        assert_eq!(info.token.as_deref(), Some("tok"));
        assert_eq!(info.url.as_str(), "http://127.0.0.1:8080/rpc/v0");

        let info: ApiInfo = "http://127.0.0.1:8080/rpc/v1".parse().expect("valid api info");
        assert_eq!(info.token, None);
        assert_eq!(info.url.as_str(), "http://127.0.0.1:8080/rpc/v1");
    }

    #[test]
    fn rejects_garbage() {
        assert!("tok:/ip4/127.0.0.1/udp/2345/http".parse::<ApiInfo>().is_err());
        assert!("tok:/ip4/127.0.0.1/tcp/notaport/http".parse::<ApiInfo>().is_err());
        assert!("tok:/ip4/127.0.0.1/tcp/2345/quic".parse::<ApiInfo>().is_err());
    }

    #[test]
    fn debug_hides_the_token() {
        let info: ApiInfo = "secret:/ip4/127.0.0.1/tcp/2345/http".parse().expect("valid");
        assert!(!format!("{:?}", info).contains("secret"));
    }
}
