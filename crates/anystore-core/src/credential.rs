//! Credential and endpoint values.
//!
//! Both arrive as plain strings through the `credential` and `endpoint`
//! construction pairs and are parsed once when a backend is built.
//!
//! | Credential | Meaning |
//! |------------|---------|
//! | `hmac:<access_key>:<secret_key>` | Key pair for request signing |
//! | `basic:<user>:<password>` | Username and password |
//! | `api_key:<key>` | Single API key |
//! | `token:<token>` | Bearer token |
//! | `env` | Resolve from the environment |
//! | `file:<path>` | Load from a file |
//!
//! Endpoints are `<protocol>:<host>[:<port>]` with protocol `http`, `https`
//! or `tcp`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, StorageError};

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Parsed `credential` pair.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Access key pair.
    Hmac {
        /// Access key id.
        access_key: String,
        /// Secret access key.
        secret_key: String,
    },
    /// Username and password.
    Basic {
        /// Username.
        user: String,
        /// Password.
        password: String,
    },
    /// API key.
    ApiKey(String),
    /// Bearer token.
    Token(String),
    /// Resolve from the environment.
    Env,
    /// Load from a file.
    File(PathBuf),
}

impl Credential {
    /// Protocol name of this credential.
    #[must_use]
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Hmac { .. } => "hmac",
            Self::Basic { .. } => "basic",
            Self::ApiKey(_) => "api_key",
            Self::Token(_) => "token",
            Self::Env => "env",
            Self::File(_) => "file",
        }
    }

    /// Access key pair, when this is an `hmac` credential.
    #[must_use]
    pub fn hmac(&self) -> Option<(&str, &str)> {
        match self {
            Self::Hmac {
                access_key,
                secret_key,
            } => Some((access_key.as_str(), secret_key.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hmac { access_key, .. } => write!(f, "hmac:{access_key}:<redacted>"),
            Self::Basic { user, .. } => write!(f, "basic:{user}:<redacted>"),
            Self::ApiKey(_) | Self::Token(_) => write!(f, "{}:<redacted>", self.protocol()),
            Self::Env => f.write_str("env"),
            Self::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

impl FromStr for Credential {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        let (protocol, rest) = s.split_once(':').unwrap_or((s, ""));
        let invalid = |why: &str| {
            StorageError::invalid_argument(format!("invalid {protocol} credential: {why}"))
        };
        match protocol {
            "hmac" => {
                let (access_key, secret_key) = rest
                    .split_once(':')
                    .ok_or_else(|| invalid("expected hmac:<access_key>:<secret_key>"))?;
                if access_key.is_empty() || secret_key.is_empty() {
                    return Err(invalid("access key and secret key must not be empty"));
                }
                Ok(Self::Hmac {
                    access_key: access_key.to_owned(),
                    secret_key: secret_key.to_owned(),
                })
            }
            "basic" => {
                let (user, password) = rest
                    .split_once(':')
                    .ok_or_else(|| invalid("expected basic:<user>:<password>"))?;
                if user.is_empty() {
                    return Err(invalid("user must not be empty"));
                }
                Ok(Self::Basic {
                    user: user.to_owned(),
                    password: password.to_owned(),
                })
            }
            "api_key" | "token" | "file" if rest.is_empty() => Err(invalid("missing value")),
            "api_key" => Ok(Self::ApiKey(rest.to_owned())),
            "token" => Ok(Self::Token(rest.to_owned())),
            "file" => Ok(Self::File(PathBuf::from(rest))),
            "env" if rest.is_empty() => Ok(Self::Env),
            "env" => Err(invalid("env takes no value")),
            other => Err(StorageError::invalid_argument(format!(
                "unsupported credential protocol: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Transport of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
    /// Raw TCP, for non-HTTP services.
    Tcp,
}

impl Protocol {
    /// Protocol name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Tcp => "tcp",
        }
    }

    fn default_port(self) -> Option<u16> {
        match self {
            Self::Http => Some(80),
            Self::Https => Some(443),
            Self::Tcp => None,
        }
    }
}

/// Parsed `endpoint` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Transport.
    pub protocol: Protocol,
    /// Host name or address.
    pub host: String,
    /// Port, defaulted from the protocol when omitted.
    pub port: u16,
}

impl Endpoint {
    /// `host:port`, omitting the port when it is the protocol default.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.protocol.default_port() == Some(self.port) {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// URL form, e.g. `https://example.com:9000`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}", self.protocol.as_str(), self.authority())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.protocol.as_str(), self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| StorageError::invalid_argument(format!("invalid endpoint {s}: {why}"));
        let (protocol, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <protocol>:<host>[:<port>]"))?;
        let protocol = match protocol {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            "tcp" => Protocol::Tcp,
            _ => return Err(invalid("unsupported protocol")),
        };
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;
                (host, Some(port))
            }
            None => (rest, None),
        };
        if host.is_empty() || host.contains('/') {
            return Err(invalid("host must be a bare host name"));
        }
        let port = port
            .or_else(|| protocol.default_port())
            .ok_or_else(|| invalid("tcp endpoints require a port"))?;
        Ok(Self {
            protocol,
            host: host.to_owned(),
            port,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
