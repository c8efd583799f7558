use crate::config::CredentialsConfig;
use crate::errors::ProxyError;
use std::collections::HashMap;
use std::env::VarError;
use std::fmt;

/// Vendor key identifier and shared secret for one resource.
#[derive(Clone)]
pub struct Credentials {
    key_id: String,
    secret: Vec<u8>,
}

impl Credentials {
    pub fn new(key_id: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            key_id: key_id.into(),
            secret,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Where credential values are looked up by variable name.
pub trait SecretSource: Send + Sync {
    fn get(&self, name: &str) -> Result<String, VarError>;
}

/// Reads the process environment on every lookup, so a restarted deployment
/// with new variables needs no code path of its own.
pub struct ProcessEnv;

impl SecretSource for ProcessEnv {
    fn get(&self, name: &str) -> Result<String, VarError> {
        std::env::var(name)
    }
}

impl SecretSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Result<String, VarError> {
        HashMap::get(self, name).cloned().ok_or(VarError::NotPresent)
    }
}

impl CredentialsConfig {
    /// Loads the key and secret, failing closed if either is unset or empty.
    ///
    /// A key identifier that cannot be carried in an HTTP header is rejected
    /// here too, since it would otherwise only surface as a transport error.
    pub fn load(&self, source: &dyn SecretSource) -> Result<Credentials, ProxyError> {
        let key_id = lookup(source, &self.key_env)?;
        let secret = lookup(source, &self.secret_env)?;

        if key_id.is_empty() || secret.is_empty() {
            return Err(ProxyError::Configuration(format!(
                "Missing {} or {} in environment variables",
                self.key_env, self.secret_env
            )));
        }

        if http::HeaderValue::from_str(&key_id).is_err() {
            return Err(ProxyError::Configuration(format!(
                "{} is not a valid header value",
                self.key_env
            )));
        }

        Ok(Credentials::new(key_id, secret.into_bytes()))
    }
}

/// An unset variable reads as empty; a set but non-UTF-8 one is an error of its own.
fn lookup(source: &dyn SecretSource, name: &str) -> Result<String, ProxyError> {
    match source.get(name) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Ok(String::new()),
        Err(VarError::NotUnicode(_)) => Err(ProxyError::Configuration(format!(
            "{name} is not valid UTF-8"
        ))),
    }
}
