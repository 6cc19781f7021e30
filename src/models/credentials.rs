//! Credential bundle for cookie-authenticated sites.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Cookies plus the page-embedded verification token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub cookies: BTreeMap<String, String>,
    pub requestverificationtoken: String,
}

impl Credentials {
    /// Load the bundle from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        let credentials: Self = serde_json::from_str(&content).map_err(|e| {
            AppError::credentials(format!("malformed {}: {e}", path.display()))
        })?;

        if credentials.requestverificationtoken.trim().is_empty() {
            return Err(AppError::credentials(format!(
                "{} has an empty requestverificationtoken",
                path.display()
            )));
        }
        Ok(credentials)
    }

    /// Value for the `cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cookie_header_joins_pairs() {
        let credentials = Credentials {
            cookies: BTreeMap::from([
                ("ASP.NET_SessionId".to_string(), "abc".to_string()),
                ("__RequestVerificationToken".to_string(), "xyz".to_string()),
            ]),
            requestverificationtoken: "token".to_string(),
        };
        assert_eq!(
            credentials.cookie_header(),
            "ASP.NET_SessionId=abc; __RequestVerificationToken=xyz"
        );
    }

    #[test]
    fn load_reads_json_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cookies.json");
        std::fs::write(
            &path,
            r#"{"cookies": {"a": "1"}, "requestverificationtoken": "tok"}"#,
        )
        .unwrap();

        let credentials = Credentials::load(&path).unwrap();
        assert_eq!(credentials.requestverificationtoken, "tok");
        assert_eq!(credentials.cookie_header(), "a=1");
    }

    #[test]
    fn load_missing_file_is_credentials_error() {
        let tmp = TempDir::new().unwrap();
        let err = Credentials::load(tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, AppError::Credentials(_)));
    }

    #[test]
    fn load_rejects_missing_token() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cookies.json");
        std::fs::write(&path, r#"{"cookies": {}}"#).unwrap();
        assert!(matches!(
            Credentials::load(&path),
            Err(AppError::Credentials(_))
        ));

        std::fs::write(&path, r#"{"cookies": {}, "requestverificationtoken": " "}"#).unwrap();
        assert!(matches!(
            Credentials::load(&path),
            Err(AppError::Credentials(_))
        ));
    }
}
