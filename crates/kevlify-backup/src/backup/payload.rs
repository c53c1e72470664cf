//! Plaintext backup payload.
//!
//! Wire-faithful camelCase JSON: `version`, `exportedAt`,
//! `authenticators[]` (with `secretEncrypted`, numeric `type` and
//! `algorithm` codes, `categoryId`) and `categories[]`. Import is
//! lenient: optional fields default instead of failing the whole file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kevlify_otp::otp::{Account, AccountDraft, Algorithm, Category, OtpKind};

/// Payload format version written on export.
pub const PAYLOAD_VERSION: &str = "1.0";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Payload document
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A full account backup: every authenticator and category, plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
    pub authenticators: Vec<BackupAuthenticator>,
    #[serde(default)]
    pub categories: Vec<BackupCategory>,
}

fn default_version() -> String {
    PAYLOAD_VERSION.to_string()
}

impl BackupPayload {
    /// Payload stamped with the current version and export time.
    pub fn new(authenticators: Vec<BackupAuthenticator>, categories: Vec<BackupCategory>) -> Self {
        Self {
            version: PAYLOAD_VERSION.to_string(),
            exported_at: Utc::now(),
            authenticators,
            categories,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Authenticator entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One account as it appears inside a backup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupAuthenticator {
    #[serde(rename = "type", default)]
    pub kind: OtpKind,
    #[serde(default)]
    pub icon: Option<String>,
    pub issuer: String,
    #[serde(default)]
    pub username: Option<String>,
    pub secret_encrypted: String,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default = "default_digits")]
    pub digits: u8,
    #[serde(default = "default_period")]
    pub period: u32,
    #[serde(default)]
    pub counter: u64,
    #[serde(default)]
    pub ranking: i32,
    #[serde(default)]
    pub category_id: Option<String>,
}

fn default_digits() -> u8 {
    6
}

fn default_period() -> u32 {
    30
}

impl BackupAuthenticator {
    /// Snapshot an account record into its backup representation.
    pub fn from_account(account: &Account) -> Self {
        Self {
            kind: account.kind,
            icon: account.icon.clone(),
            issuer: account.issuer.clone(),
            username: account.username.clone(),
            secret_encrypted: account.secret.clone(),
            algorithm: account.algorithm,
            digits: account.digits,
            period: account.period,
            counter: account.counter,
            ranking: account.ranking,
            category_id: account.category_id.clone(),
        }
    }

    /// Draft for re-creating this entry through the accounts API.
    pub fn to_draft(&self) -> AccountDraft {
        let mut draft = AccountDraft::new(self.issuer.clone(), self.secret_encrypted.clone());
        draft.kind = self.kind;
        draft.icon = self.icon.clone();
        draft.username = self.username.clone();
        draft.algorithm = self.algorithm;
        draft.digits = self.digits;
        draft.period = self.period;
        draft.counter = self.counter;
        draft.category_id = self.category_id.clone();
        draft
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Category entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One category as it appears inside a backup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ranking: i32,
}

impl BackupCategory {
    pub fn from_category(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            ranking: category.ranking,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  File naming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Suggested filename for a plaintext backup export.
pub fn plain_backup_filename() -> String {
    format!("kevlify-backup-{}.json", Utc::now().timestamp_millis())
}

/// Suggested filename for an encrypted backup export.
pub fn encrypted_backup_filename() -> String {
    format!("kevlify-backup-{}.authpro", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> BackupPayload {
        let auth = BackupAuthenticator {
            kind: OtpKind::Totp,
            icon: None,
            issuer: "GitHub".into(),
            username: Some("alice".into()),
            secret_encrypted: "JBSWY3DPEHPK3PXP".into(),
            algorithm: Algorithm::Sha1,
            digits: 6,
            period: 30,
            counter: 0,
            ranking: 0,
            category_id: Some("cat-1".into()),
        };
        let cat = BackupCategory {
            id: "cat-1".into(),
            name: "Work".into(),
            ranking: 0,
        };
        BackupPayload::new(vec![auth], vec![cat])
    }

    // ── Wire shape ───────────────────────────────────────────────

    #[test]
    fn serialises_camel_case() {
        let json = serde_json::to_value(sample_payload()).unwrap();
        assert_eq!(json["version"], "1.0");
        assert!(json.get("exportedAt").is_some());
        let auth = &json["authenticators"][0];
        assert_eq!(auth["type"], 2);
        assert_eq!(auth["algorithm"], 0);
        assert_eq!(auth["secretEncrypted"], "JBSWY3DPEHPK3PXP");
        assert_eq!(auth["categoryId"], "cat-1");
        assert_eq!(json["categories"][0]["name"], "Work");
    }

    #[test]
    fn deserialises_minimal_entry() {
        // Only issuer + secret; everything else defaults.
        let json = r#"{
            "authenticators": [
                { "issuer": "Acme", "secretEncrypted": "ABCDEF" }
            ]
        }"#;
        let payload: BackupPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.version, "1.0");
        let auth = &payload.authenticators[0];
        assert_eq!(auth.kind, OtpKind::Totp);
        assert_eq!(auth.digits, 6);
        assert_eq!(auth.period, 30);
        assert!(payload.categories.is_empty());
    }

    #[test]
    fn roundtrips_through_json() {
        let payload = sample_payload();
        let json = serde_json::to_string(&payload).unwrap();
        let back: BackupPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.authenticators.len(), 1);
        assert_eq!(back.authenticators[0].issuer, "GitHub");
        assert_eq!(back.categories[0].id, "cat-1");
    }

    // ── Account conversions ──────────────────────────────────────

    #[test]
    fn account_snapshot_and_back() {
        let account = Account::new("GitHub", "JBSWY3DPEHPK3PXP")
            .with_username("alice")
            .with_digits(8)
            .with_category("cat-9");
        let entry = BackupAuthenticator::from_account(&account);
        assert_eq!(entry.issuer, "GitHub");
        assert_eq!(entry.digits, 8);

        let draft = entry.to_draft();
        assert_eq!(draft.issuer, "GitHub");
        assert_eq!(draft.username.as_deref(), Some("alice"));
        assert_eq!(draft.digits, 8);
        assert_eq!(draft.category_id.as_deref(), Some("cat-9"));
    }

    // ── Filenames ────────────────────────────────────────────────

    #[test]
    fn filenames_carry_extension() {
        assert!(plain_backup_filename().starts_with("kevlify-backup-"));
        assert!(plain_backup_filename().ends_with(".json"));
        assert!(encrypted_backup_filename().ends_with(".authpro"));
    }
}
