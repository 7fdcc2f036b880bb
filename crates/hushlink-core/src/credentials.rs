//! Credential lookup and provisioning.
//!
//! The server never sees passwords. A [`CredentialRecord`] holds the salt and
//! the two keys the SCRAM exchange needs; records are provisioned offline
//! with [`CredentialRecord::provision`] and served by a [`CredentialStore`].
//!
//! ## Record file
//!
//! ```text
//! user,salt,saltedPassword,storedKey,servKey
//! alice,<hex>,<hex>,<hex 32B>,<hex 32B>
//! ```
//!
//! Standard CSV: fields holding a comma, quote or line break are quoted, and
//! nothing is trimmed. The `saltedPassword` column is written for
//! compatibility with existing record files and never read back.

use crate::MAX_USERNAME_LEN;
use crate::error::CredentialError;
use hushlink_crypto::scram::{self, KEY_SIZE, KdfParams, SaltedPassword, ScramKeys};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Column names of a record file, in order.
pub const RECORD_COLUMNS: [&str; 5] = ["user", "salt", "saltedPassword", "storedKey", "servKey"];

/// One row of a record file, hex fields still encoded.
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    user: String,
    salt: String,
    #[serde(rename = "saltedPassword")]
    salted_password: String,
    #[serde(rename = "storedKey")]
    stored_key: String,
    #[serde(rename = "servKey")]
    serv_key: String,
}

impl RecordRow {
    fn encode(username: &str, provisioned: &ProvisionedRecord) -> Self {
        Self {
            user: username.to_owned(),
            salt: hex::encode(&provisioned.record.salt),
            salted_password: hex::encode(provisioned.salted_password.as_bytes()),
            stored_key: hex::encode(provisioned.record.stored_key),
            serv_key: hex::encode(provisioned.record.server_key),
        }
    }

    fn decode(self, line: usize) -> Result<(String, CredentialRecord), CredentialError> {
        if self.user.is_empty() || self.user.len() > MAX_USERNAME_LEN {
            return Err(malformed(line, "user: must be 1..=255 bytes"));
        }

        let salt = hex::decode(&self.salt).map_err(|e| malformed(line, format!("salt: {e}")))?;
        if salt.len() < scram::MIN_SALT_LEN {
            return Err(malformed(
                line,
                format!(
                    "salt: expected at least {} bytes, got {}",
                    scram::MIN_SALT_LEN,
                    salt.len()
                ),
            ));
        }
        // The salted password column only has to be well-formed.
        hex::decode(&self.salted_password)
            .map_err(|e| malformed(line, format!("saltedPassword: {e}")))?;

        let record = CredentialRecord {
            salt,
            stored_key: decode_key(&self.stored_key, "storedKey", line)?,
            server_key: decode_key(&self.serv_key, "servKey", line)?,
        };
        Ok((self.user, record))
    }
}

/// What the server stores for one user.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CredentialRecord {
    /// Argon2 salt
    pub salt: Vec<u8>,
    /// `SHA-256(client_key)`
    pub stored_key: [u8; KEY_SIZE],
    /// `HMAC(salted_password, "Server Key")`
    pub server_key: [u8; KEY_SIZE],
}

impl CredentialRecord {
    /// Derive a record from a password.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Provision`] for an empty password or salt,
    /// a salt shorter than 8 bytes, or invalid KDF parameters.
    pub fn provision(
        password: &[u8],
        salt: &[u8],
        params: &KdfParams,
    ) -> Result<ProvisionedRecord, CredentialError> {
        let salted_password = scram::salt_password(password, salt, params)?;
        let keys = ScramKeys::derive(&salted_password)?;
        Ok(ProvisionedRecord {
            record: Self {
                salt: salt.to_vec(),
                stored_key: keys.stored_key,
                server_key: keys.server_key,
            },
            salted_password,
        })
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("salt_len", &self.salt.len())
            .finish_non_exhaustive()
    }
}

/// A freshly provisioned record plus the salted password for the file.
pub struct ProvisionedRecord {
    /// The record the server serves
    pub record: CredentialRecord,
    /// Argon2 output, only kept for the record file column
    pub salted_password: SaltedPassword,
}

/// Read-only credential lookup.
///
/// Shared across connections as `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    /// Look up the record for `username`.
    fn lookup(&self, username: &str) -> Option<CredentialRecord>;
}

/// In-memory credential store.
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user's record.
    pub fn insert(&mut self, username: impl Into<String>, record: CredentialRecord) {
        self.records.insert(username.into(), record);
    }

    /// Builder-style [`MemoryCredentialStore::insert`].
    #[must_use]
    pub fn with_record(mut self, username: impl Into<String>, record: CredentialRecord) -> Self {
        self.insert(username, record);
        self
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no users are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, username: &str) -> Option<CredentialRecord> {
        self.records.get(username).cloned()
    }
}

/// Credential store loaded once from a record file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    inner: MemoryCredentialStore,
}

impl FileCredentialStore {
    /// Load a record file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Io`] if the file cannot be read, or a
    /// parse error for a bad header, malformed row or duplicate user.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path).map_err(|source| CredentialError::Io {
            path: path.clone(),
            source,
        })?;
        let inner = Self::parse(&content)?;

        tracing::info!(
            "Loaded {} credential record(s) from {}",
            inner.len(),
            path.display()
        );
        Ok(Self { path, inner })
    }

    /// Parse record file content.
    ///
    /// # Errors
    ///
    /// See [`FileCredentialStore::open`].
    pub fn parse(content: &str) -> Result<MemoryCredentialStore, CredentialError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers().map_err(|e| csv_malformed(&e))?.clone();
        if headers.is_empty() {
            return Err(CredentialError::MissingHeader);
        }
        if !headers.iter().eq(RECORD_COLUMNS) {
            return Err(CredentialError::BadHeader(headers.iter().collect::<Vec<_>>().join(",")));
        }

        let mut store = MemoryCredentialStore::new();
        for result in reader.records() {
            let record = result.map_err(|e| csv_malformed(&e))?;
            let line = record.position().map_or(0, |pos| pos.line() as usize);
            if record.len() != RECORD_COLUMNS.len() {
                return Err(malformed(
                    line,
                    format!(
                        "expected {} fields, got {}",
                        RECORD_COLUMNS.len(),
                        record.len()
                    ),
                ));
            }

            let row: RecordRow = record
                .deserialize(Some(&headers))
                .map_err(|e| malformed(line, e.to_string()))?;
            let (username, record) = row.decode(line)?;
            if store.records.contains_key(&username) {
                return Err(CredentialError::DuplicateUser { line, username });
            }
            store.insert(username, record);
        }
        Ok(store)
    }

    /// Path the records were loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if the file held no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CredentialStore for FileCredentialStore {
    fn lookup(&self, username: &str) -> Option<CredentialRecord> {
        self.inner.lookup(username)
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> CredentialError {
    CredentialError::Malformed {
        line,
        reason: reason.into(),
    }
}

fn decode_key(field: &str, column: &str, line: usize) -> Result<[u8; KEY_SIZE], CredentialError> {
    let bytes = hex::decode(field).map_err(|e| malformed(line, format!("{column}: {e}")))?;
    <[u8; KEY_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        malformed(
            line,
            format!("{column}: expected {KEY_SIZE} bytes, got {}", bytes.len()),
        )
    })
}

fn csv_malformed(error: &csv::Error) -> CredentialError {
    let line = error.position().map_or(0, |pos| pos.line() as usize);
    malformed(line, error.to_string())
}

fn check_storable_username(username: &str) -> Result<(), CredentialError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(CredentialError::InvalidUsername(
            "must be 1..=255 bytes".into(),
        ));
    }
    Ok(())
}

/// Encode rows, with the header line first when `header` is set.
fn encode_rows(
    header: bool,
    rows: &[(&str, &ProvisionedRecord)],
) -> Result<Vec<u8>, CredentialError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if header {
        writer.write_record(RECORD_COLUMNS)?;
    }
    for (username, provisioned) in rows {
        check_storable_username(username)?;
        writer.serialize(RecordRow::encode(username, provisioned))?;
    }
    writer
        .into_inner()
        .map_err(|e| CredentialError::Csv(e.into_error().into()))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CredentialError + '_ {
    move |source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Create (or truncate) a record file holding `records`.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidUsername`] for a name that cannot be
/// stored, or [`CredentialError::Io`] if writing fails.
pub fn write_record_file(
    path: impl AsRef<Path>,
    records: &[(&str, &ProvisionedRecord)],
) -> Result<(), CredentialError> {
    let path = path.as_ref();
    let content = encode_rows(true, records)?;
    fs::write(path, content).map_err(io_error(path))
}

/// Append one record, writing the header first if the file is new or empty.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidUsername`] for a name that cannot be
/// stored, [`CredentialError::DuplicateUser`] if the user already exists, or
/// a load error if the existing file is malformed.
pub fn append_record(
    path: impl AsRef<Path>,
    username: &str,
    provisioned: &ProvisionedRecord,
) -> Result<(), CredentialError> {
    let path = path.as_ref();
    check_storable_username(username)?;

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(io_error(path)(e)),
    };

    let mut out = Vec::new();
    let fresh = existing.trim().is_empty();
    if !fresh {
        let store = FileCredentialStore::parse(&existing)?;
        if store.lookup(username).is_some() {
            return Err(CredentialError::DuplicateUser {
                line: existing.lines().count() + 1,
                username: username.to_owned(),
            });
        }
        if !existing.ends_with('\n') {
            out.push(b'\n');
        }
    }
    out.extend(encode_rows(fresh, &[(username, provisioned)])?);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;
    file.write_all(&out).map_err(io_error(path))?;

    tracing::info!("Added credential record for {} to {}", username, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushlink_crypto::CryptoError;
    use tempfile::TempDir;

    const HEADER: &str = "user,salt,saltedPassword,storedKey,servKey";

    fn provisioned(password: &[u8]) -> ProvisionedRecord {
        CredentialRecord::provision(password, &[0u8; 32], &KdfParams::low_cost()).unwrap()
    }

    #[test]
    fn test_alice_record_known_answer() {
        let alice = provisioned(b"alicespass");

        assert_eq!(
            hex::encode(alice.salted_password.as_bytes()),
            "db01545dbd413b946fa4432dbd34a306e1288d03eb31f7c4a704ff481266c2dc"
        );
        assert_eq!(
            hex::encode(alice.record.stored_key),
            "5350f1a1c389a132e7dcb3fd43f7d519dd01416fbc08d754cab27e60bfb9acc9"
        );
        assert_eq!(
            hex::encode(alice.record.server_key),
            "cb2997ca997bbc88bd1350e5ca16707579dd52a65e71492c3100328eee8b63c1"
        );
        assert_eq!(alice.record.salt, vec![0u8; 32]);
    }

    #[test]
    fn test_provision_rejects_empty_inputs() {
        let params = KdfParams::low_cost();
        assert!(matches!(
            CredentialRecord::provision(b"", &[0u8; 32], &params),
            Err(CredentialError::Provision(CryptoError::EmptyInput("password")))
        ));
        assert!(matches!(
            CredentialRecord::provision(b"pw", b"", &params),
            Err(CredentialError::Provision(CryptoError::EmptyInput("salt")))
        ));
    }

    #[test]
    fn test_memory_store_lookup() {
        let alice = provisioned(b"alicespass");
        let store = MemoryCredentialStore::new().with_record("alice", alice.record.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("alice"), Some(alice.record.clone()));
        assert!(store.lookup("Alice").is_none());
        assert!(store.lookup("bob").is_none());
    }

    #[test]
    fn test_record_debug_redacts_keys() {
        let alice = provisioned(b"alicespass");
        let shown = format!("{:?}", alice.record);
        assert!(shown.contains("salt_len: 32"));
        assert!(!shown.contains("stored_key"));
    }

    #[test]
    fn test_write_and_open_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_data.csv");

        let alice = provisioned(b"alicespass");
        let bob = provisioned(b"bobspass");
        write_record_file(&path, &[("alice", &alice), ("bob", &bob)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(HEADER));
        assert_eq!(content.lines().count(), 3);

        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.lookup("alice"), Some(alice.record.clone()));
        assert_eq!(store.lookup("bob"), Some(bob.record.clone()));
    }

    #[test]
    fn test_quoted_usernames_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.csv");

        let smith = provisioned(b"smithspass");
        let quoted = provisioned(b"quotedpass");
        let multiline = provisioned(b"multilinepass");
        append_record(&path, "smith, j", &smith).unwrap();
        append_record(&path, " say \"hi\" ", &quoted).unwrap();
        append_record(&path, "two\nlines", &multiline).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"smith, j\","));

        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.lookup("smith, j"), Some(smith.record.clone()));
        assert_eq!(store.lookup(" say \"hi\" "), Some(quoted.record.clone()));
        assert_eq!(store.lookup("two\nlines"), Some(multiline.record.clone()));
        assert!(store.lookup("smith").is_none());
    }

    #[test]
    fn test_parse_quoted_fields() {
        let key = "00".repeat(32);
        let salt = "11".repeat(32);
        let content = format!(
            "{HEADER}\n\"alice\",\"{salt}\",{key},{key},{key}\n\"smith, j\",{salt},{key},{key},{key}\n"
        );

        let store = FileCredentialStore::parse(&content).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.lookup("alice").is_some());
        assert!(store.lookup("\"alice\"").is_none());
        assert!(store.lookup("smith, j").is_some());
    }

    #[test]
    fn test_parse_keeps_surrounding_whitespace() {
        let key = "00".repeat(32);
        let salt = "11".repeat(32);
        let content = format!("{HEADER}\n bob ,{salt},{key},{key},{key}\n");

        let store = FileCredentialStore::parse(&content).unwrap();
        assert!(store.lookup(" bob ").is_some());
        assert!(store.lookup("bob").is_none());
    }

    #[test]
    fn test_append_creates_header_and_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.csv");

        append_record(&path, "alice", &provisioned(b"alicespass")).unwrap();
        append_record(&path, "bob", &provisioned(b"bobspass")).unwrap();
        assert!(matches!(
            append_record(&path, "alice", &provisioned(b"other")),
            Err(CredentialError::DuplicateUser { .. })
        ));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(HEADER).count(), 1);

        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.csv");
        let key = "00".repeat(32);
        let salt = "11".repeat(32);
        fs::write(&path, format!("{HEADER}\nalice,{salt},{key},{key},{key}")).unwrap();

        append_record(&path, "bob", &provisioned(b"bobspass")).unwrap();

        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.lookup("alice").is_some());
    }

    #[test]
    fn test_append_rejects_unstorable_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.csv");
        let record = provisioned(b"pw-for-tests");
        let long = "x".repeat(256);

        for name in ["", long.as_str()] {
            assert!(matches!(
                append_record(&path, name, &record),
                Err(CredentialError::InvalidUsername(_))
            ));
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FileCredentialStore::open(dir.path().join("absent.csv")),
            Err(CredentialError::Io { .. })
        ));
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(matches!(
            FileCredentialStore::parse(""),
            Err(CredentialError::MissingHeader)
        ));
        assert!(matches!(
            FileCredentialStore::parse("name,salt\n"),
            Err(CredentialError::BadHeader(header)) if header == "name,salt"
        ));
    }

    #[test]
    fn test_parse_header_only_is_empty_store() {
        let store = FileCredentialStore::parse(&format!("{HEADER}\n\n")).unwrap();
        assert!(store.is_empty());
    }

    fn row(salt: &str, salted: &str, stored: &str, serv: &str) -> String {
        format!("{HEADER}\nalice,{salt},{salted},{stored},{serv}\n")
    }

    #[test]
    fn test_parse_malformed_rows() {
        let key = "00".repeat(32);
        let salt = "11".repeat(32);

        let cases = [
            format!("{HEADER}\nalice,{salt},{key},{key}\n"),
            format!("{HEADER}\n\"smith, j,{salt},{key},{key},{key}\n"),
            row("zz", &key, &key, &key),
            row(&"11".repeat(4), &key, &key, &key),
            row(&salt, "xyz", &key, &key),
            row(&salt, &key, &"00".repeat(31), &key),
            row(&salt, &key, &key, &"00".repeat(33)),
            format!("{HEADER}\n,{salt},{key},{key},{key}\n"),
        ];
        for content in &cases {
            assert!(
                matches!(
                    FileCredentialStore::parse(content),
                    Err(CredentialError::Malformed { line: 2, .. })
                ),
                "accepted: {content}"
            );
        }
    }

    #[test]
    fn test_parse_duplicate_user() {
        let key = "00".repeat(32);
        let salt = "11".repeat(32);
        let content =
            format!("{HEADER}\nalice,{salt},{key},{key},{key}\nalice,{salt},{key},{key},{key}\n");
        assert!(matches!(
            FileCredentialStore::parse(&content),
            Err(CredentialError::DuplicateUser { line: 3, .. })
        ));
    }
}
