use crate::error::{Result, StoreError};
use keyward_core::domain::{
    normalize_email, Credential, CredentialChange, CredentialDraft, CredentialId,
};
use keyward_core::rules::{accept_change, accept_new, AcceptedCredential, FieldError};
use keyward_core::secret::{HashCost, SecretDigest};
use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::cell::RefCell;
use std::str::FromStr;
use tracing::{debug, warn};

const SELECT_COLUMNS: &str = "id, name, email, secret_digest, created_at, updated_at";

pub struct CredentialsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> CredentialsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Normalizes, validates, hashes and inserts a new credential.
    ///
    /// A duplicate email surfaces as a `Duplicate` field error whether it is caught by
    /// the lookup or, for a concurrent writer, by the unique index.
    pub fn create(
        &self,
        now_utc: i64,
        draft: CredentialDraft,
        cost: HashCost,
    ) -> Result<Credential> {
        let lookup = EmailLookup::new(self, None);
        let accepted = accept_new(draft, |email| lookup.taken(email), cost);
        lookup.finish()?;
        self.insert(now_utc, accepted?)
    }

    /// Durable commit of an already accepted credential.
    pub fn insert(&self, now_utc: i64, accepted: AcceptedCredential) -> Result<Credential> {
        let credential = Credential {
            id: CredentialId::new(),
            name: accepted.name,
            email: accepted.email,
            secret_digest: accepted.secret_digest,
            created_at: now_utc,
            updated_at: now_utc,
        };
        self.write(|conn| {
            conn.execute(
                "INSERT INTO credentials (id, name, email, secret_digest, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    credential.id.to_string(),
                    credential.name,
                    credential.email,
                    credential.secret_digest.as_str(),
                    credential.created_at,
                    credential.updated_at,
                ],
            )
            .map_err(translate_unique_violation)
        })?;
        debug!(id = %credential.id, "credential created");
        Ok(credential)
    }

    /// Applies a partial change. The secret is re-hashed only when the change sets one.
    pub fn update(
        &self,
        now_utc: i64,
        id: CredentialId,
        change: CredentialChange,
        cost: HashCost,
    ) -> Result<Credential> {
        let current = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if change.is_empty() {
            return Ok(current);
        }

        let lookup = EmailLookup::new(self, Some(id));
        let accepted = accept_change(&current, &change, |email| lookup.taken(email), cost);
        lookup.finish()?;
        let accepted = accepted?;

        let secret_changed = accepted.secret_digest.is_some();
        let updated = self.write(|conn| {
            conn.execute(
                "UPDATE credentials
                 SET name = ?2,
                     email = ?3,
                     secret_digest = COALESCE(?4, secret_digest),
                     updated_at = ?5
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    accepted.name,
                    accepted.email,
                    accepted.secret_digest.as_ref().map(SecretDigest::as_str),
                    now_utc,
                ],
            )
            .map_err(translate_unique_violation)
        })?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!(id = %id, secret_changed, "credential updated");

        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Runs a write under an IMMEDIATE transaction so concurrent writers queue on the
    /// busy timeout. Joins the caller's transaction if one is open.
    fn write<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return op(self.conn);
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn get(&self, id: CredentialId) -> Result<Option<Credential>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials WHERE id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(credential_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let email = normalize_email(email);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials WHERE email = ?1 COLLATE NOCASE;"
        ))?;
        let mut rows = stmt.query([email])?;
        match rows.next()? {
            Some(row) => Ok(Some(credential_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive existence check, optionally ignoring one record.
    pub fn email_taken(&self, email: &str, excluding: Option<CredentialId>) -> Result<bool> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM credentials
                 WHERE email = ?1 COLLATE NOCASE
                   AND (?2 IS NULL OR id != ?2)
                 LIMIT 1;",
                params![email, excluding.map(|id| id.to_string())],
                |row| row.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }

    pub fn list_all(&self) -> Result<Vec<Credential>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials ORDER BY email ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut credentials = Vec::new();
        while let Some(row) = rows.next()? {
            credentials.push(credential_from_row(row)?);
        }
        Ok(credentials)
    }

    /// Returns the credential when `candidate` matches its secret.
    ///
    /// Unknown emails and wrong secrets both come back as `Ok(None)`. A stored digest
    /// that cannot be parsed is an error, not a failed login.
    pub fn authenticate(&self, email: &str, candidate: &str) -> Result<Option<Credential>> {
        let Some(credential) = self.find_by_email(email)? else {
            return Ok(None);
        };
        match credential.authenticate(candidate) {
            Ok(true) => Ok(Some(credential)),
            Ok(false) => Ok(None),
            Err(err) => {
                warn!(id = %credential.id, "stored secret digest is malformed");
                Err(err.into())
            }
        }
    }
}

/// Bridges the fallible store lookup into the infallible callback the validator takes.
/// The first lookup failure is kept and reported by `finish`.
struct EmailLookup<'r, 'a> {
    repo: &'r CredentialsRepo<'a>,
    excluding: Option<CredentialId>,
    error: RefCell<Option<StoreError>>,
}

impl<'r, 'a> EmailLookup<'r, 'a> {
    fn new(repo: &'r CredentialsRepo<'a>, excluding: Option<CredentialId>) -> Self {
        Self {
            repo,
            excluding,
            error: RefCell::new(None),
        }
    }

    fn taken(&self, email: &str) -> bool {
        match self.repo.email_taken(email, self.excluding) {
            Ok(taken) => taken,
            Err(err) => {
                let mut slot = self.error.borrow_mut();
                if slot.is_none() {
                    *slot = Some(err);
                }
                false
            }
        }
    }

    fn finish(self) -> Result<()> {
        match self.error.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn translate_unique_violation(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.code == ErrorCode::ConstraintViolation
            && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            return StoreError::Validation(vec![FieldError::duplicate_email()]);
        }
    }
    err.into()
}

fn credential_from_row(row: &Row<'_>) -> Result<Credential> {
    let id_str: String = row.get(0)?;
    let id = CredentialId::from_str(&id_str).map_err(|_| StoreError::InvalidId(id_str.clone()))?;
    Ok(Credential {
        id,
        name: row.get(1)?,
        email: row.get(2)?,
        secret_digest: SecretDigest::from_stored(row.get(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
