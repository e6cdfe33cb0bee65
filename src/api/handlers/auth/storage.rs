//! Principal persistence.
//!
//! Strategies only see the [`PrincipalStore`] trait. Postgres backs production;
//! [`MemoryPrincipalStore`](super::memory::MemoryPrincipalStore) backs tests and
//! database-less development runs.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::principal::{OtpRecord, Principal, PrincipalKind, Role};
use super::utils::{is_unique_violation, unix_now};

/// Fields supplied when provisioning a principal.
#[derive(Clone, Debug)]
pub struct NewPrincipal {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub is_email_verified: bool,
    pub google_id: Option<String>,
}

/// Partial update. Fields left as `None` are not touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrincipalUpdate {
    pub google_id: Option<String>,
    pub otp: Option<Option<OtpRecord>>,
}

impl PrincipalUpdate {
    #[must_use]
    pub fn link_identity(google_id: impl Into<String>) -> Self {
        Self {
            google_id: Some(google_id.into()),
            otp: None,
        }
    }

    #[must_use]
    pub fn set_otp(record: OtpRecord) -> Self {
        Self {
            google_id: None,
            otp: Some(Some(record)),
        }
    }

    #[must_use]
    pub fn clear_otp() -> Self {
        Self {
            google_id: None,
            otp: Some(None),
        }
    }

    pub(crate) fn apply(&self, principal: &mut Principal, now: i64) {
        if let Some(google_id) = &self.google_id {
            principal.google_id = Some(google_id.clone());
        }
        if let Some(otp) = &self.otp {
            principal.otp.clone_from(otp);
        }
        principal.updated_at = now;
    }
}

/// Outcome when attempting to create a principal.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Principal),
    Conflict,
}

#[async_trait]
pub trait PrincipalStore: Send + Sync + std::fmt::Debug {
    async fn find_by_email(&self, kind: PrincipalKind, email: &str) -> Result<Option<Principal>>;

    async fn find_by_id(&self, kind: PrincipalKind, id: Uuid) -> Result<Option<Principal>>;

    /// Principal of the kind already linked to the external identity, if any.
    async fn find_by_google_id(
        &self,
        kind: PrincipalKind,
        google_id: &str,
    ) -> Result<Option<Principal>>;

    /// Insert a principal; an existing email (or linked identity) for the kind is a conflict.
    async fn create(&self, kind: PrincipalKind, principal: NewPrincipal) -> Result<CreateOutcome>;

    /// Apply a partial update and return the stored result, `None` if the id is unknown.
    /// Linking an external identity another principal of the kind holds is an error.
    async fn update(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        update: PrincipalUpdate,
    ) -> Result<Option<Principal>>;

    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> Result<()>;
}

pub(crate) fn ensure_role_matches(kind: PrincipalKind, role: Role) -> Result<()> {
    if role.kind() == kind {
        Ok(())
    } else {
        Err(anyhow!("role {role} cannot be assigned to a {kind}"))
    }
}

const fn table(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::Admin => "admins",
        PrincipalKind::Store => "stores",
        PrincipalKind::User => "users",
    }
}

const COLUMNS: &str = "id, email, full_name, role, password_hash, is_email_verified, google_id, \
                       otp_hash, otp_expires_at, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn principal_from_row(kind: PrincipalKind, row: &PgRow) -> Result<Principal> {
    let role: String = row.try_get("role").context("missing role column")?;
    let role: Role = role
        .parse()
        .with_context(|| format!("stored role is invalid for {kind}"))?;
    ensure_role_matches(kind, role)?;

    let otp_hash: Option<String> = row.try_get("otp_hash")?;
    let otp_expires_at: Option<i64> = row.try_get("otp_expires_at")?;
    let otp = match (otp_hash, otp_expires_at) {
        (Some(code_hash), Some(expires_at)) => Some(OtpRecord {
            code_hash,
            expires_at,
        }),
        _ => None,
    };

    Ok(Principal {
        id: row.try_get("id")?,
        kind,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role,
        password_hash: row.try_get("password_hash")?,
        is_email_verified: row.try_get("is_email_verified")?,
        google_id: row.try_get("google_id")?,
        otp,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_email(&self, kind: PrincipalKind, email: &str) -> Result<Option<Principal>> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE email = $1", table(kind));
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup {kind} by email"))?;

        row.map(|row| principal_from_row(kind, &row)).transpose()
    }

    async fn find_by_id(&self, kind: PrincipalKind, id: Uuid) -> Result<Option<Principal>> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", table(kind));
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup {kind} by id"))?;

        row.map(|row| principal_from_row(kind, &row)).transpose()
    }

    async fn find_by_google_id(
        &self,
        kind: PrincipalKind,
        google_id: &str,
    ) -> Result<Option<Principal>> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE google_id = $1", table(kind));
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup {kind} by external identity"))?;

        row.map(|row| principal_from_row(kind, &row)).transpose()
    }

    async fn create(&self, kind: PrincipalKind, principal: NewPrincipal) -> Result<CreateOutcome> {
        ensure_role_matches(kind, principal.role)?;

        let query = format!(
            r"
            INSERT INTO {}
                (email, full_name, role, password_hash, is_email_verified, google_id,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {COLUMNS}
            ",
            table(kind)
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(&principal.email)
            .bind(&principal.full_name)
            .bind(principal.role.as_str())
            .bind(&principal.password_hash)
            .bind(principal.is_email_verified)
            .bind(&principal.google_id)
            .bind(unix_now())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(principal_from_row(kind, &row)?)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).with_context(|| format!("failed to insert {kind}")),
        }
    }

    async fn update(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        update: PrincipalUpdate,
    ) -> Result<Option<Principal>> {
        let query = format!(
            r"
            UPDATE {}
            SET google_id = COALESCE($2, google_id),
                otp_hash = CASE WHEN $3 THEN $4 ELSE otp_hash END,
                otp_expires_at = CASE WHEN $3 THEN $5 ELSE otp_expires_at END,
                updated_at = $6
            WHERE id = $1
            RETURNING {COLUMNS}
            ",
            table(kind)
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );

        let touch_otp = update.otp.is_some();
        let otp = update.otp.flatten();
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&update.google_id)
            .bind(touch_otp)
            .bind(otp.as_ref().map(|record| record.code_hash.as_str()))
            .bind(otp.as_ref().map(|record| record.expires_at))
            .bind(unix_now())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => row.map(|row| principal_from_row(kind, &row)).transpose(),
            Err(err) if is_unique_violation(&err) => {
                Err(anyhow!("external identity is already linked to another {kind}"))
            }
            Err(err) => Err(err).with_context(|| format!("failed to update {kind}")),
        }
    }

    async fn ping(&self) -> Result<()> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}
