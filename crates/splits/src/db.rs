use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SplitsError;

/// Lifecycle of one off-chain approval attempt.
///
/// Allowed transitions: PENDING -> {VALID, EXPIRED, REJECTED},
/// VALID -> USED_ONCHAIN. Everything else is forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    Pending,
    Valid,
    UsedOnchain,
    Expired,
    Rejected,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Pending => "PENDING",
            SignatureStatus::Valid => "VALID",
            SignatureStatus::UsedOnchain => "USED_ONCHAIN",
            SignatureStatus::Expired => "EXPIRED",
            SignatureStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(SignatureStatus::Pending),
            "VALID" => Some(SignatureStatus::Valid),
            "USED_ONCHAIN" => Some(SignatureStatus::UsedOnchain),
            "EXPIRED" => Some(SignatureStatus::Expired),
            "REJECTED" => Some(SignatureStatus::Rejected),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: SignatureStatus) -> bool {
        matches!(
            (self, next),
            (SignatureStatus::Pending, SignatureStatus::Valid)
                | (SignatureStatus::Pending, SignatureStatus::Expired)
                | (SignatureStatus::Pending, SignatureStatus::Rejected)
                | (SignatureStatus::Valid, SignatureStatus::UsedOnchain)
        )
    }
}

impl FromSql for SignatureStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        SignatureStatus::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for SignatureStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// A payment-split job. Amounts and on-chain ids are stored as decimal
/// strings so 256-bit values survive SQLite intact.
#[derive(Debug, Clone)]
pub struct SplitRow {
    pub id: i64,
    pub chain_id: u64,
    pub contract: String,
    pub split_id_onchain: Option<String>,
    pub payer: String,
    pub token: String,
    pub total_amount: String,
    pub deadline: Option<i64>,
    pub meta_hash: Option<Vec<u8>>,
    pub settled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One leg of a split.
#[derive(Debug, Clone)]
pub struct ParticipantRow {
    pub id: i64,
    pub split_id: i64,
    pub participant: String,
    pub amount: String,
    pub approved_offchain_at: Option<i64>,
    pub used_onchain_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One approve-intent and its eventual signature.
#[derive(Debug, Clone)]
pub struct SignatureRow {
    pub id: i64,
    pub split_id: i64,
    pub participant: String,
    pub amount: String,
    pub deadline: Option<i64>,
    pub salt: Vec<u8>,
    pub signature: Vec<u8>,
    pub status: SignatureStatus,
    pub reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Read-only token catalog entry.
#[derive(Debug, Clone)]
pub struct TokenRow {
    pub id: i64,
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    pub enabled: bool,
}

/// Fields for a new split row; participants are inserted in the same
/// transaction.
#[derive(Debug, Clone)]
pub struct NewSplit {
    pub chain_id: u64,
    pub contract: String,
    pub payer: String,
    pub token: String,
    pub total_amount: String,
    pub deadline: Option<i64>,
    pub meta_hash: Option<Vec<u8>>,
    pub created_at: i64,
}

/// SQLite store for splits, participants, signatures and the token catalog.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, SplitsError> {
        let conn = Connection::open(path).map_err(SplitsError::from)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SplitsError> {
        self.conn
            .lock()
            .map_err(|_| SplitsError::Internal("database lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<(), SplitsError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS splits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chain_id INTEGER NOT NULL,
                contract TEXT NOT NULL,
                split_id_onchain TEXT,
                payer TEXT NOT NULL,
                token TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                deadline INTEGER,
                meta_hash BLOB,
                settled INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_splits_chain_contract ON splits(chain_id, contract);
            CREATE INDEX IF NOT EXISTS idx_splits_payer ON splits(payer);
            CREATE INDEX IF NOT EXISTS idx_splits_token ON splits(token);
            CREATE INDEX IF NOT EXISTS idx_splits_settled_created ON splits(settled, created_at);

            CREATE TABLE IF NOT EXISTS split_participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                split_id INTEGER NOT NULL REFERENCES splits(id) ON DELETE CASCADE,
                participant TEXT NOT NULL,
                amount TEXT NOT NULL,
                approved_offchain_at INTEGER,
                used_onchain_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (split_id, participant)
            );
            CREATE INDEX IF NOT EXISTS idx_participants_participant ON split_participants(participant);

            CREATE TABLE IF NOT EXISTS split_signatures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                split_id INTEGER NOT NULL REFERENCES splits(id) ON DELETE CASCADE,
                participant TEXT NOT NULL,
                amount TEXT NOT NULL,
                deadline INTEGER,
                salt BLOB NOT NULL,
                signature BLOB NOT NULL DEFAULT X'',
                status TEXT NOT NULL DEFAULT 'PENDING',
                reason TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (split_id, participant, salt)
            );
            CREATE INDEX IF NOT EXISTS idx_signatures_participant ON split_signatures(participant);
            CREATE INDEX IF NOT EXISTS idx_signatures_status_created ON split_signatures(status, created_at);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_signatures_one_active
                ON split_signatures(split_id, participant)
                WHERE status IN ('VALID', 'USED_ONCHAIN');

            CREATE TABLE IF NOT EXISTS supported_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chain_id INTEGER NOT NULL,
                address TEXT NOT NULL,
                symbol TEXT NOT NULL,
                name TEXT NOT NULL,
                decimals INTEGER NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                UNIQUE (chain_id, address)
            );
            "#,
        )
        .map_err(SplitsError::from)?;

        Ok(())
    }

    /// Insert a split and all of its participant rows in one transaction.
    /// Returns the new split id.
    pub fn insert_split(
        &self,
        split: &NewSplit,
        participants: &[(String, String)],
    ) -> Result<i64, SplitsError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(SplitsError::from)?;

        tx.execute(
            r#"
            INSERT INTO splits (chain_id, contract, payer, token, total_amount, deadline, meta_hash, settled, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)
            "#,
            params![
                split.chain_id as i64,
                split.contract,
                split.payer,
                split.token,
                split.total_amount,
                split.deadline,
                split.meta_hash,
                split.created_at,
            ],
        )
        .map_err(SplitsError::from)?;

        let split_id = tx.last_insert_rowid();

        for (participant, amount) in participants {
            tx.execute(
                r#"
                INSERT INTO split_participants (split_id, participant, amount, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                "#,
                params![split_id, participant, amount, split.created_at],
            )
            .map_err(SplitsError::from)?;
        }

        tx.commit().map_err(SplitsError::from)?;
        Ok(split_id)
    }

    /// Hard-delete a split (participants and signatures cascade). Used only
    /// to compensate a failed on-chain create.
    pub fn delete_split(&self, split_id: i64) -> Result<(), SplitsError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM splits WHERE id = ?1", params![split_id])
            .map_err(SplitsError::from)?;
        Ok(())
    }

    pub fn set_split_onchain_id(
        &self,
        split_id: i64,
        onchain_id: &str,
        now: i64,
    ) -> Result<(), SplitsError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE splits SET split_id_onchain = ?1, updated_at = ?2 WHERE id = ?3",
            params![onchain_id, now, split_id],
        )
        .map_err(SplitsError::from)?;
        Ok(())
    }

    pub fn get_split(&self, split_id: i64) -> Result<Option<SplitRow>, SplitsError> {
        let conn = self.lock()?;
        conn.query_row(
            r#"
            SELECT id, chain_id, contract, split_id_onchain, payer, token, total_amount, deadline, meta_hash, settled, created_at, updated_at
            FROM splits WHERE id = ?1
            "#,
            params![split_id],
            split_from_row,
        )
        .optional()
        .map_err(SplitsError::from)
    }

    pub fn participants_for_split(&self, split_id: i64) -> Result<Vec<ParticipantRow>, SplitsError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, split_id, participant, amount, approved_offchain_at, used_onchain_at, created_at, updated_at
                FROM split_participants WHERE split_id = ?1 ORDER BY id
                "#,
            )
            .map_err(SplitsError::from)?;
        let rows = stmt
            .query_map(params![split_id], participant_from_row)
            .map_err(SplitsError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(SplitsError::from)?;
        Ok(rows)
    }

    pub fn find_participant(
        &self,
        split_id: i64,
        participant: &str,
    ) -> Result<Option<ParticipantRow>, SplitsError> {
        let conn = self.lock()?;
        conn.query_row(
            r#"
            SELECT id, split_id, participant, amount, approved_offchain_at, used_onchain_at, created_at, updated_at
            FROM split_participants WHERE split_id = ?1 AND participant = ?2
            "#,
            params![split_id, participant],
            participant_from_row,
        )
        .optional()
        .map_err(SplitsError::from)
    }

    pub fn signatures_for_split(&self, split_id: i64) -> Result<Vec<SignatureRow>, SplitsError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, split_id, participant, amount, deadline, salt, signature, status, reason, created_at, updated_at
                FROM split_signatures WHERE split_id = ?1 ORDER BY id
                "#,
            )
            .map_err(SplitsError::from)?;
        let rows = stmt
            .query_map(params![split_id], signature_from_row)
            .map_err(SplitsError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(SplitsError::from)?;
        Ok(rows)
    }

    /// All VALID signature rows for a split, in insertion order. This is the
    /// enumeration order settlement passes to the contract.
    pub fn valid_signatures(&self, split_id: i64) -> Result<Vec<SignatureRow>, SplitsError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, split_id, participant, amount, deadline, salt, signature, status, reason, created_at, updated_at
                FROM split_signatures WHERE split_id = ?1 AND status = 'VALID' ORDER BY id
                "#,
            )
            .map_err(SplitsError::from)?;
        let rows = stmt
            .query_map(params![split_id], signature_from_row)
            .map_err(SplitsError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(SplitsError::from)?;
        Ok(rows)
    }

    /// Insert a PENDING intent row with an empty signature. The
    /// `(split_id, participant, salt)` unique constraint rejects salt reuse.
    pub fn insert_signature(
        &self,
        split_id: i64,
        participant: &str,
        amount: &str,
        deadline: Option<i64>,
        salt: &[u8],
        now: i64,
    ) -> Result<i64, SplitsError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO split_signatures (split_id, participant, amount, deadline, salt, signature, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, X'', 'PENDING', ?6, ?6)
            "#,
            params![split_id, participant, amount, deadline, salt, now],
        )
        .map_err(SplitsError::from)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_signature_by_salt(
        &self,
        split_id: i64,
        participant: &str,
        salt: &[u8],
    ) -> Result<Option<SignatureRow>, SplitsError> {
        let conn = self.lock()?;
        conn.query_row(
            r#"
            SELECT id, split_id, participant, amount, deadline, salt, signature, status, reason, created_at, updated_at
            FROM split_signatures WHERE split_id = ?1 AND participant = ?2 AND salt = ?3
            "#,
            params![split_id, participant, salt],
            signature_from_row,
        )
        .optional()
        .map_err(SplitsError::from)
    }

    /// Whether the participant already holds a VALID or USED_ONCHAIN row
    /// for this split. At most one may exist at a time; the partial unique
    /// index enforces this at the store level.
    pub fn has_active_signature(
        &self,
        split_id: i64,
        participant: &str,
    ) -> Result<bool, SplitsError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                r#"
                SELECT COUNT(*) FROM split_signatures
                WHERE split_id = ?1 AND participant = ?2 AND status IN ('VALID', 'USED_ONCHAIN')
                "#,
                params![split_id, participant],
                |row| row.get(0),
            )
            .map_err(SplitsError::from)?;
        Ok(count > 0)
    }

    /// PENDING -> VALID plus the participant's approved_offchain_at stamp,
    /// atomically. The `WHERE status='PENDING'` guard makes concurrent
    /// submits race safely: exactly one caller observes `true`.
    pub fn mark_signature_valid(
        &self,
        signature_id: i64,
        participant_id: i64,
        signature: &[u8],
        now: i64,
    ) -> Result<bool, SplitsError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(SplitsError::from)?;

        let changed = tx
            .execute(
                r#"
                UPDATE split_signatures
                SET status = 'VALID', signature = ?1, reason = NULL, updated_at = ?2
                WHERE id = ?3 AND status = 'PENDING'
                "#,
                params![signature, now, signature_id],
            )
            .map_err(SplitsError::from)?;

        if changed == 1 {
            tx.execute(
                r#"
                UPDATE split_participants SET approved_offchain_at = ?1, updated_at = ?1
                WHERE id = ?2
                "#,
                params![now, participant_id],
            )
            .map_err(SplitsError::from)?;
        }

        tx.commit().map_err(SplitsError::from)?;
        Ok(changed == 1)
    }

    /// PENDING -> EXPIRED or REJECTED with a reason. Terminal states are
    /// never overwritten.
    pub fn mark_signature_terminal(
        &self,
        signature_id: i64,
        status: SignatureStatus,
        reason: &str,
        now: i64,
    ) -> Result<bool, SplitsError> {
        debug_assert!(SignatureStatus::Pending.can_transition_to(status));
        let conn = self.lock()?;
        let changed = conn
            .execute(
                r#"
                UPDATE split_signatures SET status = ?1, reason = ?2, updated_at = ?3
                WHERE id = ?4 AND status = 'PENDING'
                "#,
                params![status, reason, now, signature_id],
            )
            .map_err(SplitsError::from)?;
        Ok(changed == 1)
    }

    /// Commit the post-settlement state in one transaction: the split's
    /// settled flag (optimistic `WHERE settled=0`), every participant's
    /// used_onchain_at, and every signature's USED_ONCHAIN status. Returns
    /// whether this call flipped the settled flag.
    pub fn mark_settled(
        &self,
        split_id: i64,
        rows: &[(i64, i64)],
        now: i64,
    ) -> Result<bool, SplitsError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(SplitsError::from)?;

        let changed = tx
            .execute(
                "UPDATE splits SET settled = 1, updated_at = ?1 WHERE id = ?2 AND settled = 0",
                params![now, split_id],
            )
            .map_err(SplitsError::from)?;

        for (participant_id, signature_id) in rows {
            tx.execute(
                r#"
                UPDATE split_participants SET used_onchain_at = ?1, updated_at = ?1
                WHERE id = ?2
                "#,
                params![now, participant_id],
            )
            .map_err(SplitsError::from)?;
            tx.execute(
                r#"
                UPDATE split_signatures SET status = 'USED_ONCHAIN', updated_at = ?1
                WHERE id = ?2 AND status = 'VALID'
                "#,
                params![now, signature_id],
            )
            .map_err(SplitsError::from)?;
        }

        tx.commit().map_err(SplitsError::from)?;
        Ok(changed == 1)
    }

    pub fn list_tokens(&self, chain_id: u64) -> Result<Vec<TokenRow>, SplitsError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, chain_id, address, symbol, name, decimals, enabled
                FROM supported_tokens WHERE chain_id = ?1 AND enabled = 1 ORDER BY symbol
                "#,
            )
            .map_err(SplitsError::from)?;
        let rows = stmt
            .query_map(params![chain_id as i64], token_from_row)
            .map_err(SplitsError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(SplitsError::from)?;
        Ok(rows)
    }

    /// Catalog maintenance entry point for operators and tests.
    pub fn upsert_token(
        &self,
        chain_id: u64,
        address: &str,
        symbol: &str,
        name: &str,
        decimals: u32,
        enabled: bool,
    ) -> Result<(), SplitsError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO supported_tokens (chain_id, address, symbol, name, decimals, enabled)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(chain_id, address) DO UPDATE SET
                symbol = ?3, name = ?4, decimals = ?5, enabled = ?6
            "#,
            params![chain_id as i64, address, symbol, name, decimals, enabled],
        )
        .map_err(SplitsError::from)?;
        Ok(())
    }
}

fn split_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SplitRow> {
    Ok(SplitRow {
        id: row.get(0)?,
        chain_id: row.get::<_, i64>(1)? as u64,
        contract: row.get(2)?,
        split_id_onchain: row.get(3)?,
        payer: row.get(4)?,
        token: row.get(5)?,
        total_amount: row.get(6)?,
        deadline: row.get(7)?,
        meta_hash: row.get(8)?,
        settled: row.get::<_, i64>(9)? != 0,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn participant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ParticipantRow> {
    Ok(ParticipantRow {
        id: row.get(0)?,
        split_id: row.get(1)?,
        participant: row.get(2)?,
        amount: row.get(3)?,
        approved_offchain_at: row.get(4)?,
        used_onchain_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn signature_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SignatureRow> {
    Ok(SignatureRow {
        id: row.get(0)?,
        split_id: row.get(1)?,
        participant: row.get(2)?,
        amount: row.get(3)?,
        deadline: row.get(4)?,
        salt: row.get(5)?,
        signature: row.get(6)?,
        status: row.get(7)?,
        reason: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn token_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TokenRow> {
    Ok(TokenRow {
        id: row.get(0)?,
        chain_id: row.get::<_, i64>(1)? as u64,
        address: row.get(2)?,
        symbol: row.get(3)?,
        name: row.get(4)?,
        decimals: row.get::<_, i64>(5)? as u32,
        enabled: row.get::<_, i64>(6)? != 0,
    })
}
