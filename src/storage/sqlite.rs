//! SQLite storage backend

use super::traits::{
    BatchStore, IngestStore, OpenStore, ProposalStore, StandardStore, StorageError,
    StorageResult, VoteStore, VoterStore,
};
use crate::model::{
    Author, BatchGroup, BatchGroupId, BatchMessage, BatchVote, BatchVoteId, MessageId, Proposal,
    ProposalContent, ProposalId, Standard, StandardId, Vote, VoteId, Voter, VoterId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const PROPOSAL_COLUMNS: &str = r#"
    p.id, p.authors_json, p.content_json, p.withdrawn, p.batchgroup,
    (SELECT COUNT(*) FROM votes v WHERE v.proposal = p.id) AS vote_count
"#;

type ProposalRow = (i64, String, String, bool, Option<i64>, u32);
type VoteRow = (i64, i64, i64, String, bool, String);
type BatchVoteRow = (i64, i64, i64, String, String);

/// SQLite-backed review store
///
/// Uses a single SQLite database file. Thread-safe via internal mutex on the
/// connection. The unique (voter, proposal) and (voter, batchgroup)
/// constraints plus `ON CONFLICT DO UPDATE` give last-writer-wins upserts.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS batchgroups (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                locked INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS proposals (
                id INTEGER PRIMARY KEY,
                authors_json TEXT NOT NULL,
                content_json TEXT NOT NULL,
                withdrawn INTEGER NOT NULL DEFAULT 0,
                batchgroup INTEGER REFERENCES batchgroups(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_proposals_batchgroup
                ON proposals(batchgroup);

            CREATE TABLE IF NOT EXISTS standards (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS voters (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL,
                display_name TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                voter INTEGER NOT NULL REFERENCES voters(id),
                proposal INTEGER NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
                scores_json TEXT NOT NULL,
                nominate INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (voter, proposal)
            );

            CREATE INDEX IF NOT EXISTS idx_votes_proposal ON votes(proposal);

            CREATE TABLE IF NOT EXISTS batchvotes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                voter INTEGER NOT NULL REFERENCES voters(id),
                batchgroup INTEGER NOT NULL REFERENCES batchgroups(id) ON DELETE CASCADE,
                accepted_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (voter, batchgroup)
            );

            CREATE TABLE IF NOT EXISTS batchmessages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batchgroup INTEGER NOT NULL REFERENCES batchgroups(id) ON DELETE CASCADE,
                author INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            PRAGMA foreign_keys = ON;

            -- Concurrent reads while votes are being written
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn parse_time(raw: &str) -> StorageResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| StorageError::DateParse(e.to_string()))?
            .with_timezone(&Utc))
    }

    /// Deserialize a proposal from the `PROPOSAL_COLUMNS` projection
    fn row_to_proposal(row: &Row<'_>) -> rusqlite::Result<ProposalRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn build_proposal(
        (id, authors_json, content_json, withdrawn, batchgroup, vote_count): ProposalRow,
    ) -> StorageResult<Proposal> {
        let authors: Vec<Author> = serde_json::from_str(&authors_json)?;
        let content: ProposalContent = serde_json::from_str(&content_json)?;
        Ok(Proposal {
            id: ProposalId::new(id),
            authors,
            content,
            withdrawn,
            batchgroup: batchgroup.map(BatchGroupId::new),
            vote_count,
        })
    }

    fn row_to_vote(row: &Row<'_>) -> rusqlite::Result<VoteRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn build_vote(
        (id, voter, proposal, scores_json, nominate, updated_at): VoteRow,
    ) -> StorageResult<Vote> {
        Ok(Vote {
            id: VoteId::new(id),
            voter: VoterId::new(voter),
            proposal: ProposalId::new(proposal),
            scores: serde_json::from_str(&scores_json)?,
            nominate,
            updated_at: Self::parse_time(&updated_at)?,
        })
    }

    fn row_to_batch_vote(row: &Row<'_>) -> rusqlite::Result<BatchVoteRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn build_batch_vote(
        (id, voter, group, accepted_json, updated_at): BatchVoteRow,
    ) -> StorageResult<BatchVote> {
        Ok(BatchVote {
            id: BatchVoteId::new(id),
            voter: VoterId::new(voter),
            batchgroup: BatchGroupId::new(group),
            accepted: serde_json::from_str(&accepted_json)?,
            updated_at: Self::parse_time(&updated_at)?,
        })
    }

    fn load_votes(&self, sql: &str, filter: Option<i64>) -> StorageResult<Vec<Vote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match filter {
            Some(id) => stmt
                .query_map(params![id], Self::row_to_vote)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::row_to_vote)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        rows.into_iter().map(Self::build_vote).collect()
    }

    fn load_batch_votes(&self, sql: &str, filter: Option<i64>) -> StorageResult<Vec<BatchVote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match filter {
            Some(id) => stmt
                .query_map(params![id], Self::row_to_batch_vote)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::row_to_batch_vote)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        rows.into_iter().map(Self::build_batch_vote).collect()
    }

    fn members_of(conn: &Connection, id: i64) -> StorageResult<BTreeSet<ProposalId>> {
        let mut stmt = conn.prepare("SELECT id FROM proposals WHERE batchgroup = ?1")?;
        let members = stmt
            .query_map(params![id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members.into_iter().map(ProposalId::new).collect())
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!(path = %path.as_ref().display(), "opening review database");
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ProposalStore for SqliteStore {
    fn get_proposal(&self, id: ProposalId) -> StorageResult<Option<Proposal>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM proposals p WHERE p.id = ?1", PROPOSAL_COLUMNS);
        let row = conn
            .query_row(&sql, params![id.get()], Self::row_to_proposal)
            .optional()?;
        row.map(Self::build_proposal).transpose()
    }

    fn list_proposals(&self) -> StorageResult<Vec<Proposal>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM proposals p ORDER BY p.id", PROPOSAL_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::row_to_proposal)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::build_proposal).collect()
    }

    fn list_non_withdrawn(&self) -> StorageResult<Vec<Proposal>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM proposals p WHERE p.withdrawn = 0 ORDER BY p.id",
            PROPOSAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::row_to_proposal)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::build_proposal).collect()
    }

    fn set_batchgroup(&self, id: ProposalId, group: Option<BatchGroupId>) -> StorageResult<()> {
        let conn = self.conn()?;
        if let Some(gid) = group {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM batchgroups WHERE id = ?1",
                params![gid.get()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StorageError::BatchGroupNotFound(gid));
            }
        }
        let changed = conn.execute(
            "UPDATE proposals SET batchgroup = ?1 WHERE id = ?2",
            params![group.map(BatchGroupId::get), id.get()],
        )?;
        if changed == 0 {
            return Err(StorageError::ProposalNotFound(id));
        }
        Ok(())
    }
}

impl VoteStore for SqliteStore {
    fn upsert_screening_vote(
        &self,
        voter: VoterId,
        proposal: ProposalId,
        scores: &BTreeMap<StandardId, i32>,
        nominate: bool,
    ) -> StorageResult<VoteId> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM proposals WHERE id = ?1",
            params![proposal.get()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::ProposalNotFound(proposal));
        }

        let id: i64 = conn.query_row(
            r#"
            INSERT INTO votes (voter, proposal, scores_json, nominate, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(voter, proposal) DO UPDATE SET
                scores_json = excluded.scores_json,
                nominate = excluded.nominate,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
            params![
                voter.get(),
                proposal.get(),
                serde_json::to_string(scores)?,
                nominate,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        Ok(VoteId::new(id))
    }

    fn upsert_batch_vote(
        &self,
        voter: VoterId,
        group: BatchGroupId,
        accepted: &BTreeSet<ProposalId>,
    ) -> StorageResult<BatchVoteId> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM batchgroups WHERE id = ?1",
            params![group.get()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::BatchGroupNotFound(group));
        }

        let id: i64 = conn.query_row(
            r#"
            INSERT INTO batchvotes (voter, batchgroup, accepted_json, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(voter, batchgroup) DO UPDATE SET
                accepted_json = excluded.accepted_json,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
            params![
                voter.get(),
                group.get(),
                serde_json::to_string(accepted)?,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        Ok(BatchVoteId::new(id))
    }

    fn votes_for_proposal(&self, id: ProposalId) -> StorageResult<Vec<Vote>> {
        self.load_votes(
            "SELECT id, voter, proposal, scores_json, nominate, updated_at
             FROM votes WHERE proposal = ?1 ORDER BY voter",
            Some(id.get()),
        )
    }

    fn votes_for_batchgroup(&self, id: BatchGroupId) -> StorageResult<Vec<BatchVote>> {
        self.load_batch_votes(
            "SELECT id, voter, batchgroup, accepted_json, updated_at
             FROM batchvotes WHERE batchgroup = ?1 ORDER BY voter",
            Some(id.get()),
        )
    }

    fn all_votes(&self) -> StorageResult<Vec<Vote>> {
        self.load_votes(
            "SELECT id, voter, proposal, scores_json, nominate, updated_at
             FROM votes ORDER BY proposal, voter",
            None,
        )
    }

    fn all_batch_votes(&self) -> StorageResult<Vec<BatchVote>> {
        self.load_batch_votes(
            "SELECT id, voter, batchgroup, accepted_json, updated_at
             FROM batchvotes ORDER BY batchgroup, voter",
            None,
        )
    }

    fn proposals_voted_by(&self, voter: VoterId) -> StorageResult<HashSet<ProposalId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT proposal FROM votes WHERE voter = ?1")?;
        let ids = stmt
            .query_map(params![voter.get()], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(ProposalId::new).collect())
    }

    fn vote_counts(&self) -> StorageResult<HashMap<ProposalId, u32>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT proposal, COUNT(*) FROM votes GROUP BY proposal")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts
            .into_iter()
            .map(|(id, n)| (ProposalId::new(id), n))
            .collect())
    }
}

impl StandardStore for SqliteStore {
    fn current_standards(&self) -> StorageResult<Vec<Standard>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, description FROM standards ORDER BY id")?;
        let standards = stmt
            .query_map([], |row| {
                Ok(Standard {
                    id: StandardId::new(row.get(0)?),
                    description: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(standards)
    }
}

impl VoterStore for SqliteStore {
    fn get_voter(&self, id: VoterId) -> StorageResult<Option<Voter>> {
        let conn = self.conn()?;
        let voter = conn
            .query_row(
                "SELECT id, email, display_name, approved FROM voters WHERE id = ?1",
                params![id.get()],
                |row| {
                    Ok(Voter {
                        id: VoterId::new(row.get(0)?),
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        approved: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(voter)
    }

    fn list_voters(&self) -> StorageResult<Vec<Voter>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, email, display_name, approved FROM voters ORDER BY id")?;
        let voters = stmt
            .query_map([], |row| {
                Ok(Voter {
                    id: VoterId::new(row.get(0)?),
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    approved: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(voters)
    }
}

impl BatchStore for SqliteStore {
    fn get_batchgroup(&self, id: BatchGroupId) -> StorageResult<Option<BatchGroup>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, locked FROM batchgroups WHERE id = ?1",
                params![id.get()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?)),
            )
            .optional()?;

        match row {
            Some((gid, name, locked)) => Ok(Some(BatchGroup {
                id: BatchGroupId::new(gid),
                name,
                members: Self::members_of(&conn, gid)?,
                locked,
            })),
            None => Ok(None),
        }
    }

    fn list_batchgroups(&self) -> StorageResult<Vec<BatchGroup>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, locked FROM batchgroups ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(gid, name, locked)| {
                Ok(BatchGroup {
                    id: BatchGroupId::new(gid),
                    name,
                    members: Self::members_of(&conn, gid)?,
                    locked,
                })
            })
            .collect()
    }

    fn set_batch_lock(&self, id: BatchGroupId, locked: bool) -> StorageResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE batchgroups SET locked = ?1 WHERE id = ?2",
            params![locked, id.get()],
        )?;
        if changed == 0 {
            return Err(StorageError::BatchGroupNotFound(id));
        }
        Ok(())
    }

    fn batch_messages(&self, id: BatchGroupId) -> StorageResult<Vec<BatchMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, batchgroup, author, body, created_at
             FROM batchmessages WHERE batchgroup = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![id.get()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mid, gid, author, body, created_at)| {
                Ok(BatchMessage {
                    id: MessageId::new(mid),
                    batchgroup: BatchGroupId::new(gid),
                    author: VoterId::new(author),
                    body,
                    created_at: Self::parse_time(&created_at)?,
                })
            })
            .collect()
    }
}

impl IngestStore for SqliteStore {
    fn insert_proposal(&self, proposal: &Proposal) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO proposals (id, authors_json, content_json, withdrawn, batchgroup)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                authors_json = excluded.authors_json,
                content_json = excluded.content_json,
                withdrawn = excluded.withdrawn,
                batchgroup = excluded.batchgroup
            "#,
            params![
                proposal.id.get(),
                serde_json::to_string(&proposal.authors)?,
                serde_json::to_string(&proposal.content)?,
                proposal.withdrawn,
                proposal.batchgroup.map(BatchGroupId::get),
            ],
        )?;
        Ok(())
    }

    fn insert_standard(&self, standard: &Standard) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO standards (id, description) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET description = excluded.description
            "#,
            params![standard.id.get(), standard.description],
        )?;
        Ok(())
    }

    fn insert_voter(&self, voter: &Voter) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO voters (id, email, display_name, approved) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                approved = excluded.approved
            "#,
            params![voter.id.get(), voter.email, voter.display_name, voter.approved],
        )?;
        Ok(())
    }

    fn insert_batchgroup(&self, group: &BatchGroup) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO batchgroups (id, name, locked) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, locked = excluded.locked
            "#,
            params![group.id.get(), group.name, group.locked],
        )?;
        for member in &group.members {
            let changed = tx.execute(
                "UPDATE proposals SET batchgroup = ?1 WHERE id = ?2",
                params![group.id.get(), member.get()],
            )?;
            if changed == 0 {
                return Err(StorageError::ProposalNotFound(*member));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn add_batch_message(
        &self,
        group: BatchGroupId,
        author: VoterId,
        body: &str,
    ) -> StorageResult<MessageId> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM batchgroups WHERE id = ?1",
            params![group.get()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::BatchGroupNotFound(group));
        }
        conn.execute(
            "INSERT INTO batchmessages (batchgroup, author, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![group.get(), author.get(), body, Utc::now().to_rfc3339()],
        )?;
        Ok(MessageId::new(conn.last_insert_rowid()))
    }
}
