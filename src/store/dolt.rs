//! store::dolt
//!
//! Dolt adapter for [`VersionedStore`] using `sqlx` over the MySQL protocol.
//!
//! # Sessions
//!
//! Dolt tracks the checked-out branch per SQL session. The adapter therefore
//! holds exactly one connection, opened lazily on first use, and issues every
//! statement on it. If the connection fails at the I/O level it is dropped
//! and the next call opens a fresh session (which starts on the server's
//! default branch).
//!
//! The adapter exposes a synchronous API; it drives `sqlx` on a private
//! current-thread `tokio` runtime.
//!
//! # Statements
//!
//! | Operation       | SQL                                                 |
//! |-----------------|-----------------------------------------------------|
//! | active branch   | `SELECT active_branch()`                            |
//! | branch exists   | `SELECT COUNT(*) FROM dolt_branches WHERE name = ?` |
//! | create branch   | `CALL DOLT_BRANCH(?)`                               |
//! | checkout        | `CALL DOLT_CHECKOUT(?)`                             |
//! | commit          | `SELECT COUNT(*) FROM dolt_status`, then `CALL DOLT_COMMIT('-Am', ?)` |
//! | provenance      | `SELECT ... FROM dolt_commits WHERE message LIKE ?` |
//!
//! User-supplied values are always bound, never interpolated.
//!
//! # Example
//!
//! ```no_run
//! use doltrun::core::types::DatabaseName;
//! use doltrun::store::{DoltStore, StoreEndpoint, VersionedStore};
//!
//! let endpoint = StoreEndpoint::new(DatabaseName::new("analytics").unwrap());
//! let mut store = DoltStore::new(endpoint).unwrap();
//! println!("on {}", store.active_branch().unwrap());
//! ```

use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::{CommitRecord, StoreError, VersionedStore};
use crate::core::message::names_run;
use crate::core::types::{BranchName, CommitRef, DatabaseName, RunId};

/// Rows fetched per provenance query.
const LOG_PAGE: usize = 100;

/// Where the versioned database lives and how to log in.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: DatabaseName,
}

impl StoreEndpoint {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 3306;
    pub const DEFAULT_USER: &'static str = "root";

    /// Endpoint for `database` on a local `dolt sql-server` with default
    /// credentials.
    pub fn new(database: DatabaseName) -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            user: Self::DEFAULT_USER.to_string(),
            password: String::new(),
            database,
        }
    }

    /// Identity of the endpoint for advisory locking: `host:port/database`.
    pub fn lock_key(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(self.database.as_str())
    }
}

impl std::fmt::Display for StoreEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for StoreEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// A Dolt SQL session.
#[derive(Debug)]
pub struct DoltStore {
    endpoint: StoreEndpoint,
    runtime: Runtime,
    conn: Option<MySqlConnection>,
}

impl DoltStore {
    /// Create an adapter. No connection is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the async runtime cannot start.
    pub fn new(endpoint: StoreEndpoint) -> Result<Self, StoreError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Unavailable {
                message: format!("failed to start runtime: {e}"),
            })?;
        Ok(Self {
            endpoint,
            runtime,
            conn: None,
        })
    }

    pub fn endpoint(&self) -> &StoreEndpoint {
        &self.endpoint
    }

    /// Close the session gracefully.
    pub fn close(mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.runtime.block_on(conn.close()) {
                debug!(error = %e, "error closing session");
            }
        }
    }

    fn session(&mut self) -> Result<(&Runtime, &mut MySqlConnection), StoreError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                debug!(endpoint = %self.endpoint, "opening session");
                let options = self.endpoint.connect_options();
                self.runtime
                    .block_on(options.connect())
                    .map_err(|e| StoreError::Unavailable {
                        message: format!("{}: {}", self.endpoint, e),
                    })?
            }
        };
        Ok((&self.runtime, self.conn.insert(conn)))
    }

    /// Drop the session after connection-level failures.
    fn settle<T>(&mut self, result: Result<T, sqlx::Error>) -> Result<T, sqlx::Error> {
        if let Err(e) = &result {
            if is_connection_error(e) {
                warn!(error = %e, "session lost; will reconnect on next call");
                self.conn = None;
            }
        }
        result
    }
}

impl VersionedStore for DoltStore {
    fn active_branch(&mut self) -> Result<BranchName, StoreError> {
        let (rt, conn) = self.session()?;
        let result = rt.block_on(
            sqlx::query_scalar::<_, String>("SELECT active_branch()").fetch_one(&mut *conn),
        );
        let name = self
            .settle(result)
            .map_err(|e| classify("active_branch", e))?;
        debug!(branch = %name, "active branch");
        BranchName::new(name).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn branch_exists(&mut self, branch: &BranchName) -> Result<bool, StoreError> {
        let (rt, conn) = self.session()?;
        let result = rt.block_on(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dolt_branches WHERE name = ?")
                .bind(branch.as_str())
                .fetch_one(&mut *conn),
        );
        let count = self
            .settle(result)
            .map_err(|e| classify("branch_exists", e))?;
        Ok(count > 0)
    }

    fn create_branch(&mut self, branch: &BranchName) -> Result<(), StoreError> {
        let (rt, conn) = self.session()?;
        let result = rt.block_on(
            sqlx::query("CALL DOLT_BRANCH(?)")
                .bind(branch.as_str())
                .execute(&mut *conn),
        );
        self.settle(result)
            .map_err(|e| classify("create_branch", e))?;
        info!(branch = %branch, "created branch");
        Ok(())
    }

    fn checkout(&mut self, branch: &BranchName) -> Result<(), StoreError> {
        let (rt, conn) = self.session()?;
        let result = rt.block_on(
            sqlx::query("CALL DOLT_CHECKOUT(?)")
                .bind(branch.as_str())
                .execute(&mut *conn),
        );
        match self.settle(result) {
            Ok(_) => {
                debug!(branch = %branch, "checked out");
                Ok(())
            }
            Err(e) => Err(match database_message(&e) {
                Some(message) => classify_checkout(branch, &message),
                None => classify("checkout", e),
            }),
        }
    }

    fn commit(&mut self, message: &str) -> Result<CommitRef, StoreError> {
        let (rt, conn) = self.session()?;
        let status = rt.block_on(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dolt_status").fetch_one(&mut *conn),
        );
        let changed = self.settle(status).map_err(|e| classify("status", e))?;
        if changed == 0 {
            return Err(StoreError::NothingToCommit);
        }

        let (rt, conn) = self.session()?;
        let result = rt.block_on(
            sqlx::query_scalar::<_, String>("CALL DOLT_COMMIT('-Am', ?)")
                .bind(message)
                .fetch_one(&mut *conn),
        );
        let hash = match self.settle(result) {
            Ok(hash) => hash,
            Err(e) => {
                return Err(match database_message(&e) {
                    Some(msg) => classify_commit(&msg),
                    None if is_connection_error(&e) => classify("commit", e),
                    None => StoreError::CommitFailed {
                        message: e.to_string(),
                    },
                })
            }
        };
        CommitRef::new(hash).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn run_commits(
        &mut self,
        run_id: &RunId,
        limit: usize,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        // dolt_commits holds every commit in the database, not just the
        // active branch's ancestry
        let [at_end, before_body] = run_patterns(run_id);
        let mut found = Vec::new();
        let mut offset = 0;
        while found.len() < limit {
            let sql = format!(
                "SELECT commit_hash, committer, message, date FROM dolt_commits \
                 WHERE message LIKE ? OR message LIKE ? \
                 ORDER BY date DESC, commit_hash LIMIT {LOG_PAGE} OFFSET {offset}"
            );
            let (rt, conn) = self.session()?;
            let result = rt.block_on(
                sqlx::query_as::<_, (String, String, String, NaiveDateTime)>(&sql)
                    .bind(&at_end)
                    .bind(&before_body)
                    .fetch_all(&mut *conn),
            );
            let rows = self.settle(result).map_err(|e| classify("run_commits", e))?;
            let exhausted = rows.len() < LOG_PAGE;

            for (hash, committer, message, date) in rows {
                // The LIKE patterns also match a body line naming the run
                if !names_run(&message, run_id.as_str()) {
                    continue;
                }
                found.push(CommitRecord {
                    commit: CommitRef::new(hash)
                        .map_err(|e| StoreError::InvalidResponse(e.to_string()))?,
                    committer,
                    message,
                    date: date.and_utc(),
                });
                if found.len() == limit {
                    break;
                }
            }
            if exhausted {
                break;
            }
            offset += LOG_PAGE;
        }
        debug!(run_id = %run_id, found = found.len(), "provenance search");
        Ok(found)
    }
}

/// `LIKE` patterns for a message whose first line ends with `run: <id>`:
/// either the whole message, or followed by a body.
fn run_patterns(run_id: &RunId) -> [String; 2] {
    let id = escape_like(run_id.as_str());
    [format!("%run: {id}"), format!("%run: {id}\n%")]
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_)
    )
}

fn database_message(err: &sqlx::Error) -> Option<String> {
    err.as_database_error().map(|db| db.message().to_string())
}

fn classify(operation: &str, err: sqlx::Error) -> StoreError {
    if is_connection_error(&err) {
        StoreError::Unavailable {
            message: err.to_string(),
        }
    } else {
        StoreError::Query {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

fn classify_checkout(branch: &BranchName, message: &str) -> StoreError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found")
        || lower.contains("could not find")
        || lower.contains("did not match")
    {
        StoreError::BranchNotFound {
            branch: branch.to_string(),
        }
    } else {
        StoreError::CheckoutConflict {
            branch: branch.to_string(),
            message: message.to_string(),
        }
    }
}

fn classify_commit(message: &str) -> StoreError {
    if message.to_ascii_lowercase().contains("nothing to commit") {
        StoreError::NothingToCommit
    } else {
        StoreError::CommitFailed {
            message: message.to_string(),
        }
    }
}

/// Escape `%`, `_` and `\` for a MySQL `LIKE` pattern.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> StoreEndpoint {
        let mut e = StoreEndpoint::new(DatabaseName::new("analytics").unwrap());
        e.password = "hunter2".into();
        e
    }

    mod endpoint {
        use super::*;

        #[test]
        fn defaults() {
            let e = StoreEndpoint::new(DatabaseName::new("db").unwrap());
            assert_eq!(e.host, "localhost");
            assert_eq!(e.port, 3306);
            assert_eq!(e.user, "root");
            assert!(e.password.is_empty());
        }

        #[test]
        fn display_omits_password() {
            assert_eq!(endpoint().to_string(), "root@localhost:3306/analytics");
        }

        #[test]
        fn debug_redacts_password() {
            let debug = format!("{:?}", endpoint());
            assert!(!debug.contains("hunter2"));
            assert!(debug.contains("<redacted>"));
        }

        #[test]
        fn lock_key() {
            assert_eq!(endpoint().lock_key(), "localhost:3306/analytics");
        }
    }

    mod classification {
        use super::*;

        fn branch() -> BranchName {
            BranchName::new("exp").unwrap()
        }

        #[test]
        fn io_errors_are_unavailable() {
            let err = sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            ));
            assert!(is_connection_error(&err));
            assert!(matches!(
                classify("active_branch", err),
                StoreError::Unavailable { .. }
            ));
        }

        #[test]
        fn other_errors_are_query_errors() {
            let err = classify("branch_exists", sqlx::Error::RowNotFound);
            assert!(matches!(err, StoreError::Query { ref operation, .. } if operation == "branch_exists"));
        }

        #[test]
        fn checkout_messages() {
            assert_eq!(
                classify_checkout(&branch(), "branch not found: exp"),
                StoreError::BranchNotFound {
                    branch: "exp".into()
                }
            );
            assert!(matches!(
                classify_checkout(&branch(), "local changes would be overwritten"),
                StoreError::CheckoutConflict { .. }
            ));
        }

        #[test]
        fn commit_messages() {
            assert_eq!(
                classify_commit("nothing to commit, working tree clean"),
                StoreError::NothingToCommit
            );
            assert!(matches!(
                classify_commit("constraint violation"),
                StoreError::CommitFailed { .. }
            ));
        }
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("run-42"), "run-42");
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[test]
    fn run_patterns_anchor_the_id() {
        let [at_end, before_body] = run_patterns(&RunId::new("run_4").unwrap());
        assert_eq!(at_end, "%run: run\\_4");
        assert_eq!(before_body, "%run: run\\_4\n%");
    }

    #[test]
    fn new_does_not_connect() {
        let store = DoltStore::new(endpoint()).unwrap();
        assert!(store.conn.is_none());
        assert_eq!(store.endpoint().port, 3306);
    }
}
