use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Executor, Pool, QueryBuilder, Sqlite};

use crate::error::{DbError, Result};
use crate::models::{
    Chat, ChatSort, Message, MessageContext, MessageFilter, MessageRecord, UpsertOutcome,
};
use crate::schema::SCHEMA;

const MESSAGE_COLUMNS: &str = "m.id, m.chat_jid, m.sender, m.content, m.timestamp, m.is_from_me, \
     m.media_type, m.filename, m.url, m.media_key, m.file_sha256, m.file_enc_sha256, m.file_length";

/// Effectively unbounded: callers beyond `max_connections` queue for a
/// connection, and any deadline belongs to the caller.
const QUEUE_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub store_dir: PathBuf,
    pub db_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long an operation may wait for a free connection. Defaults to a
    /// year so a busy pool queues instead of failing.
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    pub fn in_dir(store_dir: impl Into<PathBuf>) -> Self {
        let store_dir = store_dir.into();
        Self {
            db_path: store_dir.join("messages.db"),
            store_dir,
            max_connections: 10,
            min_connections: 5,
            acquire_timeout: QUEUE_WAIT,
        }
    }
}

/// Owns the connection pool. Every read and write goes through here.
pub struct BridgeDb {
    pool: Pool<Sqlite>,
}

impl BridgeDb {
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.store_dir)?;
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let max = config.max_connections.max(1);
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .min_connections(config.min_connections.min(max))
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::info!("Database initialized at: {}", config.db_path.display());

        Ok(Self { pool })
    }

    pub async fn new_with_path(path: &Path) -> Result<Self> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let config = StoreConfig {
            db_path: path.to_path_buf(),
            ..StoreConfig::in_dir(dir)
        };
        Self::new(&config).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn upsert_chat(&self, chat: &Chat) -> Result<()> {
        write_chat(&self.pool, chat).await?;
        Ok(())
    }

    /// Messages with neither text nor media are dropped on purpose so that
    /// ingestion callers do not have to pre-filter.
    pub async fn upsert_message(&self, message: &Message) -> Result<UpsertOutcome> {
        if message.is_empty() {
            tracing::debug!(id = %message.id, chat = %message.chat_jid, "Skipping empty message");
            return Ok(UpsertOutcome::Skipped);
        }

        write_message(&self.pool, message)
            .await
            .map_err(|e| map_write_error(e, &message.chat_jid))?;
        Ok(UpsertOutcome::Stored)
    }

    /// Records one observed event: the chat first, then the message that
    /// references it, in a single transaction.
    pub async fn record_inbound(&self, chat: &Chat, message: &Message) -> Result<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        observe_chat(&mut *tx, chat).await?;

        let outcome = if message.is_empty() {
            UpsertOutcome::Skipped
        } else {
            write_message(&mut *tx, message)
                .await
                .map_err(|e| map_write_error(e, &message.chat_jid))?;
            UpsertOutcome::Stored
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn get_chat(&self, jid: &str) -> Result<Chat> {
        sqlx::query_as::<_, Chat>("SELECT jid, name, last_message_time FROM chats WHERE jid = ?")
            .bind(jid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("chat {}", jid)))
    }

    pub async fn get_message(&self, id: &str, chat_jid: &str) -> Result<Message> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ? AND m.chat_jid = ?"
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .bind(chat_jid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("message {} in chat {}", id, chat_jid)))
    }

    /// Most recent first. On equal timestamps the higher id counts as newer,
    /// the same order `message_context` uses.
    pub async fn list_messages(&self, chat_jid: &str, limit: i64, offset: i64) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.chat_jid = ? \
             ORDER BY m.timestamp DESC, m.id DESC LIMIT ? OFFSET ?"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(chat_jid)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Most recently active first; ties are broken by JID.
    pub async fn list_chats(&self, limit: i64, offset: i64) -> Result<Vec<Chat>> {
        self.search_chats(None, ChatSort::LastActive, limit, offset).await
    }

    pub async fn search_chats(
        &self,
        query: Option<&str>,
        sort: ChatSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Chat>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT jid, name, last_message_time FROM chats");

        if let Some(q) = query.filter(|q| !q.is_empty()) {
            let pattern = like_pattern(q);
            qb.push(" WHERE (name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR jid LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        qb.push(match sort {
            ChatSort::LastActive => " ORDER BY last_message_time DESC, jid ASC",
            ChatSort::Name => " ORDER BY name IS NULL, name ASC, jid ASC",
        });
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        Ok(qb.build_query_as::<Chat>().fetch_all(&self.pool).await?)
    }

    /// Newest first across chats; ties are broken by `(chat_jid, id)`.
    pub async fn search_messages(
        &self,
        filter: &MessageFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {MESSAGE_COLUMNS}, c.name AS chat_name \
             FROM messages m LEFT JOIN chats c ON m.chat_jid = c.jid WHERE 1=1"
        ));

        if let Some(q) = filter.query.as_deref().filter(|q| !q.is_empty()) {
            qb.push(" AND LOWER(m.content) LIKE LOWER(")
                .push_bind(like_pattern(q))
                .push(") ESCAPE '\\'");
        }
        if let Some(chat_jid) = filter.chat_jid.as_deref() {
            qb.push(" AND m.chat_jid = ").push_bind(chat_jid.to_string());
        }
        if let Some(sender) = filter.sender.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND m.sender LIKE ")
                .push_bind(like_pattern(sender))
                .push(" ESCAPE '\\'");
        }
        if let Some(after) = filter.after {
            qb.push(" AND m.timestamp >= ").push_bind(after);
        }
        if let Some(before) = filter.before {
            qb.push(" AND m.timestamp <= ").push_bind(before);
        }

        qb.push(" ORDER BY m.timestamp DESC, m.chat_jid ASC, m.id DESC");
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        Ok(qb
            .build_query_as::<MessageRecord>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// The target message with up to `before` earlier and `after` later
    /// messages from the same chat, both in chronological order.
    pub async fn message_context(
        &self,
        id: &str,
        chat_jid: &str,
        before: i64,
        after: i64,
    ) -> Result<MessageContext> {
        let message = self.get_message(id, chat_jid).await?;

        let before_sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.chat_jid = ? \
             AND (m.timestamp < ? OR (m.timestamp = ? AND m.id < ?)) \
             ORDER BY m.timestamp DESC, m.id DESC LIMIT ?"
        );
        let mut earlier = sqlx::query_as::<_, Message>(&before_sql)
            .bind(chat_jid)
            .bind(message.timestamp)
            .bind(message.timestamp)
            .bind(&message.id)
            .bind(before)
            .fetch_all(&self.pool)
            .await?;
        earlier.reverse();

        let after_sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.chat_jid = ? \
             AND (m.timestamp > ? OR (m.timestamp = ? AND m.id > ?)) \
             ORDER BY m.timestamp ASC, m.id ASC LIMIT ?"
        );
        let later = sqlx::query_as::<_, Message>(&after_sql)
            .bind(chat_jid)
            .bind(message.timestamp)
            .bind(message.timestamp)
            .bind(&message.id)
            .bind(after)
            .fetch_all(&self.pool)
            .await?;

        Ok(MessageContext {
            message,
            before: earlier,
            after: later,
        })
    }

    pub async fn count_messages(&self, chat_jid: Option<&str>) -> Result<i64> {
        let count: i64 = match chat_jid {
            Some(chat) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_jid = ?")
                    .bind(chat)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM messages")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    pub async fn count_chats(&self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chats")
            .fetch_one(&self.pool)
            .await?)
    }
}

async fn write_chat<'e, E>(executor: E, chat: &Chat) -> std::result::Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO chats (jid, name, last_message_time) VALUES (?, ?, ?)
         ON CONFLICT(jid) DO UPDATE SET
           name = excluded.name,
           last_message_time = excluded.last_message_time",
    )
    .bind(&chat.jid)
    .bind(&chat.name)
    .bind(chat.last_message_time)
    .execute(executor)
    .await?;
    Ok(())
}

/// Chat half of an inbound event. A redelivered old message must not move
/// the chat back in time, and an event without a name keeps the stored one.
async fn observe_chat<'e, E>(executor: E, chat: &Chat) -> std::result::Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO chats (jid, name, last_message_time) VALUES (?, ?, ?)
         ON CONFLICT(jid) DO UPDATE SET
           name = COALESCE(NULLIF(excluded.name, ''), chats.name),
           last_message_time = MAX(chats.last_message_time, excluded.last_message_time)",
    )
    .bind(&chat.jid)
    .bind(&chat.name)
    .bind(chat.last_message_time)
    .execute(executor)
    .await?;
    Ok(())
}

async fn write_message<'e, E>(executor: E, msg: &Message) -> std::result::Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"INSERT INTO messages
           (id, chat_jid, sender, content, timestamp, is_from_me, media_type, filename, url,
            media_key, file_sha256, file_enc_sha256, file_length)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id, chat_jid) DO UPDATE SET
             sender = excluded.sender,
             content = excluded.content,
             timestamp = excluded.timestamp,
             is_from_me = excluded.is_from_me,
             media_type = excluded.media_type,
             filename = excluded.filename,
             url = excluded.url,
             media_key = excluded.media_key,
             file_sha256 = excluded.file_sha256,
             file_enc_sha256 = excluded.file_enc_sha256,
             file_length = excluded.file_length"#,
    )
    .bind(&msg.id)
    .bind(&msg.chat_jid)
    .bind(&msg.sender)
    .bind(&msg.content)
    .bind(msg.timestamp)
    .bind(msg.is_from_me)
    .bind(&msg.media_type)
    .bind(&msg.filename)
    .bind(&msg.url)
    .bind(&msg.media_key)
    .bind(&msg.file_sha256)
    .bind(&msg.file_enc_sha256)
    .bind(msg.file_length)
    .execute(executor)
    .await?;
    Ok(())
}

fn map_write_error(e: sqlx::Error, chat_jid: &str) -> DbError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::ForeignKeyViolation(chat_jid.to_string())
        }
        _ => DbError::from(e),
    }
}

/// `%term%` with LIKE wildcards in `term` escaped by backslash.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
