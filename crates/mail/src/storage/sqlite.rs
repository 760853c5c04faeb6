//! SQLite-based label and message storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};
use tokio::sync::watch;

use super::watch::LabelWatchers;
use super::{LabelStore, MessageStore};
use crate::models::{
    AddressId, ConversationId, EmailAddress, Label, LabelId, LabelType, Message, MessageId,
    ParsedHeaders, UserId,
};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Labels, folders and contact groups share one table
            CREATE TABLE labels (
                user_id TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                label_type INTEGER NOT NULL,
                color TEXT NOT NULL DEFAULT '',
                display_order INTEGER NOT NULL DEFAULT 0,
                path TEXT NOT NULL DEFAULT '',
                parent_id TEXT,
                notify INTEGER NOT NULL DEFAULT 0,
                expanded INTEGER NOT NULL DEFAULT 0,
                sticky INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, id)
            );

            CREATE INDEX idx_labels_id ON labels(id);
            CREATE INDEX idx_labels_type ON labels(user_id, label_type, display_order);

            -- Message metadata and encrypted body
            CREATE TABLE messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                address_id TEXT,
                subject TEXT NOT NULL,
                sender_name TEXT,
                sender_email TEXT NOT NULL,
                to_list TEXT NOT NULL DEFAULT '[]',   -- JSON array of addresses
                cc_list TEXT NOT NULL DEFAULT '[]',   -- JSON array of addresses
                time INTEGER NOT NULL,                -- unix millis
                unread INTEGER NOT NULL DEFAULT 0,
                header TEXT,
                parsed_headers TEXT,                  -- JSON
                message_body TEXT
            );

            CREATE INDEX idx_messages_conversation ON messages(conversation_id, time ASC);

            -- Labels on messages (many-to-many)
            CREATE TABLE message_labels (
                message_id TEXT NOT NULL,
                label_id TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (message_id, label_id),
                FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_message_labels_label ON message_labels(label_id);
            "#,
        ),
    ])
}

const LABEL_COLUMNS: &str =
    "user_id, id, name, label_type, color, display_order, path, parent_id, notify, expanded, sticky";

/// SQLite-based mail storage
pub struct SqliteMailStore {
    conn: Mutex<Connection>,
    watchers: LabelWatchers,
}

impl SqliteMailStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // WAL lets readers proceed during writes; foreign_keys enables the
        // ON DELETE CASCADE on message_labels.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
            watchers: LabelWatchers::new(),
        })
    }

    fn query_labels(&self, conn: &Connection, where_clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Label>> {
        let sql = format!(
            "SELECT {} FROM labels WHERE {} ORDER BY display_order ASC, id ASC",
            LABEL_COLUMNS, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let labels = stmt
            .query_map(args, label_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    /// Publish fresh snapshots for `users`
    ///
    /// Called with the connection guard still held so snapshots reach
    /// observers in the same order the writes were committed.
    fn notify(&self, conn: &Connection, users: &[UserId]) -> Result<()> {
        for user_id in users {
            if self.watchers.is_observed(user_id) {
                let labels = self.query_labels(conn, "user_id = ?1", &[&user_id.as_str()])?;
                self.watchers.publish(user_id, labels);
            }
        }
        Ok(())
    }

    fn users_owning_label(&self, conn: &Connection, id: &LabelId) -> Result<Vec<UserId>> {
        let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM labels WHERE id = ?")?;
        let users = stmt
            .query_map([id.as_str()], |row| row.get::<_, String>(0))?
            .map(|r| r.map(UserId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn load_message_labels(&self, conn: &Connection, message_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT label_id FROM message_labels WHERE message_id = ? ORDER BY position",
        )?;
        let labels = stmt
            .query_map([message_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(labels)
    }

    fn replace_message_labels(&self, conn: &Connection, message_id: &str, label_ids: &[String]) -> Result<()> {
        conn.execute("DELETE FROM message_labels WHERE message_id = ?", [message_id])?;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO message_labels (message_id, label_id, position) VALUES (?, ?, ?)",
        )?;
        for (position, label_id) in label_ids.iter().enumerate() {
            stmt.execute(params![message_id, label_id, position as i64])?;
        }
        Ok(())
    }

    fn load_message(&self, conn: &Connection, row: MessageRow) -> Result<Message> {
        let label_ids = self.load_message_labels(conn, &row.id)?;
        row.into_message(label_ids)
    }
}

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
    let raw_type: i32 = row.get(3)?;
    let label_type = LabelType::from_int(raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Integer,
            format!("unknown label type {}", raw_type).into(),
        )
    })?;
    Ok(Label {
        user_id: UserId::new(row.get::<_, String>(0)?),
        id: LabelId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        label_type,
        color: row.get(4)?,
        order: row.get(5)?,
        path: row.get(6)?,
        parent_id: row.get::<_, Option<String>>(7)?.map(LabelId::new),
        notify: row.get(8)?,
        expanded: row.get(9)?,
        sticky: row.get(10)?,
    })
}

/// Raw message columns before JSON decoding and label loading
struct MessageRow {
    id: String,
    conversation_id: String,
    user_id: String,
    address_id: Option<String>,
    subject: String,
    sender_name: Option<String>,
    sender_email: String,
    to_list: String,
    cc_list: String,
    time: i64,
    unread: bool,
    header: Option<String>,
    parsed_headers: Option<String>,
    message_body: Option<String>,
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, user_id, address_id, subject, sender_name, \
     sender_email, to_list, cc_list, time, unread, header, parsed_headers, message_body";

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            user_id: row.get(2)?,
            address_id: row.get(3)?,
            subject: row.get(4)?,
            sender_name: row.get(5)?,
            sender_email: row.get(6)?,
            to_list: row.get(7)?,
            cc_list: row.get(8)?,
            time: row.get(9)?,
            unread: row.get(10)?,
            header: row.get(11)?,
            parsed_headers: row.get(12)?,
            message_body: row.get(13)?,
        })
    }

    fn into_message(self, label_ids: Vec<String>) -> Result<Message> {
        let to: Vec<EmailAddress> =
            serde_json::from_str(&self.to_list).context("Corrupt to_list column")?;
        let cc: Vec<EmailAddress> =
            serde_json::from_str(&self.cc_list).context("Corrupt cc_list column")?;
        let parsed_headers: Option<ParsedHeaders> = self
            .parsed_headers
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("Corrupt parsed_headers column")?;

        Ok(Message {
            id: MessageId::new(self.id),
            conversation_id: ConversationId::new(self.conversation_id),
            user_id: UserId::new(self.user_id),
            address_id: self.address_id.map(AddressId::new),
            subject: self.subject,
            sender: EmailAddress {
                name: self.sender_name,
                email: self.sender_email,
            },
            to,
            cc,
            time: Utc
                .timestamp_millis_opt(self.time)
                .single()
                .unwrap_or_else(Utc::now),
            unread: self.unread,
            label_ids,
            header: self.header,
            parsed_headers,
            message_body: self.message_body,
            decrypted_body: None,
        })
    }
}

impl LabelStore for SqliteMailStore {
    fn find_all_labels(&self, user_id: &UserId) -> Result<Vec<Label>> {
        let conn = self.conn.lock().unwrap();
        self.query_labels(&conn, "user_id = ?1", &[&user_id.as_str()])
    }

    fn observe_all_labels(&self, user_id: &UserId) -> Result<watch::Receiver<Vec<Label>>> {
        let conn = self.conn.lock().unwrap();
        let current = self.query_labels(&conn, "user_id = ?1", &[&user_id.as_str()])?;
        Ok(self.watchers.subscribe(user_id, current))
    }

    fn find_labels_by_id(&self, user_id: &UserId, ids: &[LabelId]) -> Result<Vec<Label>> {
        let labels = self.find_all_labels(user_id)?;
        Ok(labels.into_iter().filter(|l| ids.contains(&l.id)).collect())
    }

    fn find_label_by_id(&self, id: &LabelId) -> Result<Option<Label>> {
        let conn = self.conn.lock().unwrap();
        Ok(self
            .query_labels(&conn, "id = ?1", &[&id.as_str()])?
            .into_iter()
            .next())
    }

    fn find_labels_by_type(&self, user_id: &UserId, label_type: LabelType) -> Result<Vec<Label>> {
        let conn = self.conn.lock().unwrap();
        self.query_labels(
            &conn,
            "user_id = ?1 AND label_type = ?2",
            &[&user_id.as_str(), &label_type.as_int()],
        )
    }

    fn find_labels_paged(
        &self,
        user_id: &UserId,
        label_type: LabelType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Label>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM labels WHERE user_id = ?1 AND label_type = ?2
             ORDER BY display_order ASC, id ASC LIMIT ?3 OFFSET ?4",
            LABEL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let labels = stmt
            .query_map(
                params![user_id.as_str(), label_type.as_int(), limit as i64, offset as i64],
                label_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    fn insert_or_update(&self, labels: &[Label]) -> Result<()> {
        let mut affected: Vec<UserId> = Vec::new();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO labels ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                LABEL_COLUMNS
            ))?;
            for label in labels {
                stmt.execute(params![
                    label.user_id.as_str(),
                    label.id.as_str(),
                    label.name,
                    label.label_type.as_int(),
                    label.color,
                    label.order,
                    label.path,
                    label.parent_id.as_ref().map(|p| p.as_str()),
                    label.notify,
                    label.expanded,
                    label.sticky,
                ])?;
                if !affected.contains(&label.user_id) {
                    affected.push(label.user_id.clone());
                }
            }
        }
        tx.commit()?;

        self.notify(&conn, &affected)
    }

    fn delete_label_by_id(&self, id: &LabelId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = self.users_owning_label(&conn, id)?;
        conn.execute("DELETE FROM labels WHERE id = ?", [id.as_str()])?;
        self.notify(&conn, &affected)
    }

    fn delete_all_labels(&self, user_id: &UserId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM labels WHERE user_id = ?", [user_id.as_str()])?;
        self.notify(&conn, std::slice::from_ref(user_id))
    }

    fn delete_contact_groups(&self, user_id: &UserId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM labels WHERE user_id = ? AND label_type = ?",
            params![user_id.as_str(), LabelType::ContactGroup.as_int()],
        )?;
        self.notify(&conn, std::slice::from_ref(user_id))
    }
}

impl MessageStore for SqliteMailStore {
    fn find_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS),
                [id.as_str()],
                MessageRow::from_row,
            )
            .optional()?;

        row.map(|r| self.load_message(&conn, r)).transpose()
    }

    fn save_message(&self, message: Message) -> Result<()> {
        let to_list = serde_json::to_string(&message.to)?;
        let cc_list = serde_json::to_string(&message.cc)?;
        let parsed_headers = message
            .parsed_headers
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO messages ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                MESSAGE_COLUMNS
            ),
            params![
                message.id.as_str(),
                message.conversation_id.as_str(),
                message.user_id.as_str(),
                message.address_id.as_ref().map(|a| a.as_str()),
                message.subject,
                message.sender.name,
                message.sender.email,
                to_list,
                cc_list,
                message.time.timestamp_millis(),
                message.unread,
                message.header,
                parsed_headers,
                message.message_body,
            ],
        )?;
        self.replace_message_labels(&tx, message.id.as_str(), &message.label_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn list_messages_for_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let rows = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY time ASC",
                MESSAGE_COLUMNS
            ))?;
            stmt.query_map([conversation_id.as_str()], MessageRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|row| self.load_message(&conn, row))
            .collect()
    }

    fn update_message_labels(&self, id: &MessageId, label_ids: Vec<String>) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let exists = conn
            .query_row("SELECT 1 FROM messages WHERE id = ?", [id.as_str()], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Ok(());
        }

        let tx = conn.transaction()?;
        self.replace_message_labels(&tx, id.as_str(), &label_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn set_message_unread(&self, id: &MessageId, unread: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE messages SET unread = ? WHERE id = ?",
            params![unread, id.as_str()],
        )?;
        Ok(())
    }

    fn delete_message(&self, id: &MessageId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM messages WHERE id = ?", [id.as_str()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn label(id: &str, user: &str, label_type: LabelType, order: i32) -> Label {
        Label::new(id, UserId::new(user), format!("Label {}", id), label_type).with_order(order)
    }

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_label_round_trip() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let folder = label("f1", "u1", LabelType::Folder, 3)
            .with_color("#abcdef")
            .with_parent("f0");
        store.insert_or_update(&[folder.clone()]).unwrap();

        let loaded = store.find_label_by_id(&LabelId::new("f1")).unwrap().unwrap();
        assert_eq!(loaded, folder);
    }

    #[test]
    fn test_find_by_type_and_delete_contact_groups() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let user = UserId::new("u1");
        store
            .insert_or_update(&[
                label("g1", "u1", LabelType::ContactGroup, 0),
                label("l1", "u1", LabelType::MessageLabel, 0),
                label("f1", "u1", LabelType::Folder, 0),
            ])
            .unwrap();

        assert_eq!(
            store
                .find_labels_by_type(&user, LabelType::ContactGroup)
                .unwrap()
                .len(),
            1
        );

        store.delete_contact_groups(&user).unwrap();
        let remaining: Vec<String> = store
            .find_all_labels(&user)
            .unwrap()
            .into_iter()
            .map(|l| l.id.0)
            .collect();
        assert_eq!(remaining, vec!["f1", "l1"]);
    }

    #[test]
    fn test_paged_folders() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let folders: Vec<Label> = (0..4)
            .map(|i| label(&format!("f{}", i), "u1", LabelType::Folder, i))
            .collect();
        store.insert_or_update(&folders).unwrap();

        let page = store
            .find_labels_paged(&UserId::new("u1"), LabelType::Folder, 3, 1)
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f2", "f3"]);
    }

    #[test]
    fn test_observer_receives_upserts_and_deletes() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let user = UserId::new("u1");
        let mut receiver = store.observe_all_labels(&user).unwrap();

        store
            .insert_or_update(&[label("l1", "u1", LabelType::MessageLabel, 0)])
            .unwrap();
        assert_eq!(receiver.borrow_and_update().len(), 1);

        store.delete_all_labels(&user).unwrap();
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().is_empty());
    }

    #[test]
    fn test_observer_ends_on_latest_snapshot_under_concurrent_writes() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let user = UserId::new("u1");
        let receiver = store.observe_all_labels(&user).unwrap();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..10 {
                        let id = format!("t{}-{}", t, i);
                        store
                            .insert_or_update(&[label(&id, "u1", LabelType::Folder, i)])
                            .unwrap();
                        if i % 3 == 0 {
                            store.delete_label_by_id(&LabelId::new(id)).unwrap();
                        }
                    }
                });
            }
        });

        let observed = receiver.borrow().clone();
        assert_eq!(observed.len(), 24);
        assert_eq!(observed, store.find_all_labels(&user).unwrap());
    }

    #[test]
    fn test_unknown_label_type_is_an_error() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        store
            .insert_or_update(&[label("l1", "u1", LabelType::MessageLabel, 0)])
            .unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute("UPDATE labels SET label_type = 9 WHERE id = 'l1'", [])
            .unwrap();

        let err = store.find_all_labels(&UserId::new("u1")).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown label type 9"));
    }

    #[test]
    fn test_message_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMailStore::new(dir.path().join("mail.db")).unwrap();

        let message = Message::builder("m1", "c1")
            .user_id(UserId::new("u1"))
            .address_id(AddressId::new("a1"))
            .subject("Hello")
            .sender(EmailAddress::with_name("Jane", "jane@proton.me"))
            .to(vec![EmailAddress::new("bob@proton.me")])
            .time(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
            .unread(true)
            .label_ids(vec!["0".to_string(), "custom".to_string()])
            .parsed_headers(ParsedHeaders {
                recipient_encryption: Some("pgp-pm".to_string()),
                recipient_authentication: None,
            })
            .message_body("-----BEGIN PGP MESSAGE-----")
            .build();
        store.save_message(message.clone()).unwrap();

        let loaded = store.find_message(&MessageId::new("m1")).unwrap().unwrap();
        assert_eq!(loaded, message);
    }

    #[test]
    fn test_message_label_and_unread_updates() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let id = MessageId::new("m1");
        store
            .save_message(Message::builder("m1", "c1").label_ids(vec!["0".to_string()]).build())
            .unwrap();

        store
            .update_message_labels(&id, vec!["6".to_string(), "10".to_string()])
            .unwrap();
        store.set_message_unread(&id, true).unwrap();

        let loaded = store.find_message(&id).unwrap().unwrap();
        assert_eq!(loaded.label_ids, vec!["6".to_string(), "10".to_string()]);
        assert!(loaded.unread);

        store.delete_message(&id).unwrap();
        assert!(store.find_message(&id).unwrap().is_none());
    }

    #[test]
    fn test_conversation_messages_ordered_by_time() {
        let store = SqliteMailStore::open_in_memory().unwrap();
        let later = Utc.timestamp_millis_opt(2_000).unwrap();
        let earlier = Utc.timestamp_millis_opt(1_000).unwrap();
        store
            .save_message(Message::builder("m2", "c1").time(later).build())
            .unwrap();
        store
            .save_message(Message::builder("m1", "c1").time(earlier).build())
            .unwrap();
        store
            .save_message(Message::builder("m3", "c2").time(earlier).build())
            .unwrap();

        let ids: Vec<String> = store
            .list_messages_for_conversation(&ConversationId::new("c1"))
            .unwrap()
            .into_iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }
}
