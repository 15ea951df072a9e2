use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::DialogError;
use crate::id::generate_unique_id;
use crate::model::{
    Block, Message, Role, FIELD_MESSAGE_CREATED_AT, FIELD_MESSAGE_ID, FIELD_MESSAGE_PARENT_ID,
    FIELD_MESSAGE_TITLE,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    parent_id TEXT REFERENCES messages(id) ON DELETE RESTRICT,
    title TEXT,
    role TEXT NOT NULL,
    tool_result_error INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_parent_id ON messages(parent_id);
CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);

CREATE TABLE IF NOT EXISTS blocks (
    message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    sequence_order INTEGER NOT NULL,
    id TEXT,
    block_type TEXT NOT NULL,
    modality TEXT NOT NULL,
    mime_type TEXT,
    content TEXT NOT NULL,
    extra_fields TEXT,
    PRIMARY KEY (message_id, sequence_order)
);
";

/// A content-addressed branching conversation graph with SQLite-backed
/// relational storage. One connection per process; all writers serialize
/// through `conn`'s mutex and SQLite's own transactions.
pub struct DialogStore {
    conn: Mutex<Connection>,
}

impl DialogStore {
    pub fn open(path: &Path) -> Result<Self, DialogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| DialogError::CorruptedData {
                id: path.display().to_string(),
                reason: err.to_string(),
            })?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DialogError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DialogError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Save a lazy sequence of root-to-leaf messages inside one
    /// transaction. See [`SaveDialog`] for the full commit/rollback
    /// contract.
    pub fn save_dialog<I>(&self, msgs: I) -> SaveDialog<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Message>,
    {
        let guard = self.lock();
        // BEGIN IMMEDIATE: take the write lock up front since we already
        // know this call intends to write.
        let _ = guard.execute_batch("BEGIN IMMEDIATE");
        SaveDialog {
            conn: guard,
            inner: msgs.into_iter(),
            prev_id: None,
            first: true,
            finished: false,
        }
    }

    pub fn get_messages(&self, ids: &[String]) -> Result<Vec<Message>, DialogError> {
        let conn = self.lock();
        ids.iter().map(|id| load_message(&conn, id)).collect()
    }

    pub fn list_messages(&self, offset: i64, ascending: bool) -> Result<Vec<Message>, DialogError> {
        let conn = self.lock();
        let order = if ascending { "ASC" } else { "DESC" };
        let sql = format!(
            "SELECT id FROM messages ORDER BY created_at {order}, id {order} LIMIT -1 OFFSET ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids: Vec<String> = stmt
            .query_map(params![offset], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        drop(stmt);
        ids.iter().map(|id| load_message(&conn, id)).collect()
    }

    pub fn get_dialog_for_message(&self, id: &str) -> Result<Vec<Message>, DialogError> {
        let conn = self.lock();
        let mut chain = Vec::new();
        let mut current = id.to_string();
        let mut child_for_error: Option<String> = None;

        loop {
            let message = match (load_message(&conn, &current), &child_for_error) {
                (Ok(message), _) => message,
                (Err(DialogError::NotFound { .. }), Some(child_id)) => {
                    return Err(DialogError::OrphanedMessage {
                        id: child_id.clone(),
                        parent_id: current,
                    })
                }
                (Err(err), _) => return Err(err),
            };
            let parent = message.persisted_parent_id().map(str::to_string);
            child_for_error = Some(current.clone());
            chain.push(message);
            match parent {
                Some(parent_id) => current = parent_id,
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    pub fn delete_messages(&self, ids: &[String], recursive: bool) -> Result<(), DialogError> {
        let conn = self.lock();
        conn.execute_batch("BEGIN IMMEDIATE")?;

        let result = (|| {
            for id in ids {
                if !recursive {
                    let child_count: i64 = conn.query_row(
                        "SELECT COUNT(*) FROM messages WHERE parent_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )?;
                    if child_count > 0 {
                        return Err(DialogError::HasChildren { id: id.clone() });
                    }
                    conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
                } else {
                    delete_subtree(&conn, id)?;
                }
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(err) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }
}

fn delete_subtree(conn: &Connection, id: &str) -> Result<(), DialogError> {
    let mut stmt = conn.prepare("SELECT id FROM messages WHERE parent_id = ?1")?;
    let children: Vec<String> = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    drop(stmt);
    for child in children {
        delete_subtree(conn, &child)?;
    }
    conn.execute("DELETE FROM blocks WHERE message_id = ?1", params![id])?;
    conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
    Ok(())
}

fn load_message(conn: &Connection, id: &str) -> Result<Message, DialogError> {
    let row = conn
        .query_row(
            "SELECT parent_id, title, role, tool_result_error, created_at FROM messages WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    let (parent_id, title, role_raw, tool_result_error, created_at) =
        row.ok_or_else(|| DialogError::NotFound { id: id.to_string() })?;

    let role = role_raw.parse::<Role>().map_err(|raw| DialogError::CorruptedData {
        id: id.to_string(),
        reason: format!("invalid role {raw:?}"),
    })?;

    let blocks = load_blocks(conn, id)?;

    let mut extra_fields = std::collections::HashMap::new();
    extra_fields.insert(FIELD_MESSAGE_ID.to_string(), serde_json::json!(id));
    extra_fields.insert(
        FIELD_MESSAGE_CREATED_AT.to_string(),
        serde_json::json!(created_at),
    );
    if let Some(parent_id) = &parent_id {
        extra_fields.insert(
            FIELD_MESSAGE_PARENT_ID.to_string(),
            serde_json::json!(parent_id),
        );
    }
    if let Some(title) = &title {
        extra_fields.insert(FIELD_MESSAGE_TITLE.to_string(), serde_json::json!(title));
    }

    Ok(Message {
        role,
        tool_result_error: tool_result_error != 0,
        blocks,
        extra_fields,
    })
}

fn load_blocks(conn: &Connection, message_id: &str) -> Result<Vec<Block>, DialogError> {
    let mut stmt = conn.prepare(
        "SELECT id, block_type, modality, mime_type, content, extra_fields
         FROM blocks WHERE message_id = ?1 ORDER BY sequence_order ASC",
    )?;
    let rows = stmt.query_map(params![message_id], |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut blocks = Vec::new();
    for row in rows {
        let (id, block_type, modality, mime_type, content, extra_fields_raw) = row?;
        let extra_fields = match extra_fields_raw {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| {
                DialogError::CorruptedData {
                    id: message_id.to_string(),
                    reason: format!("unparseable block extra_fields: {err}"),
                }
            })?),
            None => None,
        };
        blocks.push(Block {
            id,
            block_type,
            modality,
            mime_type,
            content,
            extra_fields,
        });
    }
    Ok(blocks)
}

/// The streaming iterator returned by [`DialogStore::save_dialog`].
///
/// Yields `(Message, Result<(), DialogError>)` pairs. The transaction
/// commits when the input is exhausted *or* the consumer stops pulling
/// before exhaustion (Ctrl-C-safe partial save); it rolls back only when a
/// yielded pair carries an error.
pub struct SaveDialog<'conn, I> {
    conn: MutexGuard<'conn, Connection>,
    inner: I,
    prev_id: Option<String>,
    first: bool,
    finished: bool,
}

impl<'conn, I> Iterator for SaveDialog<'conn, I>
where
    I: Iterator<Item = Message>,
{
    type Item = (Message, Result<(), DialogError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let message = match self.inner.next() {
            Some(message) => message,
            None => {
                let _ = self.conn.execute_batch("COMMIT");
                self.finished = true;
                return None;
            }
        };

        match self.process(&message) {
            Ok(processed) => Some((processed, Ok(()))),
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                self.finished = true;
                Some((message, Err(err)))
            }
        }
    }
}

impl<'conn, I> SaveDialog<'conn, I>
where
    I: Iterator<Item = Message>,
{
    fn process(&mut self, message: &Message) -> Result<Message, DialogError> {
        let mut result = message.clone();

        if let Some(existing_id) = message.persisted_id().map(str::to_string) {
            let stored_parent: Option<Option<String>> = self
                .conn
                .query_row(
                    "SELECT parent_id FROM messages WHERE id = ?1",
                    params![existing_id],
                    |row| row.get(0),
                )
                .optional()?;

            let stored_parent = stored_parent.ok_or_else(|| DialogError::NotFound {
                id: existing_id.clone(),
            })?;

            let expected = if self.first { None } else { self.prev_id.clone() };
            if stored_parent != expected {
                return Err(DialogError::ParentChainMismatch {
                    id: existing_id,
                    expected,
                    actual: stored_parent,
                });
            }

            result
                .extra_fields
                .insert(FIELD_MESSAGE_ID.to_string(), serde_json::json!(existing_id));
            if let Some(parent) = &stored_parent {
                result.extra_fields.insert(
                    FIELD_MESSAGE_PARENT_ID.to_string(),
                    serde_json::json!(parent),
                );
            }
            self.prev_id = Some(existing_id);
        } else {
            let conn = &self.conn;
            let new_id = generate_unique_id(|candidate| {
                let exists: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM messages WHERE id = ?1",
                        params![candidate],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(exists.is_some())
            })?;

            let parent_id = self.prev_id.clone();
            let title = message.title().map(str::to_string);
            let created_at = chrono::Utc::now().timestamp();

            self.conn.execute(
                "INSERT INTO messages (id, parent_id, title, role, tool_result_error, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new_id,
                    parent_id,
                    title,
                    message.role.as_str(),
                    message.tool_result_error as i64,
                    created_at
                ],
            )?;

            for (index, block) in message.blocks.iter().enumerate() {
                let extra_fields_json = block
                    .extra_fields
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(|err| DialogError::CorruptedData {
                        id: new_id.clone(),
                        reason: format!("block extra_fields not serializable: {err}"),
                    })?;
                self.conn.execute(
                    "INSERT INTO blocks (message_id, sequence_order, id, block_type, modality, mime_type, content, extra_fields)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        new_id,
                        index as i64,
                        block.id,
                        block.block_type,
                        block.modality,
                        block.mime_type,
                        block.content,
                        extra_fields_json
                    ],
                )?;
            }

            result
                .extra_fields
                .insert(FIELD_MESSAGE_ID.to_string(), serde_json::json!(new_id));
            result.extra_fields.insert(
                FIELD_MESSAGE_CREATED_AT.to_string(),
                serde_json::json!(created_at),
            );
            if let Some(parent) = &parent_id {
                result.extra_fields.insert(
                    FIELD_MESSAGE_PARENT_ID.to_string(),
                    serde_json::json!(parent),
                );
            }
            self.prev_id = Some(new_id);
        }

        self.first = false;
        Ok(result)
    }
}

impl<'conn, I> Drop for SaveDialog<'conn, I> {
    fn drop(&mut self) {
        if !self.finished {
            // Consumer abandoned the iterator before exhaustion: commit
            // whatever was already written rather than losing it.
            let _ = self.conn.execute_batch("COMMIT");
            self.finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn invalid_role_in_storage_surfaces_as_corrupted_data() {
        let store = DialogStore::open_in_memory().expect("open");
        let saved: Vec<_> = store.save_dialog(vec![Message::new(Role::User)]).collect();
        let id = saved[0].0.persisted_id().expect("id").to_string();

        store
            .lock()
            .execute(
                "UPDATE messages SET role = 'bogus' WHERE id = ?1",
                params![id],
            )
            .expect("corrupt role");

        let result = store.get_messages(&[id]);
        assert!(matches!(result, Err(DialogError::CorruptedData { .. })));
    }
}
