mod wire;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Store, StoreError, next_timestamp};
use crate::models::{
    NewNote, NewNotebook, Note, NoteId, NoteUpdate, Notebook, NotebookId, NotebookUpdate,
};
use crate::record::{BatchEnvelope, Condition, FetchParams, OrderBy, RecordClient, RecordResult};

const NOTES_TABLE: &str = "notes";
const NOTEBOOKS_TABLE: &str = "notebooks";
const PAGE_SIZE: usize = 100;

/// Store backed by the remote record API.
///
/// All translation between the canonical models and the API's column names
/// happens here; the rest of the crate only sees `Note` and `Notebook`.
///
/// A `get` that succeeds with no `data` means the record does not exist. An
/// envelope with `success: false` is a transport failure.
pub struct RemoteStore<C> {
    client: C,
}

impl<C: RecordClient> RemoteStore<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetches every page matching `params`.
    fn fetch_all(&self, table: &str, params: FetchParams) -> Result<Vec<Value>, StoreError> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let page = params.clone().page(PAGE_SIZE, offset);
            let envelope = self.client.fetch(table, &page)?;
            if !envelope.success {
                return Err(StoreError::transport(envelope.failure_message()));
            }

            let batch = envelope.data.unwrap_or_default();
            let received = batch.len();
            records.extend(batch);

            if received < PAGE_SIZE {
                return Ok(records);
            }
            offset += received;
        }
    }

    fn fetch_one(&self, table: &str, id: i64, fields: &[&str]) -> Result<Option<Value>, StoreError> {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let envelope = self.client.get_by_id(table, id, &fields)?;
        if !envelope.success {
            return Err(StoreError::transport(envelope.failure_message()));
        }
        Ok(envelope.data.filter(|data| !data.is_null()))
    }

    fn write_notebook(&self, notebook: Notebook) -> Result<Notebook, StoreError> {
        let record = wire::encode_notebook(&notebook);
        let results = accepted(self.client.update(NOTEBOOKS_TABLE, vec![record])?)?;
        match first_record(results) {
            Some(record) => wire::decode_notebook(record),
            None => Ok(notebook),
        }
    }

    fn note_params() -> FetchParams {
        FetchParams::new()
            .fields(wire::NOTE_FIELDS)
            .order_by(OrderBy::descending(wire::MODIFIED_ON))
    }
}

/// Fails on an envelope-level failure or on any rejected record.
fn accepted(envelope: BatchEnvelope) -> Result<Vec<RecordResult>, StoreError> {
    if !envelope.success {
        return Err(StoreError::transport(envelope.failure_message()));
    }
    let failures = envelope.failures();
    if !failures.is_empty() {
        warn!(failed = failures.len(), "record API rejected part of a batch");
        return Err(StoreError::PartialBatch { failures });
    }
    Ok(envelope.results)
}

/// The record echoed back for the first entry of an accepted batch.
fn first_record(results: Vec<RecordResult>) -> Option<Value> {
    results
        .into_iter()
        .next()
        .and_then(|r| r.data)
        .filter(|data| !data.is_null())
}

impl<C: RecordClient> Store for RemoteStore<C> {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.fetch_all(NOTES_TABLE, Self::note_params())?
            .into_iter()
            .map(wire::decode_note)
            .collect()
    }

    fn get_note(&self, id: NoteId) -> Result<Option<Note>, StoreError> {
        self.fetch_one(NOTES_TABLE, id.get(), &wire::NOTE_FIELDS)?
            .map(wire::decode_note)
            .transpose()
    }

    fn insert_note(&self, note: NewNote) -> Result<Note, StoreError> {
        let record = wire::encode_new_note(&note)?;
        let results = accepted(self.client.create(NOTES_TABLE, vec![record])?)?;

        let created = first_record(results)
            .ok_or_else(|| StoreError::transport("create returned no record"))?;
        let created = wire::decode_note(created)?;
        debug!(note_id = %created.id, "created remote note");
        Ok(created)
    }

    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> Result<Option<Note>, StoreError> {
        let Some(mut note) = self.get_note(id)? else {
            return Ok(None);
        };
        let previous = note.updated_at;
        update.apply_to(&mut note);

        let results = accepted(self.client.update(NOTES_TABLE, vec![wire::encode_note(&note)?])?)?;

        let mut updated = match first_record(results) {
            Some(record) => wire::decode_note(record)?,
            None => note,
        };
        if updated.updated_at <= previous {
            updated.updated_at = next_timestamp(previous);
        }
        Ok(Some(updated))
    }

    fn delete_note(&self, id: NoteId) -> Result<bool, StoreError> {
        if self.fetch_one(NOTES_TABLE, id.get(), &["Id"])?.is_none() {
            return Ok(false);
        }
        accepted(self.client.delete(NOTES_TABLE, &[id.get()])?)?;
        Ok(true)
    }

    fn notes_in_notebook(&self, notebook_id: NotebookId) -> Result<Vec<Note>, StoreError> {
        let params =
            Self::note_params().filter(Condition::equal_to(wire::NOTEBOOK_ID, notebook_id.get()));
        self.fetch_all(NOTES_TABLE, params)?
            .into_iter()
            .map(wire::decode_note)
            .collect()
    }

    fn list_notebooks(&self) -> Result<Vec<Notebook>, StoreError> {
        let params = FetchParams::new()
            .fields(wire::NOTEBOOK_FIELDS)
            .order_by(OrderBy::ascending("Id"));
        self.fetch_all(NOTEBOOKS_TABLE, params)?
            .into_iter()
            .map(wire::decode_notebook)
            .collect()
    }

    fn get_notebook(&self, id: NotebookId) -> Result<Option<Notebook>, StoreError> {
        self.fetch_one(NOTEBOOKS_TABLE, id.get(), &wire::NOTEBOOK_FIELDS)?
            .map(wire::decode_notebook)
            .transpose()
    }

    fn insert_notebook(&self, notebook: NewNotebook) -> Result<Notebook, StoreError> {
        let record = wire::encode_new_notebook(&notebook);
        let results = accepted(self.client.create(NOTEBOOKS_TABLE, vec![record])?)?;

        let created = first_record(results)
            .ok_or_else(|| StoreError::transport("create returned no record"))?;
        wire::decode_notebook(created)
    }

    fn update_notebook(
        &self,
        id: NotebookId,
        update: &NotebookUpdate,
    ) -> Result<Option<Notebook>, StoreError> {
        let Some(mut notebook) = self.get_notebook(id)? else {
            return Ok(None);
        };
        update.apply_to(&mut notebook);
        self.write_notebook(notebook).map(Some)
    }

    fn delete_notebook(&self, id: NotebookId) -> Result<bool, StoreError> {
        if self.fetch_one(NOTEBOOKS_TABLE, id.get(), &["Id"])?.is_none() {
            return Ok(false);
        }
        accepted(self.client.delete(NOTEBOOKS_TABLE, &[id.get()])?)?;
        Ok(true)
    }

    fn adjust_note_count(
        &self,
        id: NotebookId,
        delta: i64,
    ) -> Result<Option<Notebook>, StoreError> {
        let Some(mut notebook) = self.get_notebook(id)? else {
            return Ok(None);
        };
        notebook.note_count = notebook.adjusted_count(delta);
        self.write_notebook(notebook).map(Some)
    }
}
