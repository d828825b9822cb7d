//! RemoteStore and the service facade over an in-process fake of the record
//! API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use inkdrop::record::{
    BatchEnvelope, Envelope, FetchParams, Operator, RecordClient, RecordError, RecordResult,
};
use inkdrop::{
    NoteDraft, NoteId, NoteService, NoteUpdate, NotebookDraft, NotebookId, RemoteStore,
    ServiceError, Store, StoreError,
};
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Default)]
struct Tables {
    rows: BTreeMap<String, BTreeMap<i64, Map<String, Value>>>,
    next_id: i64,
    fetch_calls: usize,
}

/// Holds records as the API would and answers with its envelopes.
#[derive(Default)]
struct FakeRecordApi {
    tables: Mutex<Tables>,
    /// Titles longer than this are rejected per record.
    max_title: Option<usize>,
    /// Every call reports `success: false`.
    down: bool,
}

fn now() -> Value {
    Value::String(OffsetDateTime::now_utc().format(&Rfc3339).unwrap())
}

fn failed<T>(message: &str) -> Envelope<T> {
    Envelope {
        success: false,
        data: None,
        message: Some(message.to_string()),
    }
}

impl FakeRecordApi {
    fn with_notebook(self, id: i64, name: &str) -> Self {
        let record = json!({
            "Id": id, "name_c": name, "color_c": "#000000", "note_count_c": 0,
            "CreatedOn": "2024-01-01T00:00:00Z",
        });
        {
            let mut tables = self.tables.lock().unwrap();
            tables.next_id = tables.next_id.max(id);
            tables
                .rows
                .entry("notebooks".to_string())
                .or_default()
                .insert(id, record.as_object().unwrap().clone());
        }
        self
    }

    fn with_notes(self, count: usize) -> Self {
        {
            let mut tables = self.tables.lock().unwrap();
            for i in 0..count {
                tables.next_id += 1;
                let id = tables.next_id;
                let record = json!({
                    "Id": id, "title_c": format!("Note {i}"), "content_c": "",
                    "notebook_id_c": 1, "tags_c": "", "is_pinned_c": false,
                    "CreatedOn": "2024-01-01T00:00:00Z", "ModifiedOn": "2024-01-01T00:00:00Z",
                });
                tables
                    .rows
                    .entry("notes".to_string())
                    .or_default()
                    .insert(id, record.as_object().unwrap().clone());
            }
        }
        self
    }

    fn rejects(&self, record: &Value) -> Option<String> {
        let limit = self.max_title?;
        let title = record.get("title_c")?.as_str()?;
        (title.chars().count() > limit).then(|| format!("title_c exceeds {limit} characters"))
    }

    fn fetch_calls(&self) -> usize {
        self.tables.lock().unwrap().fetch_calls
    }

    fn raw(&self, table: &str, id: i64) -> Option<Map<String, Value>> {
        self.tables.lock().unwrap().rows.get(table)?.get(&id).cloned()
    }

    fn batch(&self, table: &str, records: Vec<Value>, create: bool) -> BatchEnvelope {
        let mut tables = self.tables.lock().unwrap();
        let results = records
            .into_iter()
            .map(|record| {
                if let Some(message) = self.rejects(&record) {
                    return RecordResult {
                        success: false,
                        data: None,
                        message: Some(message),
                    };
                }
                let mut fields = record.as_object().cloned().unwrap_or_default();
                let id = if create {
                    tables.next_id += 1;
                    fields.insert("Id".to_string(), json!(tables.next_id));
                    fields.insert("CreatedOn".to_string(), now());
                    tables.next_id
                } else {
                    fields["Id"].as_i64().unwrap()
                };
                fields.insert("ModifiedOn".to_string(), now());

                let rows = tables.rows.entry(table.to_string()).or_default();
                let row = rows.entry(id).or_default();
                row.extend(fields);
                RecordResult {
                    success: true,
                    data: Some(Value::Object(row.clone())),
                    message: None,
                }
            })
            .collect();
        BatchEnvelope {
            success: true,
            results,
            message: None,
        }
    }
}

impl RecordClient for FakeRecordApi {
    fn fetch(&self, table: &str, params: &FetchParams) -> Result<Envelope<Vec<Value>>, RecordError> {
        if self.down {
            return Ok(failed("service unavailable"));
        }
        let mut tables = self.tables.lock().unwrap();
        tables.fetch_calls += 1;
        let rows: Vec<Value> = tables
            .rows
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.values())
            .filter(|row| {
                params.conditions.iter().all(|c| {
                    c.operator == Operator::EqualTo && row.get(&c.field_name) == c.values.first()
                })
            })
            .map(|row| Value::Object(row.clone()))
            .collect();
        let paging = params.paging.expect("store always pages");
        let page = rows
            .into_iter()
            .skip(paging.offset)
            .take(paging.limit)
            .collect();
        Ok(Envelope {
            success: true,
            data: Some(page),
            message: None,
        })
    }

    fn get_by_id(&self, table: &str, id: i64, _fields: &[String]) -> Result<Envelope<Value>, RecordError> {
        if self.down {
            return Ok(failed("service unavailable"));
        }
        Ok(Envelope {
            success: true,
            data: self.raw(table, id).map(Value::Object),
            message: None,
        })
    }

    fn create(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError> {
        Ok(self.batch(table, records, true))
    }

    fn update(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError> {
        Ok(self.batch(table, records, false))
    }

    fn delete(&self, table: &str, ids: &[i64]) -> Result<BatchEnvelope, RecordError> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.rows.entry(table.to_string()).or_default();
        let results = ids
            .iter()
            .map(|id| RecordResult {
                success: rows.remove(id).is_some(),
                data: None,
                message: None,
            })
            .collect();
        Ok(BatchEnvelope {
            success: true,
            results,
            message: None,
        })
    }
}

/// Lets a test keep a handle on the fake while the store owns a client.
struct ArcClient(Arc<FakeRecordApi>);

impl RecordClient for ArcClient {
    fn fetch(&self, table: &str, params: &FetchParams) -> Result<Envelope<Vec<Value>>, RecordError> {
        self.0.fetch(table, params)
    }
    fn get_by_id(&self, table: &str, id: i64, fields: &[String]) -> Result<Envelope<Value>, RecordError> {
        self.0.get_by_id(table, id, fields)
    }
    fn create(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError> {
        self.0.create(table, records)
    }
    fn update(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError> {
        self.0.update(table, records)
    }
    fn delete(&self, table: &str, ids: &[i64]) -> Result<BatchEnvelope, RecordError> {
        self.0.delete(table, ids)
    }
}

fn service(api: FakeRecordApi) -> NoteService {
    let store: Arc<dyn Store> = Arc::new(RemoteStore::new(api));
    NoteService::new(store)
}

#[test]
fn create_writes_wire_columns_and_counts() {
    let api = Arc::new(FakeRecordApi::default().with_notebook(1, "Personal"));
    let store = RemoteStore::new(ArcClient(Arc::clone(&api)));
    let service = NoteService::new(Arc::new(store));

    let note = service
        .create(
            NoteDraft::titled("Groceries")
                .with_content("<p>milk</p>")
                .with_tags(["home", "errands", "home"]),
        )
        .unwrap();

    let raw = api.raw("notes", note.id.get()).unwrap();
    assert_eq!(raw["title_c"], "Groceries");
    assert_eq!(raw["tags_c"], "home,errands");
    assert_eq!(raw["images_c"], "[]");
    assert_eq!(note.tags.as_slice(), &["home", "errands"]);
    assert_eq!(raw.get("notebook_id_c"), Some(&json!(1)));

    let notebook = service.notebooks().get_by_id(NotebookId::new(1)).unwrap();
    assert_eq!(notebook.note_count, 1);
}

#[test]
fn missing_record_is_not_found() {
    let service = service(FakeRecordApi::default().with_notebook(1, "Personal"));

    let error = service.get_by_id(NoteId::new(42)).unwrap_err();
    assert!(error.is_not_found());
    assert!(service.delete(NoteId::new(42)).unwrap_err().is_not_found());
    assert!(
        service
            .update(NoteId::new(42), &NoteUpdate::content("x"))
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn rejected_record_is_partial_batch_failure() {
    let service = service(FakeRecordApi {
        max_title: Some(10),
        ..FakeRecordApi::default().with_notebook(1, "Personal")
    });

    let error = service
        .create(NoteDraft::titled("A title that is far too long"))
        .unwrap_err();

    match error {
        ServiceError::PartialBatch { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 0);
            assert!(failures[0].message.contains("title_c"));
        }
        other => panic!("expected partial batch failure, got {other:?}"),
    }
    assert_eq!(
        service
            .notebooks()
            .get_by_id(NotebookId::new(1))
            .unwrap()
            .note_count,
        0
    );
}

#[test]
fn unavailable_api_yields_empty_listings_and_transport_errors() {
    let service = service(FakeRecordApi {
        down: true,
        ..FakeRecordApi::default()
    });

    assert!(service.list().is_empty());
    assert!(service.search("anything").is_empty());
    assert!(service.get_recent(5).is_empty());

    let error = service.get_by_id(NoteId::new(1)).unwrap_err();
    assert!(matches!(
        error,
        ServiceError::Transport(StoreError::Transport { .. })
    ));
}

#[test]
fn listing_reads_every_page() {
    let api = Arc::new(
        FakeRecordApi::default()
            .with_notebook(1, "Personal")
            .with_notes(250),
    );
    let store = RemoteStore::new(ArcClient(Arc::clone(&api)));

    let notes = store.list_notes().unwrap();

    assert_eq!(notes.len(), 250);
    assert_eq!(api.fetch_calls(), 3);
}

#[test]
fn notebook_filter_is_sent_to_the_api() {
    let service = service(
        FakeRecordApi::default()
            .with_notebook(1, "Personal")
            .with_notebook(2, "Work"),
    );
    service
        .create(NoteDraft::titled("home").in_notebook(NotebookId::new(1)))
        .unwrap();
    let work = service
        .create(NoteDraft::titled("office").in_notebook(NotebookId::new(2)))
        .unwrap();

    let notes = service.get_by_notebook(NotebookId::new(2));

    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, work.id);
}

#[test]
fn toggle_pin_round_trips_and_advances_updated_at() {
    let service = service(FakeRecordApi::default().with_notebook(1, "Personal"));
    let note = service.create(NoteDraft::titled("pin me")).unwrap();

    let pinned = service.toggle_pin(note.id).unwrap();
    let unpinned = service.toggle_pin(note.id).unwrap();

    assert!(pinned.is_pinned);
    assert!(!unpinned.is_pinned);
    assert!(pinned.updated_at > note.updated_at);
    assert!(unpinned.updated_at > pinned.updated_at);
}

#[test]
fn notebook_crud_and_count_floor() {
    let service = service(FakeRecordApi::default());

    let notebook = service
        .notebooks()
        .create(NotebookDraft::named("Ideas").with_color("#123456"))
        .unwrap();
    assert_eq!(notebook.note_count, 0);
    assert_eq!(notebook.color, "#123456");

    let lowered = service
        .notebooks()
        .update_note_count(notebook.id, -3)
        .unwrap();
    assert_eq!(lowered.note_count, 0);

    assert!(service.notebooks().delete(notebook.id).unwrap());
    assert!(
        service
            .notebooks()
            .get_by_id(notebook.id)
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn comma_in_a_tag_reads_back_the_same_on_every_backend() {
    let draft = || NoteDraft::titled("t").with_tags(["a,b", "c"]);
    let remote = service(FakeRecordApi::default().with_notebook(1, "Personal"));
    let memory_store: Arc<dyn Store> = Arc::new(inkdrop::MemoryStore::new());
    let memory = NoteService::new(memory_store);

    let created = remote.create(draft()).unwrap();
    let fetched = remote.get_by_id(created.id).unwrap();
    let local = memory.create(draft()).unwrap();

    assert_eq!(created.tags.as_slice(), &["a", "b", "c"]);
    assert_eq!(fetched.tags, created.tags);
    assert_eq!(local.tags, created.tags);
}
