use std::sync::Arc;

use anyhow::Result;
use inkdrop::pipeline::SortKey;
use inkdrop::{
    Attachment, NoteDraft, NoteService, NoteUpdate, NotebookDraft, NotebookId, SqliteStore, Store,
};
use tempfile::TempDir;
use time::macros::datetime;

fn open(dir: &TempDir) -> Result<NoteService> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(dir.path().join("notes.db"))?);
    Ok(NoteService::new(store))
}

#[test]
fn notes_survive_reopening_the_database() -> Result<()> {
    // Arrange: write a note through one service
    let dir = TempDir::new()?;
    let id = {
        let service = open(&dir)?;
        let note = service.create(
            NoteDraft::titled("Trip plan")
                .with_content("<p>pack <strong>boots</strong></p>")
                .with_tags(["travel", "todo"]),
        )?;
        service.toggle_pin(note.id)?;
        note.id
    };

    // Act: reopen the same file
    let service = open(&dir)?;
    let note = service.get_by_id(id)?;

    // Assert: every field made it to disk
    assert_eq!(note.title, "Trip plan");
    assert_eq!(note.content, "<p>pack <strong>boots</strong></p>");
    assert_eq!(note.tags.as_slice(), &["travel", "todo"]);
    assert!(note.is_pinned);
    assert_eq!(service.notebooks().get_by_id(NotebookId::FALLBACK)?.note_count, 1);

    Ok(())
}

#[test]
fn attachments_are_stored_and_searchable() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(&dir)?;
    let receipt = Attachment {
        id: 7,
        name: "receipt-march.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        size: 2048,
        url: "file:///tmp/receipt-march.pdf".to_string(),
        uploaded_at: datetime!(2024-03-01 09:30 UTC),
    };
    let note = service.create(NoteDraft::titled("Expenses"))?;

    let update = NoteUpdate {
        attachments: Some(vec![receipt.clone()]),
        ..NoteUpdate::default()
    };
    service.update(note.id, &update)?;

    let found = service.search("RECEIPT");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].attachments, vec![receipt]);

    Ok(())
}

#[test]
fn moving_a_note_moves_its_count() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(&dir)?;
    let work = service
        .notebooks()
        .create(NotebookDraft::named("Work"))?;
    let note = service.create(NoteDraft::titled("Standup"))?;

    let moved = service.update(
        note.id,
        &NoteUpdate {
            notebook_id: Some(work.id),
            ..NoteUpdate::default()
        },
    )?;

    assert_eq!(moved.notebook_id, work.id);
    assert_eq!(service.notebooks().get_by_id(NotebookId::FALLBACK)?.note_count, 0);
    assert_eq!(service.notebooks().get_by_id(work.id)?.note_count, 1);
    assert_eq!(service.get_by_notebook(work.id).len(), 1);

    Ok(())
}

#[test]
fn deleting_a_note_decrements_and_reports_missing_afterwards() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(&dir)?;
    let note = service.create(NoteDraft::titled("Scratch"))?;

    assert!(service.delete(note.id)?);

    assert!(service.get_by_id(note.id).unwrap_err().is_not_found());
    assert!(service.delete(note.id).unwrap_err().is_not_found());
    assert_eq!(service.notebooks().get_by_id(NotebookId::FALLBACK)?.note_count, 0);

    Ok(())
}

#[test]
fn recent_and_pinned_follow_modification_order() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(&dir)?;
    let first = service.create(NoteDraft::titled("first"))?;
    let second = service.create(NoteDraft::titled("second"))?;
    service.create(NoteDraft::titled("third"))?;

    // Touching older notes moves them ahead of the untouched one.
    service.update(second.id, &NoteUpdate::content("<p>edited</p>"))?;
    service.update(first.id, &NoteUpdate::content("<p>edited</p>"))?;

    let recent: Vec<_> = service.get_recent(2).into_iter().map(|n| n.id).collect();
    assert_eq!(recent, vec![first.id, second.id]);

    service.toggle_pin(second.id)?;
    let pinned: Vec<_> = service.get_pinned().into_iter().map(|n| n.id).collect();
    assert_eq!(pinned, vec![second.id]);

    Ok(())
}

#[test]
fn tag_summary_counts_each_note_once() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(&dir)?;
    service.create(NoteDraft::titled("a").with_tags(["rust", "cli"]))?;
    service.create(NoteDraft::titled("b").with_tags(["rust"]))?;

    let summary = service.tag_summary();

    let rust = summary.iter().find(|t| t.name == "rust").expect("rust tag");
    let cli = summary.iter().find(|t| t.name == "cli").expect("cli tag");
    assert_eq!(rust.count, 2);
    assert_eq!(cli.count, 1);

    Ok(())
}

#[test]
fn list_view_sorts_stored_notes() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(&dir)?;
    service.create(NoteDraft::titled("banana"))?;
    service.create(NoteDraft::titled("Apple"))?;
    service.create(NoteDraft::titled("cherry"))?;

    let mut view = inkdrop::pipeline::ListView::new(service.list());
    view.set_sort(SortKey::Title);
    let titles: Vec<_> = view.visible().iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple", "banana", "cherry"]);

    view.set_query("an");
    let titles: Vec<_> = view.visible().iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["banana"]);

    Ok(())
}

#[test]
fn attached_files_are_stored_with_the_note() -> Result<()> {
    let dir = TempDir::new()?;
    let photo = dir.path().join("summit.jpg");
    let map = dir.path().join("route.pdf");
    std::fs::write(&photo, b"jpeg bytes")?;
    std::fs::write(&map, b"pdf bytes")?;
    let note = {
        let service = open(&dir)?;
        let note = service.create(NoteDraft::titled("Hike"))?;
        let attached = service.attach(note.id, &[&photo, &map])?;
        assert_eq!(attached.added.len(), 2);
        note
    };

    let stored = open(&dir)?.get_by_id(note.id)?;

    assert_eq!(stored.images.len(), 1);
    assert_eq!(stored.images[0].mime_type, "image/jpeg");
    assert_eq!(stored.attachments.len(), 1);
    assert_eq!(stored.attachments[0].name, "route.pdf");
    assert!(stored.content.contains(r#"alt="summit.jpg""#));

    Ok(())
}
