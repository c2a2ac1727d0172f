use crate::application::clock::{Clock, IdGenerator};
use crate::application::collections::CollectionService;
use crate::domain::models::Note;
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::image_picker::{ImagePicker, PickedImage};
use std::sync::Arc;

const DATE_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";
const UNTITLED: &str = "Untitled";

/// Fields submitted from the note editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

pub struct NoteService {
    collection: CollectionService<Note>,
    ids: Arc<IdGenerator>,
    clock: Clock,
}

impl NoteService {
    pub fn mount(
        store: CollectionStore,
        log: Arc<CommandLog>,
        ids: Arc<IdGenerator>,
        clock: Clock,
    ) -> Self {
        let collection = CollectionService::<Note>::mount(StorageKey::Notes, store, log);
        for note in collection.items() {
            ids.observe(&note.id);
        }
        Self {
            collection,
            ids,
            clock,
        }
    }

    /// Re-reads the collection from the store.
    pub fn reload(&mut self) {
        self.collection.reload();
    }

    pub fn notes(&self) -> &[Note] {
        self.collection.items()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.collection.find(id)
    }

    pub fn add(
        &mut self,
        title: &str,
        content: &str,
        image: Option<String>,
    ) -> Result<Note, InfraError> {
        require_title_and_content(title, content)?;
        let note = Note {
            id: self.ids.next_id(),
            title: title.to_string(),
            content: content.to_string(),
            date: self.stamp(),
            image,
        };
        self.collection.append(note.clone())?;
        Ok(note)
    }

    /// Edits title and content. A missing `image` keeps the current one.
    pub fn update(
        &mut self,
        id: &str,
        title: &str,
        content: &str,
        image: Option<String>,
    ) -> Result<Option<Note>, InfraError> {
        require_title_and_content(title, content)?;
        let date = self.stamp();
        self.collection.update(id, |note| {
            note.title = title.to_string();
            note.content = content.to_string();
            note.date = date;
            if image.is_some() {
                note.image = image;
            }
        })
    }

    /// Saves the detail editor. Nothing is written when both title and
    /// content are blank; otherwise the note is replaced by id or appended.
    pub fn save_detail(&mut self, draft: NoteDraft) -> Result<Option<Note>, InfraError> {
        if draft.title.trim().is_empty() && draft.content.trim().is_empty() {
            return Ok(None);
        }
        let id = draft
            .id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| self.ids.next_id());
        let title = draft.title.trim();
        let note = Note {
            id,
            title: if title.is_empty() {
                UNTITLED.to_string()
            } else {
                title.to_string()
            },
            content: draft.content.trim().to_string(),
            date: self.stamp(),
            image: draft.image.filter(|uri| !uri.trim().is_empty()),
        };
        self.collection.upsert(note.clone())?;
        Ok(Some(note))
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, InfraError> {
        self.collection.remove(id)
    }

    pub fn search(&self, query: &str) -> Vec<Note> {
        self.notes()
            .iter()
            .filter(|note| note.matches(query))
            .cloned()
            .collect()
    }

    /// Runs the picker and, unless cancelled, stores the URI on the note.
    pub fn attach_image(
        &mut self,
        id: &str,
        picker: &dyn ImagePicker,
    ) -> Result<Option<Note>, InfraError> {
        if !self.collection.contains(id) {
            return Ok(None);
        }
        match picker.pick_image()? {
            PickedImage::Cancelled => Ok(self.get(id).cloned()),
            PickedImage::Picked(uri) => self.collection.update(id, |note| note.image = Some(uri)),
        }
    }

    pub fn remove_image(&mut self, id: &str) -> Result<Option<Note>, InfraError> {
        self.collection.update(id, |note| note.image = None)
    }

    fn stamp(&self) -> String {
        self.clock.local_now().format(DATE_FORMAT).to_string()
    }
}

fn require_title_and_content(title: &str, content: &str) -> Result<(), InfraError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(InfraError::InvalidConfig(
            "title and content must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::test_support::ManualClock;
    use crate::application::collections::test_support::MemoryHarness;
    use chrono_tz::Tz;

    struct FixedPicker(PickedImage);

    impl ImagePicker for FixedPicker {
        fn pick_image(&self) -> Result<PickedImage, InfraError> {
            Ok(self.0.clone())
        }
    }

    fn service(harness: &MemoryHarness, manual: &ManualClock) -> NoteService {
        let clock = manual.clock(Tz::UTC);
        NoteService::mount(
            harness.store.clone(),
            harness.log.clone(),
            Arc::new(IdGenerator::new(clock.clone())),
            clock,
        )
    }

    #[test]
    fn add_requires_title_and_content() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let mut notes = service(&harness, &manual);
        assert!(notes.add("Title", " ", None).is_err());
        let note = notes.add("Biology", "Cells", None).expect("add");
        assert_eq!(note.date, "10/19/2026, 09:00:00 AM");
    }

    #[test]
    fn update_refreshes_date_and_keeps_image_when_not_given() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let mut notes = service(&harness, &manual);
        let note = notes
            .add("Biology", "Cells", Some("file:///a.png".to_string()))
            .expect("add");

        manual.set("2026-10-19T10:30:00Z");
        let updated = notes
            .update(&note.id, "Biology 2", "Mitosis", None)
            .expect("update")
            .expect("present");
        assert_eq!(updated.title, "Biology 2");
        assert_eq!(updated.image.as_deref(), Some("file:///a.png"));
        assert_eq!(updated.date, "10/19/2026, 10:30:00 AM");
    }

    #[test]
    fn save_detail_skips_blank_and_defaults_title() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let mut notes = service(&harness, &manual);

        let skipped = notes
            .save_detail(NoteDraft {
                title: "  ".to_string(),
                content: "\n".to_string(),
                ..NoteDraft::default()
            })
            .expect("save blank");
        assert!(skipped.is_none());
        assert!(harness.store.keys().expect("keys").is_empty());

        let saved = notes
            .save_detail(NoteDraft {
                content: "  loose thoughts  ".to_string(),
                ..NoteDraft::default()
            })
            .expect("save")
            .expect("written");
        assert_eq!(saved.title, "Untitled");
        assert_eq!(saved.content, "loose thoughts");

        let replaced = notes
            .save_detail(NoteDraft {
                id: Some(saved.id.clone()),
                title: "Ideas".to_string(),
                content: "more".to_string(),
                image: None,
            })
            .expect("save again")
            .expect("written");
        assert_eq!(replaced.id, saved.id);
        assert_eq!(notes.notes().len(), 1);
        assert_eq!(notes.notes()[0].title, "Ideas");
    }

    #[test]
    fn search_matches_title_or_content() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let mut notes = service(&harness, &manual);
        notes.add("Physics", "Newton laws", None).expect("add");
        notes.add("Chemistry", "newtonian fluids", None).expect("add");
        notes.add("History", "Rome", None).expect("add");
        assert_eq!(notes.search("NEWTON").len(), 2);
        assert_eq!(notes.search("rome").len(), 1);
    }

    #[test]
    fn attach_image_respects_cancellation() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let mut notes = service(&harness, &manual);
        let note = notes.add("Art", "Sketch", None).expect("add");

        let cancelled = notes
            .attach_image(&note.id, &FixedPicker(PickedImage::Cancelled))
            .expect("attach cancelled")
            .expect("present");
        assert_eq!(cancelled.image, None);

        let picked = notes
            .attach_image(
                &note.id,
                &FixedPicker(PickedImage::Picked("file:///sketch.png".to_string())),
            )
            .expect("attach")
            .expect("present");
        assert_eq!(picked.image.as_deref(), Some("file:///sketch.png"));

        let cleared = notes.remove_image(&note.id).expect("remove").expect("present");
        assert_eq!(cleared.image, None);
        assert!(notes
            .attach_image("missing", &FixedPicker(PickedImage::Cancelled))
            .expect("attach missing")
            .is_none());
    }

    #[test]
    fn delete_removes_note() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let mut notes = service(&harness, &manual);
        let note = notes.add("Temp", "x", None).expect("add");
        assert!(notes.delete(&note.id).expect("delete"));
        assert!(notes.get(&note.id).is_none());
    }
}
