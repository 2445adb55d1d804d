//! In-memory page: the form controls, output elements, and tables the
//! handlers in [`crate::bridge`] read from and render into.
//!
//! Elements are addressed by [`Element`], whose ids match the markup
//! contract (`sampleSubject`, `factsTable`, ...).

use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::models::{Fact, Preference, UploadFile};
use crate::table::EditableTable;

/// What an element is, which decides which accessors apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Button,
    TextInput,
    Checkbox,
    FileInput,
    Text,
    Audio,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    LoadSample,
    SampleSubject,
    SampleStatus,
    IngestFiles,
    FilesSubject,
    FilesInput,
    FilesStatus,
    IngestUrls,
    UrlsSubject,
    UrlsInput,
    UrlsStatus,
    Send,
    ChatSubject,
    Message,
    VoiceId,
    VoiceToggle,
    Reply,
    Citations,
    Audio,
    FactsTable,
    PrefsTable,
    AddFact,
    AddPref,
    LoadFacts,
    FactsSubject,
    SaveFacts,
    FactsStatus,
}

impl Element {
    pub const ALL: [Element; 27] = [
        Element::LoadSample,
        Element::SampleSubject,
        Element::SampleStatus,
        Element::IngestFiles,
        Element::FilesSubject,
        Element::FilesInput,
        Element::FilesStatus,
        Element::IngestUrls,
        Element::UrlsSubject,
        Element::UrlsInput,
        Element::UrlsStatus,
        Element::Send,
        Element::ChatSubject,
        Element::Message,
        Element::VoiceId,
        Element::VoiceToggle,
        Element::Reply,
        Element::Citations,
        Element::Audio,
        Element::FactsTable,
        Element::PrefsTable,
        Element::AddFact,
        Element::AddPref,
        Element::LoadFacts,
        Element::FactsSubject,
        Element::SaveFacts,
        Element::FactsStatus,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Element::LoadSample => "loadSample",
            Element::SampleSubject => "sampleSubject",
            Element::SampleStatus => "sampleStatus",
            Element::IngestFiles => "ingestFiles",
            Element::FilesSubject => "filesSubject",
            Element::FilesInput => "filesInput",
            Element::FilesStatus => "filesStatus",
            Element::IngestUrls => "ingestUrls",
            Element::UrlsSubject => "urlsSubject",
            Element::UrlsInput => "urlsInput",
            Element::UrlsStatus => "urlsStatus",
            Element::Send => "send",
            Element::ChatSubject => "chatSubject",
            Element::Message => "message",
            Element::VoiceId => "voiceId",
            Element::VoiceToggle => "voiceToggle",
            Element::Reply => "reply",
            Element::Citations => "citations",
            Element::Audio => "audio",
            Element::FactsTable => "factsTable",
            Element::PrefsTable => "prefsTable",
            Element::AddFact => "addFact",
            Element::AddPref => "addPref",
            Element::LoadFacts => "loadFacts",
            Element::FactsSubject => "factsSubject",
            Element::SaveFacts => "saveFacts",
            Element::FactsStatus => "factsStatus",
        }
    }

    pub fn from_id(id: &str) -> Option<Element> {
        Element::ALL.into_iter().find(|e| e.id() == id)
    }

    pub fn kind(self) -> ElementKind {
        use Element::*;
        match self {
            LoadSample | IngestFiles | IngestUrls | Send | AddFact | AddPref | LoadFacts
            | SaveFacts => ElementKind::Button,
            SampleSubject | FilesSubject | UrlsSubject | UrlsInput | ChatSubject | Message
            | VoiceId | FactsSubject => ElementKind::TextInput,
            VoiceToggle => ElementKind::Checkbox,
            FilesInput => ElementKind::FileInput,
            SampleStatus | FilesStatus | UrlsStatus | Reply | Citations | FactsStatus => {
                ElementKind::Text
            }
            Audio => ElementKind::Audio,
            FactsTable | PrefsTable => ElementKind::Table,
        }
    }
}

/// The `<audio>` element: a source and whether it is displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioElement {
    pub src: Option<String>,
    pub visible: bool,
}

impl AudioElement {
    pub fn show(&mut self, src: impl Into<String>) {
        self.src = Some(src.into());
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.src = None;
        self.visible = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    values: HashMap<Element, String>,
    texts: HashMap<Element, String>,
    voice_toggle: bool,
    files: Vec<UploadFile>,
    pub audio: AudioElement,
    pub facts: EditableTable<Fact>,
    pub prefs: EditableTable<Preference>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a text input's value.
    pub fn set_value(&mut self, element: Element, value: impl Into<String>) -> Result<()> {
        expect_kind(element, ElementKind::TextInput)?;
        self.values.insert(element, value.into());
        Ok(())
    }

    /// A text input's value; empty when never set.
    pub fn value(&self, element: Element) -> &str {
        self.values.get(&element).map(String::as_str).unwrap_or("")
    }

    /// Value of `element`, or `fallback` when the input is empty.
    pub fn value_or(&self, element: Element, fallback: &str) -> String {
        match self.value(element) {
            "" => fallback.to_string(),
            v => v.to_string(),
        }
    }

    pub fn set_text(&mut self, element: Element, text: impl Into<String>) -> Result<()> {
        expect_kind(element, ElementKind::Text)?;
        self.texts.insert(element, text.into());
        Ok(())
    }

    /// Writes handler output into a text element known to be one.
    pub(crate) fn render(&mut self, element: Element, text: impl Into<String>) {
        debug_assert_eq!(element.kind(), ElementKind::Text);
        self.texts.insert(element, text.into());
    }

    /// Rendered text of an output element; empty until something renders it.
    pub fn text(&self, element: Element) -> &str {
        self.texts.get(&element).map(String::as_str).unwrap_or("")
    }

    pub fn set_voice(&mut self, checked: bool) {
        self.voice_toggle = checked;
    }

    pub fn voice(&self) -> bool {
        self.voice_toggle
    }

    pub fn select_files(&mut self, files: Vec<UploadFile>) {
        self.files = files;
    }

    pub fn selected_files(&self) -> &[UploadFile] {
        &self.files
    }
}

fn expect_kind(element: Element, kind: ElementKind) -> Result<()> {
    if element.kind() != kind {
        bail!(
            "element '{}' is a {:?}, not a {:?}",
            element.id(),
            element.kind(),
            kind
        );
    }
    Ok(())
}
