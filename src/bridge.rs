//! Form handlers.
//!
//! [`FormBridge`] binds each button on the [`Page`] to one round trip:
//! read the form's inputs, send the request, render the response. Handlers
//! share nothing but the page, and the page lock is held only while reading
//! inputs or rendering, never across a request, so overlapping handlers
//! interleave the way event callbacks do.
//!
//! | Trigger | Request | Renders into |
//! |---------|---------|--------------|
//! | `loadSample` | `POST /ingest/sample` | `sampleStatus` |
//! | `ingestFiles` | `POST /ingest/files` | `filesStatus` |
//! | `ingestUrls` | `POST /ingest/urls` | `urlsStatus` |
//! | `send` | `POST /chat` | `reply`, `citations`, `audio` |
//! | `loadFacts` | `GET /facts/{id}` | `factsTable`, `prefsTable`, `factsStatus` |
//! | `saveFacts` | `POST /facts/{id}` | `factsStatus` |
//! | `addFact` / `addPref` | none | `factsTable` / `prefsTable` |
//!
//! A failed request renders `Error: <reason>` into the form's status element
//! and is also returned to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{ClientError, ClientResult, MirrorClient};
use crate::config::{Config, SubjectDefaults};
use crate::models::{ChatReply, ChatRequest, Fact, FactsDocument, Preference, SaveFactsRequest, SaveFactsResponse};
use crate::page::{Element, Page};
use crate::table::RowId;

/// A clickable control on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    LoadSample,
    IngestFiles,
    IngestUrls,
    Send,
    AddFact,
    AddPref,
    LoadFacts,
    SaveFacts,
}

impl Trigger {
    pub fn element(self) -> Element {
        match self {
            Trigger::LoadSample => Element::LoadSample,
            Trigger::IngestFiles => Element::IngestFiles,
            Trigger::IngestUrls => Element::IngestUrls,
            Trigger::Send => Element::Send,
            Trigger::AddFact => Element::AddFact,
            Trigger::AddPref => Element::AddPref,
            Trigger::LoadFacts => Element::LoadFacts,
            Trigger::SaveFacts => Element::SaveFacts,
        }
    }

    pub fn from_element(element: Element) -> Option<Trigger> {
        Some(match element {
            Element::LoadSample => Trigger::LoadSample,
            Element::IngestFiles => Trigger::IngestFiles,
            Element::IngestUrls => Trigger::IngestUrls,
            Element::Send => Trigger::Send,
            Element::AddFact => Trigger::AddFact,
            Element::AddPref => Trigger::AddPref,
            Element::LoadFacts => Trigger::LoadFacts,
            Element::SaveFacts => Trigger::SaveFacts,
            _ => return None,
        })
    }
}

/// Result of a facts load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The response was rendered into the tables.
    Applied(FactsDocument),
    /// A later load was started before this one finished; nothing was rendered.
    Superseded,
}

pub fn loaded_status(facts: usize, preferences: usize) -> String {
    format!("Loaded {} facts, {} preferences", facts, preferences)
}

pub fn saved_status(response: &SaveFactsResponse) -> String {
    format!(
        "Saved. Facts: {}, Preferences: {}",
        response.facts_count, response.preferences_count
    )
}

/// Splits the URL input on whitespace and commas.
pub fn split_urls(input: &str) -> Vec<String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct FormBridge {
    client: MirrorClient,
    defaults: SubjectDefaults,
    page: Arc<Mutex<Page>>,
    load_seq: Arc<AtomicU64>,
}

impl FormBridge {
    pub fn new(config: &Config) -> ClientResult<Self> {
        let client = MirrorClient::new(&config.server)?;
        Ok(Self::with_page(
            client,
            config.defaults.clone(),
            Arc::new(Mutex::new(Page::new())),
        ))
    }

    pub fn with_page(client: MirrorClient, defaults: SubjectDefaults, page: Arc<Mutex<Page>>) -> Self {
        Self {
            client,
            defaults,
            page,
            load_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn page(&self) -> Arc<Mutex<Page>> {
        self.page.clone()
    }

    pub fn client(&self) -> &MirrorClient {
        &self.client
    }

    /// Runs the handler bound to `trigger`. Request failures are already
    /// rendered on the page when this returns `Err`.
    pub async fn trigger(&self, trigger: Trigger) -> ClientResult<()> {
        debug!(element = trigger.element().id(), "trigger");
        match trigger {
            Trigger::LoadSample => self.submit_sample().await.map(drop),
            Trigger::IngestFiles => self.submit_files().await.map(drop),
            Trigger::IngestUrls => self.submit_urls().await.map(drop),
            Trigger::Send => self.send_chat().await.map(drop),
            Trigger::AddFact => {
                self.add_fact_row(None).await;
                Ok(())
            }
            Trigger::AddPref => {
                self.add_pref_row(None).await;
                Ok(())
            }
            Trigger::LoadFacts => self.load_facts().await.map(drop),
            Trigger::SaveFacts => self.save_facts().await.map(drop),
        }
    }

    async fn fail<T>(&self, status: Element, err: ClientError) -> ClientResult<T> {
        warn!(element = status.id(), error = %err, "request failed");
        self.page.lock().await.render(status, format!("Error: {}", err));
        Err(err)
    }

    pub async fn submit_sample(&self) -> ClientResult<Value> {
        let subject = {
            let page = self.page.lock().await;
            page.value_or(Element::SampleSubject, &self.defaults.sample_subject)
        };

        match self.client.ingest_sample(&subject).await {
            Ok(value) => {
                self.page
                    .lock()
                    .await
                    .render(Element::SampleStatus, value.to_string());
                Ok(value)
            }
            Err(e) => self.fail(Element::SampleStatus, e).await,
        }
    }

    pub async fn submit_files(&self) -> ClientResult<Value> {
        let (subject, files) = {
            let page = self.page.lock().await;
            (
                page.value_or(Element::FilesSubject, &self.defaults.files_subject),
                page.selected_files().to_vec(),
            )
        };

        match self.client.ingest_files(&subject, &files).await {
            Ok(value) => {
                self.page
                    .lock()
                    .await
                    .render(Element::FilesStatus, value.to_string());
                Ok(value)
            }
            Err(e) => self.fail(Element::FilesStatus, e).await,
        }
    }

    pub async fn submit_urls(&self) -> ClientResult<Value> {
        let (subject, urls) = {
            let page = self.page.lock().await;
            (
                page.value_or(Element::UrlsSubject, &self.defaults.urls_subject),
                split_urls(page.value(Element::UrlsInput)),
            )
        };

        match self.client.ingest_urls(&subject, &urls).await {
            Ok(value) => {
                self.page
                    .lock()
                    .await
                    .render(Element::UrlsStatus, value.to_string());
                Ok(value)
            }
            Err(e) => self.fail(Element::UrlsStatus, e).await,
        }
    }

    pub async fn send_chat(&self) -> ClientResult<ChatReply> {
        let request = {
            let page = self.page.lock().await;
            ChatRequest {
                subject_id: page.value_or(Element::ChatSubject, &self.defaults.chat_subject),
                message: page.value(Element::Message).to_string(),
                voice: page.voice(),
                voice_id: page.value(Element::VoiceId).to_string(),
            }
        };

        let reply = match self.client.chat(&request).await {
            Ok(r) => r,
            Err(e) => return self.fail(Element::Reply, e).await,
        };

        let mut page = self.page.lock().await;
        page.render(Element::Reply, reply.reply.clone());
        page.render(
            Element::Citations,
            Value::Array(reply.citations.clone()).to_string(),
        );
        match reply.audio_url.as_deref() {
            Some(url) if !url.is_empty() => page.audio.show(url),
            _ => page.audio.hide(),
        }
        Ok(reply)
    }

    /// Replaces both tables with the subject's stored records.
    ///
    /// Only the most recently started load may render; an older response
    /// arriving late is dropped and reported as [`LoadOutcome::Superseded`].
    pub async fn load_facts(&self) -> ClientResult<LoadOutcome> {
        let ticket = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let subject = {
            let page = self.page.lock().await;
            page.value_or(Element::FactsSubject, &self.defaults.facts_subject)
        };

        let result = self.client.get_facts(&subject).await;

        // The ticket is compared under the page lock so a newer load issued
        // while this one waits for the page still wins.
        let mut page = self.page.lock().await;
        if self.load_seq.load(Ordering::SeqCst) != ticket {
            debug!(subject = %subject, ticket, "discarding superseded facts load");
            return result.map(|_| LoadOutcome::Superseded);
        }

        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                warn!(element = Element::FactsStatus.id(), error = %e, "request failed");
                page.render(Element::FactsStatus, format!("Error: {e}"));
                return Err(e);
            }
        };

        page.facts.clear();
        page.prefs.clear();
        for f in doc.facts.iter().flatten() {
            page.facts.add_row(Some(f));
        }
        for p in doc.preferences.iter().flatten() {
            page.prefs.add_row(Some(p));
        }
        page.render(
            Element::FactsStatus,
            loaded_status(doc.facts_len(), doc.preferences_len()),
        );
        Ok(LoadOutcome::Applied(doc))
    }

    /// Posts every row of both tables as the subject's full record set.
    pub async fn save_facts(&self) -> ClientResult<SaveFactsResponse> {
        let (subject, request) = {
            let page = self.page.lock().await;
            (
                page.value_or(Element::FactsSubject, &self.defaults.facts_subject),
                SaveFactsRequest {
                    facts: page.facts.collect(),
                    preferences: page.prefs.collect(),
                },
            )
        };

        match self.client.save_facts(&subject, &request).await {
            Ok(response) => {
                self.page
                    .lock()
                    .await
                    .render(Element::FactsStatus, saved_status(&response));
                Ok(response)
            }
            Err(e) => self.fail(Element::FactsStatus, e).await,
        }
    }

    pub async fn add_fact_row(&self, fact: Option<Fact>) -> RowId {
        self.page.lock().await.facts.add_row(fact.as_ref())
    }

    pub async fn add_pref_row(&self, preference: Option<Preference>) -> RowId {
        self.page.lock().await.prefs.add_row(preference.as_ref())
    }

    /// The delete control on a fact row.
    pub async fn delete_fact_row(&self, row: RowId) -> bool {
        self.page.lock().await.facts.remove_row(row)
    }

    /// The delete control on a preference row.
    pub async fn delete_pref_row(&self, row: RowId) -> bool {
        self.page.lock().await.prefs.remove_row(row)
    }
}
