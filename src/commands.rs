//! CLI entry points.
//!
//! Each command fills in the page the way a user would fill in the form,
//! fires the form's trigger, and prints what the page now shows.

use anyhow::{bail, ensure, Context, Result};
use std::path::{Path, PathBuf};

use crate::bridge::{FormBridge, LoadOutcome, Trigger};
use crate::client::read_upload;
use crate::config::Config;
use crate::models::{Fact, FactsDocument, Preference};
use crate::page::{Element, Page};
use crate::table::{EditableTable, TableRecord};

/// Which table a row command acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TableKind {
    Facts,
    Prefs,
}

async fn fire(bridge: &FormBridge, trigger: Trigger, status: Element) -> String {
    let result = bridge.trigger(trigger).await;
    let text = bridge.page().lock().await.text(status).to_string();
    if result.is_err() {
        eprintln!("{}", text);
        std::process::exit(1);
    }
    text
}

pub async fn run_sample(config: &Config, subject: Option<String>) -> Result<()> {
    let bridge = FormBridge::new(config)?;
    if let Some(s) = subject {
        bridge.page().lock().await.set_value(Element::SampleSubject, s)?;
    }
    println!("{}", fire(&bridge, Trigger::LoadSample, Element::SampleStatus).await);
    Ok(())
}

pub async fn run_ingest(config: &Config, subject: Option<String>, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        bail!("no files given");
    }

    let mut files = Vec::with_capacity(paths.len());
    for p in paths {
        files.push(read_upload(p).await?);
    }

    let bridge = FormBridge::new(config)?;
    {
        let page = bridge.page();
        let mut page = page.lock().await;
        if let Some(s) = subject {
            page.set_value(Element::FilesSubject, s)?;
        }
        page.select_files(files);
    }
    println!("{}", fire(&bridge, Trigger::IngestFiles, Element::FilesStatus).await);
    Ok(())
}

pub async fn run_ingest_urls(config: &Config, subject: Option<String>, urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        bail!("no URLs given");
    }

    let bridge = FormBridge::new(config)?;
    {
        let page = bridge.page();
        let mut page = page.lock().await;
        if let Some(s) = subject {
            page.set_value(Element::UrlsSubject, s)?;
        }
        page.set_value(Element::UrlsInput, urls.join("\n"))?;
    }
    println!("{}", fire(&bridge, Trigger::IngestUrls, Element::UrlsStatus).await);
    Ok(())
}

pub async fn run_chat(
    config: &Config,
    subject: Option<String>,
    message: &str,
    voice: bool,
    voice_id: Option<String>,
) -> Result<()> {
    let bridge = FormBridge::new(config)?;
    {
        let page = bridge.page();
        let mut page = page.lock().await;
        if let Some(s) = subject {
            page.set_value(Element::ChatSubject, s)?;
        }
        page.set_value(Element::Message, message)?;
        if let Some(v) = voice_id {
            page.set_value(Element::VoiceId, v)?;
        }
        page.set_voice(voice);
    }

    let reply = fire(&bridge, Trigger::Send, Element::Reply).await;
    println!("{}", reply);

    let page = bridge.page();
    let page = page.lock().await;
    let citations: Vec<serde_json::Value> =
        serde_json::from_str(page.text(Element::Citations)).unwrap_or_default();
    if !citations.is_empty() {
        println!();
        println!("--- Citations ({}) ---", citations.len());
        for c in &citations {
            let source = c.get("source").and_then(|s| s.as_str());
            let snippet = c.get("snippet").and_then(|s| s.as_str());
            match (source, snippet) {
                (Some(src), Some(snip)) => println!("[{}] {}", src, snip.replace('\n', " ")),
                _ => println!("{}", c),
            }
        }
    }
    if let Some(src) = page.audio.src.as_deref().filter(|_| page.audio.visible) {
        println!();
        match bridge.client().resolve(src) {
            Ok(url) => println!("audio: {}", url),
            Err(_) => println!("audio: {}", src),
        }
    }
    Ok(())
}

async fn bridge_for_subject(config: &Config, subject: Option<String>) -> Result<FormBridge> {
    let bridge = FormBridge::new(config)?;
    if let Some(s) = subject {
        bridge.page().lock().await.set_value(Element::FactsSubject, s)?;
    }
    Ok(bridge)
}

/// Loads the subject's records into the tables, exiting on failure.
async fn load(bridge: &FormBridge) -> Result<FactsDocument> {
    match bridge.load_facts().await {
        Ok(LoadOutcome::Applied(doc)) => Ok(doc),
        Ok(LoadOutcome::Superseded) => bail!("facts load was superseded"),
        Err(_) => {
            eprintln!("{}", bridge.page().lock().await.text(Element::FactsStatus));
            std::process::exit(1);
        }
    }
}

pub async fn run_facts_show(config: &Config, subject: Option<String>) -> Result<()> {
    let bridge = bridge_for_subject(config, subject).await?;
    let doc = load(&bridge).await?;

    let page = bridge.page();
    let page = page.lock().await;
    println!("{}", page.text(Element::FactsStatus));
    println!();
    println!("--- Facts ---");
    print!("{}", format_table(&page.facts));
    println!();
    println!("--- Preferences ---");
    print!("{}", format_table(&page.prefs));

    if let Some(style) = doc.style.as_ref().filter(|s| !s.tone.is_empty()) {
        println!();
        println!("--- Style ---");
        println!("tone:  {}", style.tone);
        for tip in &style.response_tips {
            println!("tip:   {}", tip);
        }
    }
    Ok(())
}

/// Cell values for a new row, by column name.
pub struct NewRow {
    pub key: String,
    pub value: String,
    pub confidence: Option<String>,
    pub source: Option<String>,
}

pub async fn run_facts_add(
    config: &Config,
    subject: Option<String>,
    table: TableKind,
    row: NewRow,
) -> Result<()> {
    let bridge = bridge_for_subject(config, subject).await?;
    load(&bridge).await?;

    {
        let page = bridge.page();
        let mut page = page.lock().await;
        match table {
            TableKind::Facts => fill_new_row(&mut page.facts, "type", &row)?,
            TableKind::Prefs => fill_new_row(&mut page.prefs, "category", &row)?,
        }
    }

    println!("{}", fire(&bridge, Trigger::SaveFacts, Element::FactsStatus).await);
    Ok(())
}

fn fill_new_row<R: TableRecord>(table: &mut EditableTable<R>, key_field: &str, row: &NewRow) -> Result<()> {
    let id = table.add_row(None);
    table.set_cell(id, key_field, &row.key)?;
    table.set_cell(id, "value", &row.value)?;
    if let Some(c) = &row.confidence {
        table.set_cell(id, "confidence", c)?;
    }
    if let Some(s) = &row.source {
        table.set_cell(id, "source", s)?;
    }
    Ok(())
}

pub async fn run_facts_remove(
    config: &Config,
    subject: Option<String>,
    table: TableKind,
    index: usize,
) -> Result<()> {
    let bridge = bridge_for_subject(config, subject).await?;
    load(&bridge).await?;

    let row = {
        let page = bridge.page();
        let page = page.lock().await;
        let (row, len) = match table {
            TableKind::Facts => (page.facts.row_at(index), page.facts.len()),
            TableKind::Prefs => (page.prefs.row_at(index), page.prefs.len()),
        };
        match row {
            Some(r) => r,
            None => bail!("row {} out of range ({} rows)", index, len),
        }
    };

    let removed = match table {
        TableKind::Facts => bridge.delete_fact_row(row).await,
        TableKind::Prefs => bridge.delete_pref_row(row).await,
    };
    ensure!(removed, "row {} was not removed", index);

    println!("{}", fire(&bridge, Trigger::SaveFacts, Element::FactsStatus).await);
    Ok(())
}

pub async fn run_facts_export(config: &Config, subject: Option<String>, out: Option<&Path>) -> Result<()> {
    let bridge = bridge_for_subject(config, subject).await?;
    load(&bridge).await?;

    let doc = {
        let page = bridge.page();
        let page = page.lock().await;
        page_document(&page)
    };
    let json = serde_json::to_string_pretty(&doc)?;

    match out {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} facts, {} preferences to {}",
                doc.facts_len(),
                doc.preferences_len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn run_facts_import(config: &Config, subject: Option<String>, input: &Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let doc: FactsDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let bridge = bridge_for_subject(config, subject).await?;
    {
        let page = bridge.page();
        let mut page = page.lock().await;
        page.facts.clear();
        page.prefs.clear();
    }
    for f in doc.facts.into_iter().flatten() {
        bridge.add_fact_row(Some(f)).await;
    }
    for p in doc.preferences.into_iter().flatten() {
        bridge.add_pref_row(Some(p)).await;
    }

    println!("{}", fire(&bridge, Trigger::SaveFacts, Element::FactsStatus).await);
    Ok(())
}

/// The tables as they would be saved.
fn page_document(page: &Page) -> FactsDocument {
    let facts: Vec<Fact> = page.facts.collect();
    let preferences: Vec<Preference> = page.prefs.collect();
    FactsDocument {
        facts: Some(facts),
        preferences: Some(preferences),
        style: None,
    }
}

/// Renders a table as aligned text columns with a leading row index.
pub fn format_table<R: TableRecord>(table: &EditableTable<R>) -> String {
    let schema = table.schema();
    if table.is_empty() {
        return "(none)\n".to_string();
    }

    let mut widths: Vec<usize> = schema.fields().iter().map(|f| f.len()).collect();
    for row in table.rows() {
        for (w, cell) in widths.iter_mut().zip(&row.cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str("#  ");
    for (field, w) in schema.fields().iter().zip(&widths) {
        out.push_str(&format!(" {:<w$}", field.to_uppercase(), w = *w));
    }
    out.push('\n');
    for (i, row) in table.rows().iter().enumerate() {
        out.push_str(&format!("{:<3}", i));
        for (cell, w) in row.cells.iter().zip(&widths) {
            out.push_str(&format!(" {:<w$}", cell, w = *w));
        }
        out.push('\n');
    }
    out
}
