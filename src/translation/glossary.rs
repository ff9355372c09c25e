/*!
 * Terminology glossaries per language pair.
 *
 * Each pair is stored as a JSON object `{ "term": "translation" }` in
 * `<dir>/<source>_<target>.json`. Saving a pair rewrites the reversed pair
 * so both directions stay in sync.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;
use crate::language_utils::normalize_to_part1_or_part2t;

/// Term to translation map for one language pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Glossary {
    pub terms: BTreeMap<String, String>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Add or replace a term; returns the previous translation
    pub fn add_term(&mut self, term: &str, translation: &str) -> Option<String> {
        self.terms.insert(term.trim().to_string(), translation.trim().to_string())
    }

    pub fn remove_term(&mut self, term: &str) -> Option<String> {
        self.terms.remove(term.trim())
    }

    /// Terms occurring in `text`, compared case-insensitively
    pub fn relevant_terms(&self, text: &str) -> Vec<(String, String)> {
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .filter(|(term, _)| !term.is_empty() && haystack.contains(&term.to_lowercase()))
            .map(|(term, translation)| (term.clone(), translation.clone()))
            .collect()
    }

    /// Terms whose term or translation contains `query`, in term order
    pub fn search(&self, query: Option<&str>) -> Vec<(String, String)> {
        let query = query.map(str::to_lowercase).filter(|q| !q.is_empty());
        self.terms
            .iter()
            .filter(|(term, translation)| match &query {
                Some(q) => term.to_lowercase().contains(q) || translation.to_lowercase().contains(q),
                None => true,
            })
            .map(|(term, translation)| (term.clone(), translation.clone()))
            .collect()
    }

    /// The same glossary read in the other direction
    pub fn reversed(&self) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|(term, translation)| (translation.clone(), term.clone()))
                .collect(),
        }
    }
}

/// One page of a glossary listing
#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryPage {
    pub entries: Vec<(String, String)>,
    pub page: usize,
    pub total_pages: usize,
    pub total_terms: usize,
}

/// Directory of glossary files
#[derive(Debug, Clone)]
pub struct GlossaryStore {
    dir: PathBuf,
}

impl GlossaryStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn pair_key(language: &str) -> String {
        normalize_to_part1_or_part2t(language).unwrap_or_else(|_| language.trim().to_lowercase())
    }

    /// File holding the glossary for a pair
    pub fn path_for(&self, source_language: &str, target_language: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.json",
            Self::pair_key(source_language),
            Self::pair_key(target_language)
        ))
    }

    /// Load a pair; a missing file is an empty glossary
    pub fn load(&self, source_language: &str, target_language: &str) -> Result<Glossary> {
        let path = self.path_for(source_language, target_language);
        if !FileManager::file_exists(&path) {
            debug!("No glossary at {:?}", path);
            return Ok(Glossary::new());
        }
        let content = FileManager::read_to_string(&path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse glossary: {:?}", path))
    }

    /// Save a pair and its reversed pair
    pub fn save(&self, source_language: &str, target_language: &str, glossary: &Glossary) -> Result<()> {
        FileManager::ensure_dir(&self.dir)?;
        self.write(&self.path_for(source_language, target_language), glossary)?;
        self.write(&self.path_for(target_language, source_language), &glossary.reversed())
    }

    fn write(&self, path: &Path, glossary: &Glossary) -> Result<()> {
        let json = serde_json::to_string_pretty(glossary).context("Failed to serialize glossary")?;
        FileManager::write_atomic(path, json.as_bytes())
            .with_context(|| format!("Failed to write glossary: {:?}", path))
    }

    /// Add a term to a pair and save it
    pub fn add_term(&self, source_language: &str, target_language: &str, term: &str, translation: &str) -> Result<()> {
        let mut glossary = self.load(source_language, target_language)?;
        if let Some(previous) = glossary.add_term(term, translation) {
            if previous != translation.trim() {
                warn!("Replacing translation of '{}': '{}' -> '{}'", term, previous, translation);
            }
        }
        self.save(source_language, target_language, &glossary)
    }

    /// Remove a term from a pair; returns whether it existed
    pub fn remove_term(&self, source_language: &str, target_language: &str, term: &str) -> Result<bool> {
        let mut glossary = self.load(source_language, target_language)?;
        if glossary.remove_term(term).is_none() {
            return Ok(false);
        }
        self.save(source_language, target_language, &glossary)?;
        Ok(true)
    }

    /// List a pair with an optional search filter, one page at a time (1-based)
    pub fn list(
        &self,
        source_language: &str,
        target_language: &str,
        query: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<GlossaryPage> {
        let matches = self.load(source_language, target_language)?.search(query);
        let page_size = page_size.max(1);
        let total_terms = matches.len();
        let total_pages = total_terms.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);

        let entries = matches
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(GlossaryPage {
            entries,
            page,
            total_pages,
            total_terms,
        })
    }
}
