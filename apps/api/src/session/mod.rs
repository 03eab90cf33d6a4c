//! Per-session state.
//!
//! The original grab-bag of independently mutated fields is re-architected
//! as one `Session` value with explicit update contracts: a `Context` value,
//! three image-source collections with their own replacement rules, prompt
//! state, credential state, the report collection, and the orchestrator's
//! run state. Everything lives for the session only — a reset restores the
//! initial state and nothing is persisted.

pub mod handlers;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tempfile::TempDir;

use crate::images::{LocalImage, PickedMedia};
use crate::prompt::DEFAULT_TEMPLATE;
use crate::reports::ReportStore;

pub type SharedSession = Arc<Mutex<Session>>;

/// User-entered site context. Plain text; any field may be empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Context {
    pub address: String,
    pub latlon: String,
    pub field_memo: String,
}

impl Context {
    pub fn has_any(&self) -> bool {
        !self.address.trim().is_empty()
            || !self.latlon.trim().is_empty()
            || !self.field_memo.trim().is_empty()
    }
}

/// Orchestrator run state. Only one generation run may be in flight, and
/// overwriting an existing report requires passing through
/// `AwaitingConfirmation` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingConfirmation { model: String },
    Generating,
}

pub struct Session {
    pub api_key: String,
    pub key_validated: bool,
    pub available_models: Vec<String>,
    pub selected_model: String,
    pub context: Context,
    pub local_images: Vec<LocalImage>,
    pub image_urls: Vec<String>,
    pub picked_media: Vec<PickedMedia>,
    pub prompt_url: String,
    pub base_prompt: String,
    pub reports: ReportStore,
    pub run: RunState,
    /// Spool directory owning the uploaded files; replaced wholesale on
    /// re-upload, which deletes the previous batch from disk.
    spool: Option<TempDir>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            api_key: String::new(),
            key_validated: false,
            available_models: Vec::new(),
            selected_model: String::new(),
            context: Context::default(),
            local_images: Vec::new(),
            image_urls: Vec::new(),
            picked_media: Vec::new(),
            prompt_url: String::new(),
            base_prompt: DEFAULT_TEMPLATE.to_string(),
            reports: ReportStore::default(),
            run: RunState::Idle,
            spool: None,
        }
    }

    /// Restores the initial state (the browser-reload of the original UI).
    pub fn reset(&mut self) {
        *self = Session::new();
    }

    /// Replaces the uploaded-file set wholesale, as a file re-selection does.
    /// The new spool directory supersedes (and drops) the previous one.
    pub fn replace_local_images(&mut self, spool: TempDir, images: Vec<LocalImage>) {
        self.local_images = images;
        self.spool = Some(spool);
    }

    pub fn clear_local_images(&mut self) {
        self.local_images.clear();
        self.spool.take();
    }

    /// Merges new remote URLs into the set, dropping blanks and duplicates
    /// while preserving first-seen order.
    pub fn add_image_urls(&mut self, urls: Vec<String>) {
        for url in urls {
            let url = url.trim().to_string();
            if !url.is_empty() && !self.image_urls.contains(&url) {
                self.image_urls.push(url);
            }
        }
    }

    pub fn clear_image_urls(&mut self) {
        self.image_urls.clear();
    }

    /// Replaces the picked-media set wholesale, as each picker confirmation does.
    pub fn set_picked_media(&mut self, items: Vec<PickedMedia>) {
        self.picked_media = items;
    }

    pub fn clear_picked_media(&mut self) {
        self.picked_media.clear();
    }

    fn has_any_images(&self) -> bool {
        !self.local_images.is_empty() || !self.image_urls.is_empty() || !self.picked_media.is_empty()
    }

    /// The permissive readiness rule: any one of address, coordinates,
    /// images, or field memo is enough input for a generation run.
    pub fn has_any_input(&self) -> bool {
        self.context.has_any() || self.has_any_images()
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}
