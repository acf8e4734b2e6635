use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use crate::fsutil::{read_text_file, write_text_file_atomic};
use crate::rules::ContextRule;

const CARDS_KEY: &str = "qa_cards";
const USER_ID_FILE: &str = "user_id";
const REMOTE_POLL_INTERVAL: Duration = Duration::from_secs(2);
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Format(String),
    Remote(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "storage I/O error: {err}"),
            StoreError::Format(detail) => write!(f, "stored data is malformed: {detail}"),
            StoreError::Remote(detail) => write!(f, "sync backend unavailable: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Events delivered by a live subscription. The remote backend replaces the
/// whole rule set on every event (full-snapshot semantics); there is no
/// per-document delta.
#[derive(Debug)]
pub enum StoreEvent {
    CardsSnapshot(Vec<ContextRule>),
}

/// Capability interface for rule-set persistence. Everything above this trait
/// is mode-agnostic; the local/remote choice happens once at startup.
pub trait CardStore {
    fn list(&self) -> Result<Vec<ContextRule>, StoreError>;
    fn upsert(&self, rule: &ContextRule) -> Result<(), StoreError>;
    fn remove(&self, id: &str) -> Result<(), StoreError>;
    /// A receiver of full-snapshot replace events, when the backend streams.
    fn subscribe(&self) -> Option<Receiver<StoreEvent>>;
}

fn sort_by_created_at(mut rules: Vec<ContextRule>) -> Vec<ContextRule> {
    rules.sort_by_key(|rule| rule.created_at);
    rules
}

/// Offline mode: the whole rule set lives as one JSON array under the
/// `qa_cards` key in the config dir. Writes are synchronous and atomic.
pub struct LocalCardStore {
    path: PathBuf,
    cache: Mutex<Vec<ContextRule>>,
}

impl LocalCardStore {
    pub fn open(config_dir: &Path) -> Result<Self, StoreError> {
        let path = config_dir.join(format!("{CARDS_KEY}.json"));
        let cache = match read_text_file(&path) {
            Ok(text) => serde_json::from_str::<Vec<ContextRule>>(&text)
                .map_err(|err| StoreError::Format(err.to_string()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    fn persist(&self, rules: &[ContextRule]) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(rules)
            .map_err(|err| StoreError::Format(err.to_string()))?;
        write_text_file_atomic(&self.path, &text)?;
        Ok(())
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut Vec<ContextRule>) -> T) -> T {
        let mut guard = self.cache.lock().unwrap_or_else(|poison| poison.into_inner());
        f(&mut guard)
    }
}

impl CardStore for LocalCardStore {
    fn list(&self) -> Result<Vec<ContextRule>, StoreError> {
        Ok(sort_by_created_at(self.with_cache(|cache| cache.clone())))
    }

    fn upsert(&self, rule: &ContextRule) -> Result<(), StoreError> {
        let snapshot = self.with_cache(|cache| {
            if let Some(existing) = cache.iter_mut().find(|c| c.id == rule.id) {
                *existing = rule.clone();
            } else {
                cache.push(rule.clone());
            }
            cache.clone()
        });
        self.persist(&snapshot)
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        let snapshot = self.with_cache(|cache| {
            cache.retain(|c| c.id != id);
            cache.clone()
        });
        self.persist(&snapshot)
    }

    fn subscribe(&self) -> Option<Receiver<StoreEvent>> {
        None
    }
}

/// Online mode: one document per rule under a per-user collection on an
/// opaque HTTP document store. Writes are optimistic fire-and-forget; the
/// subscription polls for full snapshots and the last snapshot wins.
pub struct RemoteCardStore {
    collection_url: String,
}

impl RemoteCardStore {
    pub fn new(base_url: &str, user_id: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            collection_url: format!("{base}/users/{user_id}/cards"),
        }
    }

    fn client() -> Result<reqwest::blocking::Client, StoreError> {
        reqwest::blocking::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(|err| StoreError::Remote(err.to_string()))
    }

    fn fetch_snapshot(collection_url: &str) -> Result<Vec<ContextRule>, StoreError> {
        let response = Self::client()?
            .get(collection_url)
            .send()
            .map_err(|err| StoreError::Remote(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Remote(format!(
                "snapshot fetch returned {}",
                response.status()
            )));
        }
        let rules: Vec<ContextRule> = response
            .json()
            .map_err(|err| StoreError::Remote(err.to_string()))?;
        Ok(sort_by_created_at(rules))
    }
}

impl CardStore for RemoteCardStore {
    fn list(&self) -> Result<Vec<ContextRule>, StoreError> {
        Self::fetch_snapshot(&self.collection_url)
    }

    fn upsert(&self, rule: &ContextRule) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.collection_url, rule.id);
        let rule = rule.clone();
        thread::spawn(move || {
            let Ok(client) = Self::client() else { return };
            match client.put(&url).json(&rule).send() {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(status = response.status().as_u16(), "card upsert rejected");
                }
                Err(err) => tracing::warn!(error = %err, "card upsert failed"),
            }
        });
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.collection_url, id);
        thread::spawn(move || {
            let Ok(client) = Self::client() else { return };
            match client.delete(&url).send() {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(status = response.status().as_u16(), "card delete rejected");
                }
                Err(err) => tracing::warn!(error = %err, "card delete failed"),
            }
        });
        Ok(())
    }

    fn subscribe(&self) -> Option<Receiver<StoreEvent>> {
        let (tx, rx) = mpsc::channel();
        let collection_url = self.collection_url.clone();
        thread::spawn(move || {
            let mut last: Option<Vec<ContextRule>> = None;
            loop {
                match Self::fetch_snapshot(&collection_url) {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            last = Some(snapshot.clone());
                            if tx.send(StoreEvent::CardsSnapshot(snapshot)).is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => tracing::debug!(error = %err, "card snapshot poll failed"),
                }
                thread::sleep(REMOTE_POLL_INTERVAL);
            }
        });
        Some(rx)
    }
}

/// A stable per-install user id for the remote collection path, minted once
/// and kept in the config dir.
pub fn device_user_id(config_dir: &Path) -> io::Result<String> {
    let path = config_dir.join(USER_ID_FILE);
    match read_text_file(&path) {
        Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Ok(_) | Err(_) => {
            let id = Uuid::new_v4().to_string();
            write_text_file_atomic(&path, &id)?;
            Ok(id)
        }
    }
}

/// The single mode-selection point: remote when a sync URL is configured and
/// offline was not forced, local otherwise.
pub fn select_card_store(
    offline: bool,
    sync_url: Option<&str>,
    config_dir: &Path,
) -> Result<Box<dyn CardStore>, StoreError> {
    match sync_url {
        Some(url) if !offline => {
            let user_id = device_user_id(config_dir)?;
            tracing::info!(user_id = %user_id, "using remote card store");
            Ok(Box::new(RemoteCardStore::new(url, &user_id)))
        }
        _ => Ok(Box::new(LocalCardStore::open(config_dir)?)),
    }
}

#[cfg(test)]
#[path = "../tests/unit/store_tests.rs"]
mod tests;
