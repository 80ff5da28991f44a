// ── Classifier database ──
//
// The persisted MIB database is a SQLite file with one row per OID
// prefix. It is read once into an in-memory tree at open; lookups never
// touch the file again. Lifecycle: open (loaded) -> close (closed).

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::heuristic::classify_by_text;
use super::tree::{ClassifierNode, MibEntry};
use crate::error::CoreError;
use crate::model::{Oid, Provider};

const LOAD_QUERY: &str = "SELECT oid, template, provider, description FROM mibs";

/// Result of classifying one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub template: Option<String>,
    pub provider: Provider,
    pub description: Option<String>,
    /// Prefix that matched in the database, if any.
    pub matched: Option<Oid>,
    pub found: bool,
}

/// Read-only OID classifier shared by every poller.
pub struct MibDb {
    tree: ArcSwapOption<ClassifierNode>,
    conn: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for MibDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MibDb")
            .field("loaded", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl MibDb {
    /// Open the database at `path` and load every row into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "classifier database not found"),
            ));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let root = load_tree(&conn)?;
        info!(path = %path.display(), entries = root.entry_count(), "classifier database loaded");

        Ok(Self {
            tree: ArcSwapOption::from_pointee(root),
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn is_open(&self) -> bool {
        self.tree.load().is_some()
    }

    /// Number of prefixes carrying an entry.
    pub fn len(&self) -> Result<usize, CoreError> {
        Ok(self.loaded()?.entry_count())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.len()? == 0)
    }

    /// Longest-prefix lookup of `oid`, falling back to text heuristics on
    /// `fallback_template` and `description` when no prefix carries a
    /// template. A matched row without a provider is resolved from its own
    /// text plus the caller's. "No match" is `Ok` with `found == false`.
    pub fn classify(
        &self,
        oid: &str,
        fallback_template: &str,
        description: &str,
    ) -> Result<Classification, CoreError> {
        let tree = self.loaded()?;

        let parsed = match oid.parse::<Oid>() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(oid, error = %e, "unparsable sysObjectID; using text heuristics");
                None
            }
        };

        if let Some(parsed) = parsed {
            if let Some(node) = tree.longest_match(&parsed) {
                if let Some(entry) = node.entry() {
                    let (provider, found) = match entry.provider {
                        Some(provider) => (provider, true),
                        None => classify_by_text(
                            &entry.template,
                            &format!("{fallback_template} {description}"),
                            &entry.description,
                        ),
                    };
                    return Ok(Classification {
                        template: Some(entry.template.clone()),
                        provider,
                        description: non_empty(&entry.description),
                        matched: Some(Oid::from_components(node.prefix())),
                        found,
                    });
                }
            }
        }

        Ok(Self::classify_by_text(fallback_template, description, ""))
    }

    /// Heuristic-only classification. Works on a closed database too.
    pub fn classify_by_text(name: &str, extra1: &str, extra2: &str) -> Classification {
        let (provider, found) = classify_by_text(name, extra1, extra2);
        Classification {
            template: non_empty(name),
            provider,
            description: non_empty(extra1),
            matched: None,
            found,
        }
    }

    /// Release the tree and the backing connection. Further lookups fail
    /// with [`CoreError::Closed`]. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), CoreError> {
        self.tree.store(None);
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| CoreError::Database(e))?;
            debug!("classifier database closed");
        }
        Ok(())
    }

    fn loaded(&self) -> Result<Arc<ClassifierNode>, CoreError> {
        self.tree.load_full().ok_or(CoreError::Closed)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

fn load_tree(conn: &Connection) -> Result<ClassifierNode, CoreError> {
    let mut stmt = conn.prepare(LOAD_QUERY)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut root = ClassifierNode::root();
    for row in rows {
        let (oid, template, provider, description) = row?;
        let template = template.unwrap_or_default();
        let description = description.unwrap_or_default();

        let oid = match oid.parse::<Oid>() {
            Ok(oid) => oid,
            Err(e) => {
                warn!(error = %e, "skipping classifier row");
                continue;
            }
        };
        if template.trim().is_empty() {
            debug!(%oid, "skipping classifier row without template");
            continue;
        }

        let provider = provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .and_then(|p| p.parse::<Provider>().ok());

        root.insert(
            &oid,
            MibEntry {
                template,
                provider,
                description,
            },
        );
    }
    Ok(root)
}
