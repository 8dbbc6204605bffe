//! Skill Registry (component E): walks configured skill directories, caches
//! discovered skills by name, and watches for `SKILL.md` changes to
//! invalidate that cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::RwLock;

use crate::error::SkillError;
use crate::frontmatter;
use crate::model::{Skill, SkillLocation};

const SKILL_FILE_NAME: &str = "SKILL.md";

/// Walks `paths` in order, loading every direct-child `SKILL.md` file and
/// every direct-child directory containing one. Malformed files are skipped
/// with a warning; an I/O error reading a configured path itself is logged
/// and that path alone is skipped (§4.E).
pub fn discover(paths: &[PathBuf]) -> Vec<Skill> {
    let mut discovered = Vec::new();

    for path in paths {
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("skipping skill path '{}': {e}", path.display());
                continue;
            }
        };

        for entry in entries.flatten() {
            let entry_path = entry.path();

            if entry_path.is_file() && entry_path.file_name().and_then(|n| n.to_str()) == Some(SKILL_FILE_NAME) {
                if let Some(skill) = load_skill_file(&entry_path, path) {
                    discovered.push(skill);
                }
            } else if entry_path.is_dir() {
                let candidate = entry_path.join(SKILL_FILE_NAME);
                if candidate.is_file() {
                    if let Some(skill) = load_skill_file(&candidate, &entry_path) {
                        discovered.push(skill);
                    }
                }
            }
        }
    }

    discovered
}

fn load_skill_file(file: &Path, base_path: &Path) -> Option<Skill> {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("failed to read skill file '{}': {e}", file.display());
            return None;
        }
    };

    let (fields, body) = frontmatter::parse(&text);

    let Some(fields) = fields else {
        log::warn!("skill file '{}' has no valid front-matter, skipping", file.display());
        return None;
    };

    if !frontmatter::is_valid_skill(&fields) {
        log::warn!(
            "skill file '{}' is missing a non-empty name/description, skipping",
            file.display()
        );
        return None;
    }

    Some(Skill {
        name: fields["name"].clone(),
        description: fields["description"].clone(),
        location: SkillLocation::Project,
        content: body,
        base_path: base_path.display().to_string(),
    })
}

/// Applies first-occurrence-wins precedence across `discovered`, preserving
/// the order skills were found in.
fn index_by_name(discovered: Vec<Skill>) -> HashMap<String, Skill> {
    let mut map = HashMap::new();
    for skill in discovered {
        map.entry(skill.name.clone()).or_insert(skill);
    }
    map
}

struct Cache {
    by_name: HashMap<String, Skill>,
    loaded: bool,
}

impl Cache {
    fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            loaded: false,
        }
    }
}

/// Discovers, caches, and watches file-backed skills across the configured
/// directory list.
pub struct SkillRegistry {
    paths: Vec<PathBuf>,
    cache: Arc<RwLock<Cache>>,
    watcher: StdMutex<Option<RecommendedWatcher>>,
}

impl SkillRegistry {
    /// Creates a registry over `paths`, resolved relative to `working_dir`
    /// when not already absolute.
    pub fn new(working_dir: &Path, paths: &[String]) -> Self {
        let resolved = paths
            .iter()
            .map(|p| {
                let path = PathBuf::from(p);
                if path.is_absolute() { path } else { working_dir.join(path) }
            })
            .collect();

        Self {
            paths: resolved,
            cache: Arc::new(RwLock::new(Cache::empty())),
            watcher: StdMutex::new(None),
        }
    }

    /// Returns the skill named `name`, loading the cache on first access.
    pub async fn get(&self, name: &str) -> Option<Skill> {
        self.ensure_loaded().await;
        self.cache.read().await.by_name.get(name).cloned()
    }

    /// Returns every cached skill, loading the cache on first access.
    pub async fn list(&self) -> Vec<Skill> {
        self.ensure_loaded().await;
        self.cache.read().await.by_name.values().cloned().collect()
    }

    /// Invalidates the cache; the next `get`/`list` call re-walks the
    /// configured paths.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.by_name.clear();
        cache.loaded = false;
    }

    async fn ensure_loaded(&self) {
        {
            let cache = self.cache.read().await;
            if cache.loaded {
                return;
            }
        }

        let mut cache = self.cache.write().await;
        if cache.loaded {
            return;
        }

        let discovered = discover(&self.paths);
        cache.by_name = index_by_name(discovered);
        cache.loaded = true;
    }

    /// Recursively watches every existing configured directory. Any event
    /// touching a path ending in `SKILL.md` invalidates the cache and, if
    /// given, invokes `on_change`. Returns the set of directories that could
    /// not be watched (each logged already).
    pub fn watch(&self, on_change: Option<Arc<dyn Fn() + Send + Sync>>) -> Result<(), SkillError> {
        let cache = Arc::clone(&self.cache);
        let runtime = tokio::runtime::Handle::try_current().ok();

        let handler = move |result: Result<Event, notify::Error>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("skill directory watch error: {e}");
                    return;
                }
            };

            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)) {
                return;
            }

            let touches_skill_file = event
                .paths
                .iter()
                .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(SKILL_FILE_NAME));

            if !touches_skill_file {
                return;
            }

            let cache = Arc::clone(&cache);
            let on_change = on_change.clone();

            if let Some(handle) = &runtime {
                handle.spawn(async move {
                    let mut cache = cache.write().await;
                    cache.by_name.clear();
                    cache.loaded = false;
                    drop(cache);
                    if let Some(cb) = on_change {
                        cb();
                    }
                });
            }
        };

        let mut watcher = notify::recommended_watcher(handler).map_err(|e| SkillError::WatchFailed {
            path: "<watcher init>".to_string(),
            source: e,
        })?;

        for path in &self.paths {
            if !path.exists() {
                continue;
            }
            if let Err(e) = watcher.watch(path, RecursiveMode::Recursive) {
                log::warn!("failed to watch skill directory '{}': {e}", path.display());
            }
        }

        *self.watcher.lock().expect("watcher mutex poisoned") = Some(watcher);
        Ok(())
    }

    /// Stops watching. Idempotent: calling this when no watcher is active is
    /// a no-op.
    pub fn stop_watching(&self) {
        self.watcher.lock().expect("watcher mutex poisoned").take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_skill(dir: &Path, name_field: &str, description: &str) {
        fs::write(
            dir.join(SKILL_FILE_NAME),
            format!("---\nname: {name_field}\ndescription: {description}\n---\nbody content"),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn discovers_flat_and_nested_skill_files() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "top-level", "a top-level skill");

        let nested = dir.path().join("pdf-tools");
        fs::create_dir(&nested).unwrap();
        write_skill(&nested, "pdf", "a nested skill");

        let registry = SkillRegistry::new(dir.path(), &[".".to_string()]);
        let mut names: Vec<_> = registry.list().await.into_iter().map(|s| s.name).collect();
        names.sort();

        assert_eq!(names, vec!["pdf".to_string(), "top-level".to_string()]);
    }

    #[tokio::test]
    async fn first_occurrence_wins_across_paths() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        write_skill(dir_a.path(), "dup", "from a");
        write_skill(dir_b.path(), "dup", "from b");

        let registry = SkillRegistry::new(
            Path::new("/"),
            &[dir_a.path().display().to_string(), dir_b.path().display().to_string()],
        );

        let skill = registry.get("dup").await.unwrap();
        assert_eq!(skill.description, "from a");
    }

    #[tokio::test]
    async fn malformed_skill_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SKILL_FILE_NAME), "no front matter here").unwrap();

        let registry = SkillRegistry::new(dir.path(), &[".".to_string()]);
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn clear_cache_forces_rediscovery() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "one", "first");

        let registry = SkillRegistry::new(dir.path(), &[".".to_string()]);
        assert_eq!(registry.list().await.len(), 1);

        write_skill(dir.path(), "two", "second");
        // Cache is warm; stale until explicitly cleared.
        assert_eq!(registry.list().await.len(), 1);

        registry.clear_cache().await;
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn unreadable_path_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "ok", "still loads");

        let registry = SkillRegistry::new(
            Path::new("/"),
            &["/this/path/does/not/exist".to_string(), dir.path().display().to_string()],
        );

        let skill = registry.get("ok").await;
        assert!(skill.is_some());
    }
}
