use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::trace::ParseTrace;

/// Environment variable pointing at the community template collection
/// (the same variable the community tooling honors).
pub const COMMUNITY_TEMPLATES_ENV: &str = "NTC_TEMPLATES_DIR";

/// Resolves template filenames to filesystem paths.
///
/// Search order:
/// 1. Caller-provided override directories — highest priority
/// 2. Bundled local overrides
/// 3. The community template directory, if configured
///
/// First hit wins. The ordering is a contract: a custom template with the
/// same filename as a community one shadows it, which is how a broken
/// upstream template gets hotfixed locally without forking.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    paths: Vec<PathBuf>,
    community: Option<PathBuf>,
}

impl TemplateResolver {
    /// Build a resolver from ordered search paths, appending the community
    /// directory discovered from `NTC_TEMPLATES_DIR`.
    pub fn new(search_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let community = std::env::var_os(COMMUNITY_TEMPLATES_ENV)
            .map(PathBuf::from)
            .filter(|p| p.exists());
        Self::with_community(search_paths, community)
    }

    /// Build with an explicit community directory (or none).
    pub fn with_community(
        search_paths: impl IntoIterator<Item = PathBuf>,
        community: Option<PathBuf>,
    ) -> Self {
        let mut paths = Vec::new();
        for p in search_paths {
            if p.exists() {
                paths.push(p);
            } else {
                debug!(path = %p.display(), "template search path not found");
            }
        }
        if let Some(dir) = &community {
            paths.push(dir.clone());
        }
        if !paths.is_empty() {
            info!(
                paths = ?paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
                "template search paths (priority order)"
            );
        }
        Self { paths, community }
    }

    pub fn community_dir(&self) -> Option<&Path> {
        self.community.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Find a template file by name: first exact-child match across the
    /// search paths, then recursive search. Resolution attempts are recorded
    /// in the trace.
    pub fn resolve(&self, filename: &str, trace: Option<&mut ParseTrace>) -> Option<PathBuf> {
        let found = self.find(filename);
        if let Some(trace) = trace {
            trace.template_resolved(
                filename,
                found.as_ref().map(|p| p.to_str().unwrap_or_default()),
                self.paths.iter().map(|p| p.display().to_string()).collect(),
            );
        }
        if found.is_none() {
            debug!(template = filename, "template not resolved");
        }
        found
    }

    fn find(&self, filename: &str) -> Option<PathBuf> {
        for base in &self.paths {
            let candidate = base.join(filename);
            if candidate.exists() {
                return Some(candidate);
            }

            // Community collections keep a flat layout, but overrides may
            // nest by platform.
            for entry in WalkDir::new(base).into_iter().flatten() {
                if entry.file_type().is_file() && entry.file_name() == filename {
                    return Some(entry.into_path());
                }
            }
        }
        None
    }
}
