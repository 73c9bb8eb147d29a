use super::LOG_TARGET;
use crate::model::ComponentType;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level directories of the collector layout, each holding one subdirectory per component.
pub const COMPONENT_DIRS: [(&str, ComponentType); 5] = [
    ("receiver", ComponentType::Receiver),
    ("processor", ComponentType::Processor),
    ("exporter", ComponentType::Exporter),
    ("extension", ComponentType::Extension),
    ("connector", ComponentType::Connector),
];

const MANIFEST_NAME: &str = "metadata.yaml";

/// A component manifest found by [`discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFile {
    pub path: PathBuf,
    pub component_name: String,
    pub component_type: ComponentType,
}

/// Find every `<kind>/<component>/metadata.yaml` below `repo_root`.
///
/// Kinds are visited in [`COMPONENT_DIRS`] order and components in name order. Missing or unreadable
/// kind directories contribute nothing.
#[must_use]
pub fn discover(repo_root: &Path) -> Vec<MetadataFile> {
    let mut files = Vec::new();

    for (dir_name, component_type) in COMPONENT_DIRS {
        let dir = repo_root.join(dir_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Skipping '{}': {e}", dir.display());
                continue;
            }
        };

        let mut components: Vec<_> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        components.sort();

        for component_name in components {
            let path = dir.join(&component_name).join(MANIFEST_NAME);
            if path.is_file() {
                files.push(MetadataFile {
                    path,
                    component_name,
                    component_type,
                });
            }
        }
    }

    files
}

/// The component kind named by the first kind directory in `path` that has something after it.
#[must_use]
pub fn component_type_from_path(path: &str) -> Option<ComponentType> {
    let parts: Vec<_> = path.split(['/', '\\']).collect();
    parts.iter().enumerate().find_map(|(i, part)| {
        if i + 1 >= parts.len() {
            return None;
        }

        COMPONENT_DIRS.iter().find(|(name, _)| name == part).map(|(_, t)| *t)
    })
}
