use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{is_valid_spec_name, SchemaDefinition, SpecError, SpecRepository, ViewDefinition};

const VIEW_EXTENSION: &str = "aql";
const SCHEMA_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Spec checkout on disk:
///
/// ```text
/// <root>/views/<name>.aql
/// <root>/schemas/**/<name>.yaml
/// ```
pub struct FsSpecRepository {
    root: PathBuf,
}

impl FsSpecRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn views_dir(&self) -> PathBuf {
        self.root.join("views")
    }

    fn schemas_dir(&self) -> PathBuf {
        self.root.join("schemas")
    }

    async fn schema_files(&self) -> Result<Vec<PathBuf>, SpecError> {
        let mut files = Vec::new();
        let mut pending = vec![self.schemas_dir()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if has_extension(&path, &SCHEMA_EXTENSIONS) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn load_schema(path: &Path) -> Result<SchemaDefinition, SpecError> {
        let stem = file_stem(path);
        let source = fs::read_to_string(path).await?;
        let schema: SchemaDefinition =
            serde_yaml::from_str(&source).map_err(|e| SpecError::Malformed {
                name: stem.clone(),
                message: e.to_string(),
            })?;

        if schema.name != stem {
            return Err(SpecError::Malformed {
                name: stem,
                message: format!("schema name '{}' does not match its file name", schema.name),
            });
        }
        Ok(schema)
    }
}

#[async_trait]
impl SpecRepository for FsSpecRepository {
    async fn view(&self, name: &str) -> Result<ViewDefinition, SpecError> {
        if !is_valid_spec_name(name) {
            return Err(SpecError::ViewNotFound(name.to_string()));
        }

        let path = self.views_dir().join(format!("{}.{}", name, VIEW_EXTENSION));
        match fs::read_to_string(&path).await {
            Ok(template_source) => Ok(ViewDefinition {
                name: name.to_string(),
                template_source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SpecError::ViewNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn view_names(&self) -> Result<Vec<String>, SpecError> {
        let mut entries = match fs::read_dir(self.views_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if has_extension(&path, &[VIEW_EXTENSION]) {
                names.push(file_stem(&path));
            }
        }

        names.sort();
        Ok(names)
    }

    async fn schema(&self, name: &str) -> Result<SchemaDefinition, SpecError> {
        if !is_valid_spec_name(name) {
            return Err(SpecError::SchemaNotFound(name.to_string()));
        }

        for path in self.schema_files().await? {
            if file_stem(&path) == name {
                return Self::load_schema(&path).await;
            }
        }
        Err(SpecError::SchemaNotFound(name.to_string()))
    }

    async fn schemas(&self) -> Result<Vec<SchemaDefinition>, SpecError> {
        let mut schemas = Vec::new();
        for path in self.schema_files().await? {
            schemas.push(Self::load_schema(&path).await?);
        }
        Ok(schemas)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
