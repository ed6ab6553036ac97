//! Boundary to an external semantic index of a Java project.
//!
//! The index answers "which entity is `p.A.f`", "who reads or writes it" and "where is it
//! declared". The single-file refactorings in [`crate::single_file`] and the push-down
//! refactorings in [`crate::pushdown`] consult it; the field move works from its own per-file
//! models.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Package,
    Class,
    Interface,
    Method,
    /// Fields and other variables.
    Variable,
    Parameter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// The referenced entity is read by `Reference::entity`.
    UseBy,
    /// The referenced entity is written by `Reference::entity`.
    SetBy,
    CallBy,
    TypedBy,
    DefineIn,
    /// The referenced class is extended by `Reference::entity`.
    ExtendBy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub simple_name: String,
    /// Dotted name (`p.A.f`); for files, the file path.
    pub long_name: String,
    pub parent: Option<EntityId>,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl Entity {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn is_public(&self) -> bool {
        self.has_modifier("public")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RefKind,
    /// The entity on the other side of the reference, e.g. the method reading a field.
    pub entity: EntityId,
    pub file: PathBuf,
}

pub trait SemanticIndex {
    fn lookup(&self, long_name: &str, kind: EntityKind) -> Vec<Entity>;

    fn entity(&self, id: EntityId) -> Option<Entity>;

    /// References to `entity` of any of `kinds`.
    fn references(&self, entity: &Entity, kinds: &[RefKind]) -> Vec<Reference>;

    fn parent(&self, entity: &Entity) -> Option<Entity> {
        entity.parent.and_then(|id| self.entity(id))
    }

    /// Path of the file entity enclosing `entity`.
    fn declaring_file(&self, entity: &Entity) -> Option<PathBuf> {
        let mut current = self.parent(entity)?;
        loop {
            if current.kind == EntityKind::File {
                return Some(PathBuf::from(&current.long_name));
            }
            current = self.parent(&current)?;
        }
    }
}

/// A [`SemanticIndex`] held in memory, built programmatically or loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryIndex {
    entities: Vec<Entity>,
    /// `(referenced entity, reference)` pairs.
    #[serde(default)]
    references: Vec<(EntityId, Reference)>,
}

impl InMemoryIndex {
    pub fn builder() -> InMemoryIndexBuilder {
        InMemoryIndexBuilder::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, IndexLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| IndexLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| IndexLoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexLoadError {
    #[error("failed to read index {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid index {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SemanticIndex for InMemoryIndex {
    fn lookup(&self, long_name: &str, kind: EntityKind) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind == kind && e.long_name == long_name)
            .cloned()
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.entities.iter().find(|e| e.id == id).cloned()
    }

    fn references(&self, entity: &Entity, kinds: &[RefKind]) -> Vec<Reference> {
        self.references
            .iter()
            .filter(|(target, r)| *target == entity.id && kinds.contains(&r.kind))
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryIndexBuilder {
    entities: BTreeMap<EntityId, Entity>,
    references: Vec<(EntityId, Reference)>,
}

impl InMemoryIndexBuilder {
    pub fn file(&mut self, path: impl AsRef<Path>) -> EntityId {
        let path = path.as_ref();
        let simple_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.push(Entity {
            id: EntityId(0),
            kind: EntityKind::File,
            simple_name,
            long_name: path.to_string_lossy().into_owned(),
            parent: None,
            modifiers: Vec::new(),
        })
    }

    /// Add an entity; its simple name is the last dotted segment of `long_name`.
    pub fn entity(
        &mut self,
        kind: EntityKind,
        long_name: &str,
        parent: Option<EntityId>,
        modifiers: &[&str],
    ) -> EntityId {
        let simple_name = long_name.rsplit('.').next().unwrap_or(long_name);
        self.push(Entity {
            id: EntityId(0),
            kind,
            simple_name: simple_name.to_string(),
            long_name: long_name.to_string(),
            parent,
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
        })
    }

    /// Record that `by` refers to `target` with `kind`, in `file`.
    pub fn reference(
        &mut self,
        target: EntityId,
        kind: RefKind,
        by: EntityId,
        file: impl Into<PathBuf>,
    ) -> &mut Self {
        self.references.push((
            target,
            Reference {
                kind,
                entity: by,
                file: file.into(),
            },
        ));
        self
    }

    pub fn build(self) -> InMemoryIndex {
        InMemoryIndex {
            entities: self.entities.into_values().collect(),
            references: self.references,
        }
    }

    fn push(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }
}
