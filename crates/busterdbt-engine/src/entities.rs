//! Entity to relationship resolution
//!
//! Maps a semantic entity name onto a target model through naming
//! conventions, then finds that model's primary key. Needs read-only access
//! to the whole file for cross-references.

use busterdbt_core::{Config, Issue, IssueCode, Relationship, RelationshipType};
use busterdbt_dbt::{DbtFile, Entity, EntityType, RawModel};

use crate::error::ResolveError;

/// Relationships resolved from a model's entities, plus what went wrong on the way
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityResolution {
    pub relationships: Vec<Relationship>,
    pub issues: Vec<Issue>,
}

/// Resolves entities against every model and semantic model in one file
#[derive(Debug, Clone, Copy)]
pub struct EntityResolver<'a> {
    file: &'a DbtFile,
    config: &'a Config,
}

impl<'a> EntityResolver<'a> {
    pub fn new(file: &'a DbtFile, config: &'a Config) -> Self {
        Self { file, config }
    }

    /// Turn non-primary entities into relationships
    ///
    /// Entities whose target model cannot be found are skipped with a warning.
    pub fn resolve_entities(&self, entities: &[Entity], current_model: &str) -> EntityResolution {
        let mut resolution = EntityResolution::default();

        for entity in entities {
            let relationship_type = match entity.entity_type {
                EntityType::Primary => continue,
                EntityType::Foreign | EntityType::Natural => RelationshipType::ManyToOne,
                EntityType::Unique => RelationshipType::OneToOne,
            };

            let target = match self.resolve_target_model(&entity.name) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!(
                        model = %current_model,
                        entity = %entity.name,
                        "{}",
                        e
                    );
                    resolution.issues.push(Issue::warning(
                        IssueCode::EntityUnresolved,
                        format!("Model '{}': {}", current_model, e),
                    ));
                    continue;
                }
            };

            let key = match self.resolve_primary_key(&target) {
                Some(key) => key,
                None => {
                    let fallback = self.config.fallback_primary_key.clone();
                    tracing::warn!(
                        model = %current_model,
                        target = %target,
                        fallback = %fallback,
                        "No primary key found for target model, using fallback"
                    );
                    resolution.issues.push(Issue::warning(
                        IssueCode::PrimaryKeyFallback,
                        format!(
                            "No primary key found for '{}'; assuming '{}'",
                            target, fallback
                        ),
                    ));
                    fallback
                }
            };

            resolution.relationships.push(
                Relationship::new(
                    format!("{}_rel", entity.name),
                    entity.column(),
                    format!("{}.{}", target, key),
                )
                .with_type(relationship_type)
                .with_description(format!(
                    "{} entity '{}' referencing {}",
                    entity_label(entity.entity_type),
                    entity.name,
                    target
                )),
            );
        }

        resolution
    }

    /// Every model name an entity may resolve to: plain models, then semantic base models
    fn candidate_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.file.models.iter().map(|m| m.name.clone()).collect();

        for sm in &self.file.semantic_models {
            let base = sm.base_model_name();
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&base)) {
                names.push(base);
            }
        }

        names
    }

    /// Map an entity name to a model name
    ///
    /// Tries exact, `+s`, `y -> ies`, then each configured prefix with the
    /// singular and plural forms, and finally a semantic model whose primary
    /// entity carries the same name.
    pub fn resolve_target_model(&self, entity_name: &str) -> Result<String, ResolveError> {
        let candidates = self.candidate_models();
        let lookup = |wanted: &str| {
            candidates
                .iter()
                .find(|c| c.eq_ignore_ascii_case(wanted))
                .cloned()
        };

        let forms = name_forms(entity_name);
        let mut tried = forms.clone();
        for prefix in &self.config.entity_prefixes {
            tried.extend(forms.iter().map(|form| format!("{}{}", prefix, form)));
        }

        if let Some(found) = tried.iter().find_map(|name| lookup(name)) {
            return Ok(found);
        }

        let via_semantic = self.file.semantic_models.iter().find(|sm| {
            sm.primary_entity()
                .is_some_and(|e| e.name.eq_ignore_ascii_case(entity_name))
        });

        if let Some(sm) = via_semantic {
            let base = sm.base_model_name();
            tracing::debug!(
                entity = %entity_name,
                semantic_model = %sm.name,
                model = %base,
                "Resolved entity through semantic model primary entity"
            );
            return Ok(base);
        }

        Err(ResolveError::ModelNotFound {
            entity: entity_name.to_string(),
            tried,
        })
    }

    /// Find the primary key column of a model
    ///
    /// Order: semantic primary entity, a column tested `unique` + `not_null`,
    /// a `primary_key` constraint, then naming patterns. `None` means the
    /// caller should fall back.
    pub fn resolve_primary_key(&self, model_name: &str) -> Option<String> {
        let from_semantic = self
            .file
            .semantic_model_for(model_name)
            .and_then(|sm| sm.primary_entity())
            .map(|e| e.column().to_string());

        if from_semantic.is_some() {
            return from_semantic;
        }

        let model = self
            .file
            .models
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(model_name))?;

        tested_key(model)
            .or_else(|| constrained_key(model))
            .or_else(|| self.named_key(model))
    }

    fn named_key(&self, model: &RawModel) -> Option<String> {
        let stripped = self
            .config
            .entity_prefixes
            .iter()
            .find_map(|p| model.name.to_lowercase().strip_prefix(&p.to_lowercase()).map(str::to_string))
            .unwrap_or_else(|| model.name.to_lowercase());

        let patterns = [
            "id".to_string(),
            format!("{}_id", model.name),
            format!("{}_id", stripped),
            format!("{}_id", singularize(&stripped)),
        ];

        patterns
            .iter()
            .find_map(|p| model.find_column(p))
            .map(|c| c.name.clone())
    }
}

fn tested_key(model: &RawModel) -> Option<String> {
    model
        .columns
        .iter()
        .find(|c| c.has_test("unique") && c.has_test("not_null"))
        .map(|c| c.name.clone())
}

fn constrained_key(model: &RawModel) -> Option<String> {
    model
        .columns
        .iter()
        .find(|c| c.is_primary_key())
        .map(|c| c.name.clone())
}

fn entity_label(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Primary => "Primary",
        EntityType::Foreign => "Foreign",
        EntityType::Unique => "Unique",
        EntityType::Natural => "Natural",
    }
}

/// The entity name, `+s`, and `y -> ies`
fn name_forms(name: &str) -> Vec<String> {
    let mut forms = vec![name.to_string(), format!("{}s", name)];
    if let Some(stem) = name.strip_suffix('y') {
        forms.push(format!("{}ies", stem));
    }
    forms
}

fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        format!("{}y", stem)
    } else if name.ends_with('s') && !name.ends_with("ss") {
        name[..name.len() - 1].to_string()
    } else {
        name.to_string()
    }
}
