//! File orchestrator
//!
//! Runs every semantic model through the full pipeline, then every plain
//! model that no semantic model already covered. Failures are contained per
//! model: the rest of the file still transforms.

use busterdbt_core::{
    Config, Issue, IssueCode, ModelIssues, OutputModel, Relationship, Severity, TransformReport,
};
use busterdbt_dbt::{
    load_str, validate_dbt_file_for_transformation, DbtFile, LoadedFile, RawModel,
    RawSemanticModel,
};
use std::collections::HashSet;

use crate::columns::transform_columns;
use crate::dimensions::merge_dimensions;
use crate::entities::EntityResolver;
use crate::error::TransformError;
use crate::filters::dimension_to_filters;
use crate::metrics::measure_to_metric;
use crate::relationships::{extract_relationships_from_model, merge_relationships};

/// Everything a transformation produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutcome {
    /// One record per distinct model name
    pub models: Vec<OutputModel>,

    /// File-level and per-model issues
    pub issues: Vec<ModelIssues>,
}

impl TransformOutcome {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ModelIssues::has_errors)
    }

    /// Issues recorded against one model
    pub fn issues_for<'s>(&'s self, model: &'s str) -> impl Iterator<Item = &'s Issue> + 's {
        self.issues
            .iter()
            .filter(move |group| group.model.as_deref() == Some(model))
            .flat_map(|group| group.issues.iter())
    }

    pub fn report(&self) -> TransformReport {
        TransformReport::new(&self.models, self.issues.clone())
    }
}

/// Transform raw file text of either shape
///
/// Buster files are returned as-is after validation.
pub fn transform_source(text: &str, config: &Config) -> Result<TransformOutcome, TransformError> {
    match load_str(text)? {
        LoadedFile::Dbt(file) => transform_dbt_file(&file, config),
        LoadedFile::Buster(model) => Ok(TransformOutcome {
            models: vec![model],
            issues: Vec::new(),
        }),
    }
}

/// Transform a parsed dbt file
///
/// Fails only when file-level validation fails; everything else ends up in
/// [`TransformOutcome::issues`].
pub fn transform_dbt_file(file: &DbtFile, config: &Config) -> Result<TransformOutcome, TransformError> {
    let validation = validate_dbt_file_for_transformation(file);
    if !validation.valid {
        let issues = validation
            .into_issues()
            .into_iter()
            .map(|i| config.severity.apply(i))
            .collect();
        return Err(TransformError::Validation(issues));
    }

    let mut transformer = FileTransformer::new(file, config);
    transformer.record(None, validation.warnings);
    transformer.semantic_pass();
    transformer.fallback_pass();

    let outcome = transformer.finish();
    tracing::info!(
        models = outcome.models.len(),
        errors = outcome.has_errors(),
        "Transformed dbt file"
    );
    Ok(outcome)
}

/// Per-file state: produced models, processed names and collected issues
struct FileTransformer<'a> {
    file: &'a DbtFile,
    config: &'a Config,
    resolver: EntityResolver<'a>,
    processed: HashSet<String>,
    outcome: TransformOutcome,
}

impl<'a> FileTransformer<'a> {
    fn new(file: &'a DbtFile, config: &'a Config) -> Self {
        Self {
            file,
            config,
            resolver: EntityResolver::new(file, config),
            processed: HashSet::new(),
            outcome: TransformOutcome::default(),
        }
    }

    fn finish(self) -> TransformOutcome {
        self.outcome
    }

    /// Store issues after severity overrides; empty groups are dropped
    fn record(&mut self, model: Option<&str>, issues: Vec<Issue>) {
        if issues.is_empty() {
            return;
        }

        let issues = issues
            .into_iter()
            .map(|i| self.config.severity.apply(i))
            .collect();

        self.outcome.issues.push(match model {
            Some(name) => ModelIssues::for_model(name, issues),
            None => ModelIssues::file(issues),
        });
    }

    /// Claim a model name; false when it was already produced, failed or skipped
    fn claim(&mut self, name: &str) -> bool {
        self.processed.insert(name.to_lowercase())
    }

    fn skip_if_listed(&mut self, name: &str) -> bool {
        if !self.config.allowlist.is_model_skipped(name) {
            return false;
        }

        tracing::debug!(model = %name, "Model skipped by allowlist");
        self.record(
            Some(name),
            vec![Issue::new(
                IssueCode::ModelSkipped,
                Severity::Info,
                format!("Model '{}' matches allowlist.skip_models", name),
            )],
        );
        true
    }

    fn model_index(&self, name: &str) -> Option<(usize, &'a RawModel)> {
        self.file
            .models
            .iter()
            .enumerate()
            .find(|(_, m)| m.name.eq_ignore_ascii_case(name))
    }

    fn semantic_pass(&mut self) {
        let file = self.file;

        for (idx, semantic) in file.semantic_models.iter().enumerate() {
            let base = semantic.base_model_name();

            if !self.claim(&base) {
                tracing::warn!(
                    semantic_model = %semantic.name,
                    model = %base,
                    "Model already produced, skipping semantic model"
                );
                self.record(
                    Some(&base),
                    vec![Issue::warning(
                        IssueCode::ModelSkipped,
                        format!(
                            "Semantic model '{}' targets '{}', which is already produced",
                            semantic.name, base
                        ),
                    )
                    .at(format!("semantic_models[{}]", idx))],
                );
                continue;
            }

            if self.skip_if_listed(&base) {
                continue;
            }

            match self.transform_semantic_model(&base, semantic) {
                Ok((model, issues)) => {
                    tracing::debug!(model = %model.name, "Transformed semantic model");
                    self.record(Some(&base), issues);
                    self.outcome.models.push(model);
                }
                Err(e) => {
                    tracing::error!(
                        semantic_model = %semantic.name,
                        model = %base,
                        error = %e,
                        "Failed to transform model"
                    );
                    let issues = e
                        .to_issues()
                        .into_iter()
                        .map(|i| i.at(format!("semantic_models[{}]", idx)))
                        .collect();
                    self.record(Some(&base), issues);
                }
            }
        }
    }

    fn fallback_pass(&mut self) {
        let file = self.file;

        for (idx, model) in file.models.iter().enumerate() {
            if !self.claim(&model.name) || self.skip_if_listed(&model.name) {
                continue;
            }

            let (output, issues) = self.transform_plain_model(idx, model);
            tracing::debug!(model = %output.name, "Transformed plain model");
            self.record(Some(&model.name), issues);
            self.outcome.models.push(output);
        }
    }

    fn transform_semantic_model(
        &self,
        name: &str,
        semantic: &RawSemanticModel,
    ) -> Result<(OutputModel, Vec<Issue>), TransformError> {
        let base = self.model_index(name);
        let mut issues = Vec::new();

        let columns = base.map(|(_, m)| m.columns.as_slice()).unwrap_or_default();
        let transformed = transform_columns(columns);

        let dimensions = merge_dimensions(&transformed.dimensions, &semantic.dimensions);

        let measures = transformed
            .measures
            .into_iter()
            .filter(|m| {
                !semantic
                    .dimensions
                    .iter()
                    .any(|d| d.name.eq_ignore_ascii_case(&m.name))
            })
            .collect();

        let metrics = semantic
            .measures
            .iter()
            .map(measure_to_metric)
            .collect::<Result<Vec<_>, _>>()?;

        let filters = if self.config.generate_filters {
            semantic.dimensions.iter().flat_map(dimension_to_filters).collect()
        } else {
            Vec::new()
        };

        let declared = base.map(|(_, m)| declared_relationships(m)).unwrap_or_default();

        let resolution = self.resolver.resolve_entities(&semantic.entities, name);
        issues.extend(resolution.issues);

        let tested = match base {
            Some((idx, m)) => {
                let extracted = extract_relationships_from_model(m);
                issues.extend(prefix_paths(idx, extracted.issues));
                extracted.relationships
            }
            None => Vec::new(),
        };

        let relationships = merge_relationships(&[
            declared.as_slice(),
            resolution.relationships.as_slice(),
            tested.as_slice(),
        ]);

        let description = non_empty(semantic.description.as_deref())
            .or_else(|| base.and_then(|(_, m)| non_empty(m.description.as_deref())))
            .unwrap_or_default();

        let model = OutputModel {
            name: base.map(|(_, m)| m.name.clone()).unwrap_or_else(|| name.to_string()),
            description,
            dimensions,
            measures,
            metrics,
            filters,
            relationships,
            clarifications: Vec::new(),
        };

        Ok((model, issues))
    }

    /// No semantic layer: columns and relationships only
    fn transform_plain_model(&self, idx: usize, model: &RawModel) -> (OutputModel, Vec<Issue>) {
        let transformed = transform_columns(&model.columns);
        let extracted = extract_relationships_from_model(model);
        let declared = declared_relationships(model);

        let relationships =
            merge_relationships(&[declared.as_slice(), extracted.relationships.as_slice()]);

        let output = OutputModel {
            name: model.name.clone(),
            description: non_empty(model.description.as_deref()).unwrap_or_default(),
            dimensions: transformed.dimensions,
            measures: transformed.measures,
            metrics: Vec::new(),
            filters: Vec::new(),
            relationships,
            clarifications: Vec::new(),
        };

        (output, prefix_paths(idx, extracted.issues))
    }
}

fn declared_relationships(model: &RawModel) -> Vec<Relationship> {
    model
        .relationships
        .iter()
        .map(|r| r.to_relationship())
        .collect()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty()).map(str::to_string)
}

/// Anchor model-relative issue paths at `models[idx]`
fn prefix_paths(idx: usize, issues: Vec<Issue>) -> Vec<Issue> {
    issues
        .into_iter()
        .map(|issue| {
            let path = if issue.path.is_empty() {
                format!("models[{}]", idx)
            } else {
                format!("models[{}].{}", idx, issue.path)
            };
            issue.at(path)
        })
        .collect()
}
