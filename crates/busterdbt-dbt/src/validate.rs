//! Schema and file-level validation
//!
//! Two layers:
//! - structural validation of the raw YAML document, producing field-path
//!   issues for both accepted shapes;
//! - [`validate_dbt_file_for_transformation`], the file-level checks run on a
//!   typed [`DbtFile`] before transforming it.

use busterdbt_core::{FieldPath, Issue, IssueCode};
use serde_yaml::{Mapping, Value};

use crate::schema::DbtFile;

const ENTITY_TYPES: &[&str] = &["primary", "foreign", "unique", "natural"];
const MEASURE_TYPES: &[&str] = &["integer", "decimal", "float"];
const RELATIONSHIP_TYPES: &[&str] = &["many_to_one", "one_to_one", "one_to_many", "many_to_many"];
const CARDINALITIES: &[&str] = &["optional", "required"];

/// Outcome of file-level validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    /// False when any error was found
    pub valid: bool,

    /// Blocking problems
    pub errors: Vec<Issue>,

    /// Non-fatal problems
    pub warnings: Vec<Issue>,
}

impl ValidationResult {
    /// All issues, errors first
    pub fn into_issues(self) -> Vec<Issue> {
        self.errors.into_iter().chain(self.warnings).collect()
    }
}

/// File-level checks on a typed dbt file
///
/// - error if both `models` and `semantic_models` are empty
/// - warning if a semantic model refers to a model not declared in the file
/// - warning if a semantic model has measures but no `defaults.agg_time_dimension`
pub fn validate_dbt_file_for_transformation(file: &DbtFile) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if file.models.is_empty() && file.semantic_models.is_empty() {
        errors.push(Issue::error(
            IssueCode::NoModels,
            "dbt file must declare at least one model or semantic model",
        ));
    }

    for (i, sm) in file.semantic_models.iter().enumerate() {
        let path = FieldPath::root().key("semantic_models").index(i);
        let base = sm.base_model_name();

        if file.find_model(&base).is_none() {
            warnings.push(
                Issue::warning(
                    IssueCode::MissingBaseModel,
                    format!(
                        "Semantic model '{}' references model '{}' which is not declared in this file",
                        sm.name, base
                    ),
                )
                .at(path.key("model")),
            );
        }

        if !sm.measures.is_empty() && sm.agg_time_dimension().is_none() {
            warnings.push(
                Issue::warning(
                    IssueCode::MissingAggTimeDimension,
                    format!(
                        "Semantic model '{}' declares measures but no defaults.agg_time_dimension",
                        sm.name
                    ),
                )
                .at(path.key("defaults").key("agg_time_dimension")),
            );
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Structural validation of a document detected as a dbt schema file
pub fn validate_dbt_structure(document: &Value) -> Vec<Issue> {
    let mut v = Validator::default();
    let root = FieldPath::root();

    let Some(map) = v.mapping(document, &root) else {
        return v.issues;
    };

    if let Some(version) = map.get("version") {
        if !version.is_number() {
            v.invalid_type(&root.key("version"), "a number");
        }
    }

    if let Some(models) = v.optional_sequence(map, "models", &root) {
        for (i, model) in models.iter().enumerate() {
            v.model(model, &root.key("models").index(i));
        }
    }

    if let Some(semantic_models) = v.optional_sequence(map, "semantic_models", &root) {
        for (i, sm) in semantic_models.iter().enumerate() {
            v.semantic_model(sm, &root.key("semantic_models").index(i));
        }
    }

    v.issues
}

/// Structural validation of a document detected as a Buster model file
pub fn validate_buster_structure(document: &Value) -> Vec<Issue> {
    let mut v = Validator::default();
    let root = FieldPath::root();

    let Some(map) = v.mapping(document, &root) else {
        return v.issues;
    };

    v.required_str(map, "name", &root);
    v.optional_str(map, "description", &root);

    if let Some(dimensions) = v.optional_sequence(map, "dimensions", &root) {
        for (i, dim) in dimensions.iter().enumerate() {
            let path = root.key("dimensions").index(i);
            if let Some(dim) = v.mapping(dim, &path) {
                v.required_str(dim, "name", &path);
                v.required_str(dim, "type", &path);
                v.optional_bool(dim, "searchable", &path);
                v.optional_sequence(dim, "options", &path);
            }
        }
    }

    if let Some(measures) = v.optional_sequence(map, "measures", &root) {
        for (i, measure) in measures.iter().enumerate() {
            let path = root.key("measures").index(i);
            if let Some(measure) = v.mapping(measure, &path) {
                v.required_str(measure, "name", &path);
                v.required_one_of(measure, "type", MEASURE_TYPES, &path);
            }
        }
    }

    for key in ["metrics", "filters"] {
        if let Some(items) = v.optional_sequence(map, key, &root) {
            for (i, item) in items.iter().enumerate() {
                let path = root.key(key).index(i);
                if let Some(item) = v.mapping(item, &path) {
                    v.required_str(item, "name", &path);
                    v.required_str(item, "expr", &path);
                }
            }
        }
    }

    if let Some(relationships) = v.optional_sequence(map, "relationships", &root) {
        for (i, rel) in relationships.iter().enumerate() {
            v.relationship(rel, &root.key("relationships").index(i), true);
        }
    }

    v.optional_sequence(map, "clarifications", &root);

    v.issues
}

/// Accumulates structural issues while walking a document
#[derive(Default)]
struct Validator {
    issues: Vec<Issue>,
}

impl Validator {
    fn missing(&mut self, path: &FieldPath) {
        self.issues.push(
            Issue::error(IssueCode::MissingField, format!("Field '{}' is required", path))
                .at(path.clone()),
        );
    }

    fn invalid_type(&mut self, path: &FieldPath, expected: &str) {
        self.issues.push(
            Issue::error(
                IssueCode::InvalidType,
                format!("Field '{}' must be {}", path, expected),
            )
            .at(path.clone()),
        );
    }

    fn mapping<'a>(&mut self, value: &'a Value, path: &FieldPath) -> Option<&'a Mapping> {
        let mapping = value.as_mapping();
        if mapping.is_none() {
            let label = if path.to_string().is_empty() { "document" } else { "entry" };
            self.issues.push(
                Issue::error(IssueCode::InvalidType, format!("Expected {} to be a mapping", label))
                    .at(path.clone()),
            );
        }
        mapping
    }

    fn required_str<'a>(&mut self, map: &'a Mapping, key: &str, parent: &FieldPath) -> Option<&'a str> {
        let path = parent.key(key);
        match map.get(key) {
            None | Some(Value::Null) => {
                self.missing(&path);
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.invalid_type(&path, "a string");
                None
            }
        }
    }

    fn optional_str(&mut self, map: &Mapping, key: &str, parent: &FieldPath) {
        match map.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => self.invalid_type(&parent.key(key), "a string"),
        }
    }

    /// Strings and numbers both accepted (`expr: 1`)
    fn optional_scalar(&mut self, map: &Mapping, key: &str, parent: &FieldPath) {
        match map.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Number(_)) => {}
            Some(_) => self.invalid_type(&parent.key(key), "a string or number"),
        }
    }

    fn optional_bool(&mut self, map: &Mapping, key: &str, parent: &FieldPath) {
        match map.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(_)) => {}
            Some(_) => self.invalid_type(&parent.key(key), "a boolean"),
        }
    }

    fn optional_sequence<'a>(
        &mut self,
        map: &'a Mapping,
        key: &str,
        parent: &FieldPath,
    ) -> Option<&'a Vec<Value>> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::Sequence(seq)) => Some(seq),
            Some(_) => {
                self.invalid_type(&parent.key(key), "a list");
                None
            }
        }
    }

    fn required_one_of(&mut self, map: &Mapping, key: &str, allowed: &[&str], parent: &FieldPath) {
        if let Some(value) = self.required_str(map, key, parent) {
            self.check_one_of(value, allowed, &parent.key(key));
        }
    }

    fn optional_one_of(&mut self, map: &Mapping, key: &str, allowed: &[&str], parent: &FieldPath) {
        match map.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => self.check_one_of(s, allowed, &parent.key(key)),
            Some(_) => self.invalid_type(&parent.key(key), "a string"),
        }
    }

    fn check_one_of(&mut self, value: &str, allowed: &[&str], path: &FieldPath) {
        if !allowed.contains(&value) {
            self.issues.push(
                Issue::error(
                    IssueCode::InvalidValue,
                    format!(
                        "Field '{}' has unsupported value '{}' (expected one of: {})",
                        path,
                        value,
                        allowed.join(", ")
                    ),
                )
                .at(path.clone()),
            );
        }
    }

    fn model(&mut self, value: &Value, path: &FieldPath) {
        let Some(model) = self.mapping(value, path) else {
            return;
        };

        self.required_str(model, "name", path);
        self.optional_str(model, "description", path);

        if let Some(columns) = self.optional_sequence(model, "columns", path) {
            for (i, column) in columns.iter().enumerate() {
                self.column(column, &path.key("columns").index(i));
            }
        }

        if let Some(relationships) = self.optional_sequence(model, "relationships", path) {
            for (i, rel) in relationships.iter().enumerate() {
                self.relationship(rel, &path.key("relationships").index(i), false);
            }
        }
    }

    fn column(&mut self, value: &Value, path: &FieldPath) {
        let Some(column) = self.mapping(value, path) else {
            return;
        };

        self.required_str(column, "name", path);
        self.optional_str(column, "description", path);
        self.optional_str(column, "data_type", path);
        self.optional_sequence(column, "tests", path);
        self.optional_sequence(column, "data_tests", path);

        if let Some(constraints) = self.optional_sequence(column, "constraints", path) {
            for (i, constraint) in constraints.iter().enumerate() {
                let c_path = path.key("constraints").index(i);
                if let Some(constraint) = self.mapping(constraint, &c_path) {
                    self.required_str(constraint, "type", &c_path);
                }
            }
        }
    }

    fn relationship(&mut self, value: &Value, path: &FieldPath, name_required: bool) {
        let Some(rel) = self.mapping(value, path) else {
            return;
        };

        if name_required {
            self.required_str(rel, "name", path);
        } else {
            self.optional_str(rel, "name", path);
        }
        self.required_str(rel, "source_col", path);
        self.required_str(rel, "ref_col", path);
        self.optional_one_of(rel, "type", RELATIONSHIP_TYPES, path);
        self.optional_one_of(rel, "cardinality", CARDINALITIES, path);
        self.optional_str(rel, "description", path);
    }

    fn semantic_model(&mut self, value: &Value, path: &FieldPath) {
        let Some(sm) = self.mapping(value, path) else {
            return;
        };

        self.required_str(sm, "name", path);
        self.required_str(sm, "model", path);
        self.optional_str(sm, "description", path);

        if let Some(entities) = self.optional_sequence(sm, "entities", path) {
            for (i, entity) in entities.iter().enumerate() {
                let e_path = path.key("entities").index(i);
                if let Some(entity) = self.mapping(entity, &e_path) {
                    self.required_str(entity, "name", &e_path);
                    self.required_one_of(entity, "type", ENTITY_TYPES, &e_path);
                    self.optional_scalar(entity, "expr", &e_path);
                }
            }
        }

        if let Some(dimensions) = self.optional_sequence(sm, "dimensions", path) {
            for (i, dim) in dimensions.iter().enumerate() {
                let d_path = path.key("dimensions").index(i);
                if let Some(dim) = self.mapping(dim, &d_path) {
                    self.required_str(dim, "name", &d_path);
                    self.optional_str(dim, "type", &d_path);
                    self.optional_scalar(dim, "expr", &d_path);
                    self.optional_str(dim, "description", &d_path);
                }
            }
        }

        if let Some(measures) = self.optional_sequence(sm, "measures", path) {
            for (i, measure) in measures.iter().enumerate() {
                let m_path = path.key("measures").index(i);
                if let Some(measure) = self.mapping(measure, &m_path) {
                    self.required_str(measure, "name", &m_path);
                    self.required_str(measure, "agg", &m_path);
                    self.optional_scalar(measure, "expr", &m_path);
                    self.optional_str(measure, "description", &m_path);
                }
            }
        }
    }
}
