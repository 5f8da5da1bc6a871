//! Binding orchestration: classify, resolve, shape, then issue binds.

use super::classify::{BindMode, ParameterClassifier};
use super::length::{LengthResolver, LengthSpec};
use super::shaper::{ShapedValue, ValueShaper};
use super::type_resolver::{TypeResolver, TypeToken};
use super::value::{BindValue, ParamValue, ParameterMap};
use super::wire_type::{CustomType, WireType};
use crate::config::BindingsConfig;
use crate::constants::{DRIVER_DECIDES, PLACEHOLDER_PREFIX};
use crate::driver::BindDriver;
use crate::error::{Error, Result};
use crate::statement::SqlKind;
use indexmap::IndexMap;

/// Placeholder for a parameter name (`:name`).
pub fn placeholder(name: &str) -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, name)
}

/// Merge parameter maps; keys in `new` replace those in `existing`.
///
/// Replaced keys keep their original position; new keys are appended.
pub fn merge(existing: &ParameterMap, new: &ParameterMap) -> ParameterMap {
    let mut merged = existing.clone();
    for (name, value) in new {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// One parameter after resolution, and whether the driver accepted it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub name: String,
    pub mode: BindMode,
    /// `None` for plain scalars: the driver picks the type.
    pub wire_type: Option<WireType>,
    pub length: LengthSpec,
    /// Value as bound; replaced by the driver's value for OUT parameters
    /// after [`BoundParameters::refresh_out_values`].
    pub value: ShapedValue,
    pub bound: bool,
}

impl BoundParameter {
    pub fn placeholder(&self) -> String {
        placeholder(&self.name)
    }

    pub fn is_out(&self) -> bool {
        self.mode.is_out()
    }
}

/// Bound parameters by name, in bind order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    params: IndexMap<String, BoundParameter>,
}

impl BoundParameters {
    fn insert(&mut self, param: BoundParameter) {
        self.params.insert(param.name.clone(), param);
    }

    pub fn get(&self, name: &str) -> Option<&BoundParameter> {
        self.params.get(name)
    }

    /// Like [`BoundParameters::get`] but fails with `UnknownParameter`.
    pub fn require(&self, name: &str) -> Result<&BoundParameter> {
        self.get(name).ok_or_else(|| Error::UnknownParameter {
            name: name.to_string(),
        })
    }

    /// Current value of a parameter.
    pub fn value(&self, name: &str) -> Option<&ShapedValue> {
        self.get(name).map(|p| &p.value)
    }

    /// Current scalar value of a parameter.
    pub fn scalar(&self, name: &str) -> Option<&BindValue> {
        self.value(name).and_then(ShapedValue::as_scalar)
    }

    /// Name to bind success, in bind order.
    pub fn results(&self) -> IndexMap<String, bool> {
        self.params
            .iter()
            .map(|(name, p)| (name.clone(), p.bound))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundParameter> {
        self.params.values()
    }

    /// Copy driver-populated values of OUT/return parameters back in.
    ///
    /// Returns how many values were refreshed.
    pub fn refresh_out_values<D: BindDriver>(&mut self, driver: &D, stmt: &D::Statement) -> usize {
        let mut refreshed = 0;
        for param in self.params.values_mut().filter(|p| p.is_out()) {
            if let Some(value) = driver.out_value(stmt, &param.placeholder()) {
                tracing::debug!(name = %param.name, %value, "read OUT value");
                param.value = ShapedValue::Scalar(value);
                refreshed += 1;
            }
        }
        refreshed
    }
}

impl IntoIterator for BoundParameters {
    type Item = (String, BoundParameter);
    type IntoIter = indexmap::map::IntoIter<String, BoundParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

/// Binds a parameter map against a statement.
///
/// Holds its collaborators by value; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct BindingOrchestrator {
    classifier: ParameterClassifier,
    types: TypeResolver,
    lengths: LengthResolver,
    shaper: ValueShaper,
}

impl BindingOrchestrator {
    pub fn new(
        classifier: ParameterClassifier,
        types: TypeResolver,
        lengths: LengthResolver,
        shaper: ValueShaper,
    ) -> Self {
        Self {
            classifier,
            types,
            lengths,
            shaper,
        }
    }

    /// Build every collaborator from the bindings configuration.
    pub fn from_config(config: &BindingsConfig) -> Result<Self> {
        let types = TypeResolver::from_config(config)?;
        let shaper = ValueShaper::new(types.patterns().clone());
        Ok(Self::new(
            ParameterClassifier::from_config(config),
            types,
            LengthResolver::new(config.null_arrays),
            shaper,
        ))
    }

    pub fn classifier(&self) -> &ParameterClassifier {
        &self.classifier
    }

    pub fn types(&self) -> &TypeResolver {
        &self.types
    }

    /// Resolve one parameter without touching a driver.
    pub fn resolve(&self, name: &str, value: &ParamValue) -> Result<BoundParameter> {
        let mode = self.classifier.classify(name, value)?;
        let (mode, wire_type, length) = match mode {
            BindMode::ScalarIn => (mode, None, self.lengths.resolve(&ParamValue::Null, value, false)?),
            BindMode::ArrayIn => {
                let elements = value.array_elements().unwrap_or_default();
                let wire_type = self.types.infer_type(elements.iter().copied());
                let length = self.lengths.resolve(&ParamValue::Null, value, false)?;
                (mode, Some(wire_type), length)
            }
            BindMode::CompoundIn | BindMode::OutOrReturn | BindMode::CustomCollection => {
                self.resolve_compound(name, mode, value)?
            }
        };
        Ok(BoundParameter {
            name: name.to_string(),
            mode,
            wire_type,
            length,
            value: self.shaper.shape(value),
            bound: false,
        })
    }

    fn resolve_compound(
        &self,
        name: &str,
        mode: BindMode,
        value: &ParamValue,
    ) -> Result<(BindMode, Option<WireType>, LengthSpec)> {
        let descriptor = value.as_compound().ok_or_else(|| Error::MalformedOutParameter {
            name: name.to_string(),
        })?;
        let inner = descriptor.value.unwrap_compound();
        let length = self.lengths.resolve(descriptor.length, inner, true)?;
        let token = TypeToken::from_value(descriptor.type_token)?;

        if let Some(custom) = token.as_ref().and_then(|t| self.types.custom_collection(t)) {
            return Ok((BindMode::CustomCollection, Some(WireType::Custom(custom)), length));
        }

        let wire_type = match &token {
            Some(token) => self.types.resolve_explicit(token, mode.is_out())?,
            None if mode.is_out() => WireType::Chr,
            None => match inner.array_elements() {
                Some(elements) => self.types.infer_type(elements.iter().copied()),
                None if inner.is_null() => WireType::Chr,
                None => self.types.infer_type(std::iter::once(inner)),
            },
        };
        Ok((mode, Some(wire_type), length))
    }

    /// Bind every parameter in order.
    ///
    /// The first failure aborts the call; parameters after it are not bound.
    #[tracing::instrument(skip_all, fields(params = params.len()))]
    pub fn bind_all<D: BindDriver>(
        &self,
        driver: &mut D,
        stmt: Option<&mut D::Statement>,
        params: &ParameterMap,
    ) -> Result<BoundParameters> {
        let stmt = stmt.ok_or(Error::NoStatementHandle)?;
        let mut bound = BoundParameters::default();
        for (name, value) in params {
            let mut param = self.resolve(name, value)?;
            param.bound = self.issue(driver, stmt, &param)?;
            tracing::debug!(
                name = %param.name,
                mode = %param.mode,
                wire_type = ?param.wire_type,
                length = %param.length,
                bound = param.bound,
                "bound parameter"
            );
            bound.insert(param);
        }
        Ok(bound)
    }

    fn issue<D: BindDriver>(
        &self,
        driver: &mut D,
        stmt: &mut D::Statement,
        param: &BoundParameter,
    ) -> Result<bool> {
        let placeholder = param.placeholder();
        let ok = match (param.wire_type.as_ref().and_then(WireType::custom), &param.value) {
            (Some(custom), value) => self.bind_collection(driver, stmt, param, custom, value)?,
            (None, ShapedValue::Array(values)) => {
                let (max_table_length, max_item_length) = match param.length {
                    LengthSpec::Array {
                        max_table_length,
                        max_item_length,
                    } => (max_table_length, max_item_length),
                    LengthSpec::Scalar(_) => (values.len().max(1), DRIVER_DECIDES),
                };
                let wire_type = param.wire_type.clone().unwrap_or(WireType::Chr);
                driver.bind_array(
                    stmt,
                    &placeholder,
                    values,
                    max_table_length,
                    max_item_length,
                    &wire_type,
                )
            }
            (None, ShapedValue::Scalar(value)) => driver.bind_scalar(
                stmt,
                &placeholder,
                value,
                param.length.scalar_hint(),
                param.wire_type.as_ref(),
            ),
        };
        if let Some(err) = driver.last_error(stmt) {
            let err = Error::bind_failed(&param.name, &err);
            tracing::error!(name = %param.name, error = %err, "bind failed");
            return Err(err);
        }
        Ok(ok)
    }

    fn bind_collection<D: BindDriver>(
        &self,
        driver: &mut D,
        stmt: &mut D::Statement,
        param: &BoundParameter,
        custom: &CustomType,
        value: &ShapedValue,
    ) -> Result<bool> {
        let mut collection = driver
            .new_collection(&custom.type_name, Some(&custom.schema))
            .map_err(|e| Error::bind_failed(&param.name, &e))?;
        let elements = match value {
            ShapedValue::Scalar(BindValue::Null) => &[][..],
            other => other.elements(),
        };
        for element in elements {
            driver
                .append_to_collection(&mut collection, element)
                .map_err(|e| Error::bind_failed(&param.name, &e))?;
        }
        Ok(driver.bind_named_collection(stmt, &param.placeholder(), collection))
    }
}

/// Per-call staging of parameters in front of a [`BindingOrchestrator`].
///
/// Parameters staged for a call are merged, bound together, and the bound
/// set stays readable by name until the next bind.
#[derive(Debug, Clone)]
pub struct Bindings {
    orchestrator: BindingOrchestrator,
    staged: ParameterMap,
    bound: BoundParameters,
}

impl Bindings {
    pub fn new(orchestrator: BindingOrchestrator) -> Self {
        Self {
            orchestrator,
            staged: ParameterMap::new(),
            bound: BoundParameters::default(),
        }
    }

    pub fn from_config(config: &BindingsConfig) -> Result<Self> {
        Ok(Self::new(BindingOrchestrator::from_config(config)?))
    }

    pub fn orchestrator(&self) -> &BindingOrchestrator {
        &self.orchestrator
    }

    /// Merge parameters over the staged set.
    pub fn stage(&mut self, params: &ParameterMap) {
        self.staged = merge(&self.staged, params);
    }

    pub fn staged(&self) -> &ParameterMap {
        &self.staged
    }

    /// Drop staged and bound parameters.
    pub fn clear(&mut self) {
        self.staged.clear();
        self.bound = BoundParameters::default();
    }

    /// Stage `params` (if any) and bind the staged set.
    ///
    /// Returns bind success per parameter name. Pass-through SQL is refused.
    pub fn bind<D: BindDriver>(
        &mut self,
        kind: SqlKind,
        params: Option<&ParameterMap>,
        driver: &mut D,
        stmt: Option<&mut D::Statement>,
    ) -> Result<IndexMap<String, bool>> {
        let stmt = stmt.ok_or(Error::NoStatementHandle)?;
        if !kind.is_bindable() {
            return Err(Error::PassThroughUnsupported);
        }
        if let Some(params) = params {
            self.stage(params);
        }
        self.bound = BoundParameters::default();
        self.bound = self.orchestrator.bind_all(driver, Some(stmt), &self.staged)?;
        Ok(self.bound.results())
    }

    pub fn bound(&self) -> &BoundParameters {
        &self.bound
    }

    pub fn bound_mut(&mut self) -> &mut BoundParameters {
        &mut self.bound
    }

    /// Current value of a bound parameter.
    pub fn value(&self, name: &str) -> Option<&ShapedValue> {
        self.bound.value(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverError, Session};
    use crate::memory::{BindCall, MemoryDriver};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn orchestrator() -> BindingOrchestrator {
        BindingOrchestrator::from_config(&BindingsConfig::default()).unwrap()
    }

    fn params(v: serde_json::Value) -> ParameterMap {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_resolve_scalar_leaves_hints_to_driver() {
        let p = orchestrator().resolve("url", &ParamValue::from("http://x")).unwrap();
        assert_eq!(p.mode, BindMode::ScalarIn);
        assert_eq!(p.wire_type, None);
        assert_eq!(p.length, LengthSpec::Scalar(-1));
        assert_eq!(p.placeholder(), ":url");
    }

    #[test]
    fn test_resolve_array_infers_type() {
        let p = orchestrator()
            .resolve("amounts", &ParamValue::from(vec!["1", "2.5"]))
            .unwrap();
        assert_eq!(p.mode, BindMode::ArrayIn);
        assert_eq!(p.wire_type, Some(WireType::Flt));
        assert_eq!(
            p.length,
            LengthSpec::Array {
                max_table_length: 2,
                max_item_length: -1
            }
        );
    }

    #[test]
    fn test_resolve_out_forces_string() {
        let p = orchestrator()
            .resolve("return_outvar", &ParamValue::compound(8, "int", ParamValue::Null))
            .unwrap();
        assert_eq!(p.mode, BindMode::OutOrReturn);
        assert_eq!(p.wire_type, Some(WireType::Chr));
        assert_eq!(p.length, LengthSpec::Scalar(8));
    }

    #[test]
    fn test_resolve_compound_without_type_infers() {
        let o = orchestrator();
        let p = o
            .resolve("ids", &ParamValue::compound(ParamValue::Null, ParamValue::Null, vec![1, 2]))
            .unwrap();
        assert_eq!(p.wire_type, Some(WireType::Int));
        let p = o
            .resolve("when", &ParamValue::compound(ParamValue::Null, ParamValue::Null, "2024-01-01"))
            .unwrap();
        assert_eq!(p.wire_type, Some(WireType::Odt));
        assert_eq!(p.length, LengthSpec::Scalar(-1));
    }

    #[test]
    fn test_resolve_custom_collection() {
        let p = orchestrator()
            .resolve(
                "tags",
                &ParamValue::compound(ParamValue::Null, "hr.tag_list", vec!["a", "b"]),
            )
            .unwrap();
        assert_eq!(p.mode, BindMode::CustomCollection);
        assert_eq!(
            p.wire_type,
            Some(WireType::Custom(CustomType::new("HR", "TAG_LIST")))
        );
    }

    #[test]
    fn test_bind_all_requires_statement() {
        let mut driver = MemoryDriver::new();
        let result = orchestrator().bind_all(&mut driver, None, &ParameterMap::new());
        assert!(matches!(result, Err(Error::NoStatementHandle)));
    }

    #[test]
    fn test_bind_all_issues_primitives_in_order() {
        let mut driver = MemoryDriver::new();
        let mut stmt = driver.statement("BEGIN app.pkg.p(:url, :ids, :return_outvar); END;");
        let bound = orchestrator()
            .bind_all(
                &mut driver,
                Some(&mut stmt),
                &params(json!({
                    "url": "http://x",
                    "ids": [1, 2, 3],
                    "return_outvar": {"length": 8, "type": "int", "value": null}
                })),
            )
            .unwrap();

        let results: Vec<(String, bool)> = bound.results().into_iter().collect();
        assert_eq!(
            results,
            vec![
                ("url".to_string(), true),
                ("ids".to_string(), true),
                ("return_outvar".to_string(), true),
            ]
        );
        assert_eq!(
            driver.bind_calls(),
            &[
                BindCall::Scalar {
                    placeholder: ":url".into(),
                    value: BindValue::Str("http://x".into()),
                    length: None,
                    wire_type: None,
                },
                BindCall::Array {
                    placeholder: ":ids".into(),
                    values: vec![BindValue::Int(1), BindValue::Int(2), BindValue::Int(3)],
                    max_table_length: 3,
                    max_item_length: -1,
                    wire_type: WireType::Int,
                },
                BindCall::Scalar {
                    placeholder: ":return_outvar".into(),
                    value: BindValue::Null,
                    length: Some(8),
                    wire_type: Some(WireType::Chr),
                },
            ]
        );
    }

    #[test]
    fn test_custom_collection_uses_collection_path() {
        let mut driver = MemoryDriver::new();
        let mut stmt = driver.statement("BEGIN hr.pkg.tag(:tags); END;");
        orchestrator()
            .bind_all(
                &mut driver,
                Some(&mut stmt),
                &params(json!({"tags": {"length": null, "type": "HR.TAG_LIST", "value": ["a", "b"]}})),
            )
            .unwrap();
        assert_eq!(
            driver.bind_calls(),
            &[BindCall::Collection {
                placeholder: ":tags".into(),
                schema: Some("HR".into()),
                type_name: "TAG_LIST".into(),
                elements: vec![BindValue::Str("a".into()), BindValue::Str("b".into())],
            }]
        );
    }

    #[test]
    fn test_first_failure_aborts() {
        let mut driver = MemoryDriver::new()
            .fail_bind(":b", DriverError::new(1036, "illegal variable name/number"));
        let mut stmt = driver.statement("BEGIN x.y.z(:a, :b, :c); END;");
        let err = orchestrator()
            .bind_all(
                &mut driver,
                Some(&mut stmt),
                &params(json!({"a": 1, "b": 2, "c": 3})),
            )
            .unwrap_err();
        match err {
            Error::BindFailed { name, code, sql, .. } => {
                assert_eq!(name, "b");
                assert_eq!(code, 1036);
                assert_eq!(sql, "BEGIN x.y.z(:a, :b, :c); END;");
            }
            other => panic!("Expected BindFailed, got {:?}", other),
        }
        // :c was never attempted.
        assert_eq!(driver.bind_calls().len(), 2);
    }

    #[test]
    fn test_invalid_type_is_surfaced_before_binding() {
        let mut driver = MemoryDriver::new();
        let mut stmt = driver.statement("BEGIN x.y.z(:a); END;");
        let err = orchestrator()
            .bind_all(
                &mut driver,
                Some(&mut stmt),
                &params(json!({"a": {"length": null, "type": "blob", "value": "x"}})),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBindType { .. }));
        assert!(driver.bind_calls().is_empty());
    }

    #[test]
    fn test_refresh_out_values() {
        let mut driver = MemoryDriver::new().with_out_value(":return_outvar", BindValue::Str("42".into()));
        let mut stmt = driver.statement("BEGIN :return_outvar := x.y.z(:a); END;");
        let mut bound = orchestrator()
            .bind_all(
                &mut driver,
                Some(&mut stmt),
                &params(json!({
                    "return_outvar": {"length": 8, "type": "chr", "value": null},
                    "a": "in"
                })),
            )
            .unwrap();
        driver.execute(&mut stmt).unwrap();
        assert_eq!(bound.refresh_out_values(&driver, &stmt), 1);
        assert_eq!(bound.scalar("return_outvar"), Some(&BindValue::Str("42".into())));
        assert_eq!(bound.scalar("a"), Some(&BindValue::Str("in".into())));
    }

    #[test]
    fn test_merge_replaces_and_appends() {
        let existing = params(json!({"a": 1, "b": 2}));
        let new = params(json!({"b": 20, "c": 30}));
        let merged = merge(&existing, &new);
        assert_eq!(merged, params(json!({"a": 1, "b": 20, "c": 30})));
        let keys: Vec<&String> = merged.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_bindings_stage_and_bind() {
        let mut bindings = Bindings::from_config(&BindingsConfig::default()).unwrap();
        bindings.stage(&params(json!({"a": 1, "b": "x"})));
        let mut driver = MemoryDriver::new();
        let mut stmt = driver.statement("BEGIN x.y.z(:a, :b); END;");
        let results = bindings
            .bind(
                SqlKind::PackageCall,
                Some(&params(json!({"b": "y"}))),
                &mut driver,
                Some(&mut stmt),
            )
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            bindings.value("b"),
            Some(&ShapedValue::Scalar(BindValue::Str("y".into())))
        );
    }

    #[test]
    fn test_bindings_refuse_pass_through() {
        let mut bindings = Bindings::from_config(&BindingsConfig::default()).unwrap();
        let mut driver = MemoryDriver::new();
        let mut stmt = driver.statement("SELECT a FROM t");
        let err = bindings
            .bind(SqlKind::PassThrough, None, &mut driver, Some(&mut stmt))
            .unwrap_err();
        assert!(matches!(err, Error::PassThroughUnsupported));

        let err = bindings
            .bind::<MemoryDriver>(SqlKind::PackageCall, None, &mut driver, None)
            .unwrap_err();
        assert!(matches!(err, Error::NoStatementHandle));
    }
}
