//! Compilation of Schema Objects into a conversion graph.
//!
//! A [`Compiler`] owns the document, a [`RefResolver`] for it and the
//! [`GraphBuilder`] every compiled node goes into. Each schema location is
//! compiled once per polymorphism flag and memoized in the
//! [`CompileRegistry`]:
//!
//! - A schema that is only a `$ref` (an alias) compiles to the node of its
//!   target.
//! - Any other schema reserves its node id before its children are compiled,
//!   so a child that refers back to it closes the cycle with the reserved id.
//! - A chain of aliases that comes back to itself without passing through a
//!   real schema is reported as a recursive reference.
//!
//! All problems found in one compilation are reported together. A failed
//! compilation leaves no nodes behind.

pub mod formats;
pub mod keywords;
pub mod registry;


pub use formats::{FormatFactory, FormatRegistry, PlainNode};
pub use keywords::{KeywordCheck, Rule, SchemaType, check_schema, keyword_checks, schema_type};
pub use registry::{CompileKey, CompileRegistry, Entry};

use crate::config::{CompilerConfig, ConvertOptions};
use crate::error::{BuildError, BuildResult, Error, ErrorKind, SchemaError, SchemaResult};
use crate::graph::{Converter, Graph, GraphBuilder, NodeId};
use crate::messages::{MessageKey, Messages};
use crate::meta;
use crate::path::Path;
use crate::resolver::{RefResolver, uri};
use crate::types::{
    AdditionalProperties, AllOfType, AnyOfType, AnyType, ArrayType, BooleanType, Common,
    Convertible, DiscriminatedType, IntegerType, NotType, NumberType, NumericBounds, ObjectType,
    OneOfType, StringType, Violation,
};
use crate::value::Input;
use indexmap::IndexMap;
use keywords::Keywords;
use log::{debug, trace, warn};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use std::sync::Arc;

const ADDITIONAL_PROPERTIES_DENIED: &str = "When `additionalProperties` is False, no unspecified \
     properties are allowed. The following unspecified properties were found: {0}";

/// Why a schema did not compile.
enum Failure {
    Schema(SchemaError),
    /// An alias chain came back to a location it passed through. Caught by
    /// the `$ref` that entered the chain.
    Recursive,
}

impl From<SchemaError> for Failure {
    fn from(error: SchemaError) -> Self {
        Failure::Schema(error)
    }
}

type CompileResult<T> = Result<T, Failure>;

/// Move the errors of a failed child into `errors`.
fn collect(result: CompileResult<NodeId>, errors: &mut Vec<Error>) -> CompileResult<Option<NodeId>> {
    match result {
        Ok(id) => Ok(Some(id)),
        Err(Failure::Schema(error)) => {
            errors.extend(error);
            Ok(None)
        }
        Err(Failure::Recursive) => Err(Failure::Recursive),
    }
}

fn non_empty(value: Option<&JsonValue>) -> Option<&[JsonValue]> {
    value
        .and_then(JsonValue::as_array)
        .filter(|items| !items.is_empty())
        .map(Vec::as_slice)
}

/// `Cat` for `#/components/schemas/Cat` and `cat.yaml`.
fn reference_name(reference: &str) -> &str {
    let base = reference.rsplit('/').next().unwrap_or(reference);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

/// Compiles schemas of one document into one graph.
pub struct Compiler {
    config: CompilerConfig,
    messages: Messages,
    resolver: RefResolver,
    builder: GraphBuilder,
    registry: CompileRegistry,
    formats: FormatRegistry,
    /// Locations of the alias chain being followed.
    chain: Vec<Path>,
    checker: Option<Converter>,
}

impl Compiler {
    pub fn new(document: JsonValue, config: CompilerConfig) -> Self {
        let resolver = RefResolver::from_config(document, &config);
        Self::with_resolver(resolver, config)
    }

    /// Compile through a prepared resolver, e.g. one with extra documents
    /// or scheme handlers.
    pub fn with_resolver(resolver: RefResolver, config: CompilerConfig) -> Self {
        Self {
            messages: config.messages(),
            config,
            resolver,
            builder: GraphBuilder::new(),
            registry: CompileRegistry::new(),
            formats: FormatRegistry::new(),
            chain: Vec::new(),
            checker: None,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn resolver_mut(&mut self) -> &mut RefResolver {
        &mut self.resolver
    }

    /// Install or replace the factory of a `(type, format)` pair.
    pub fn register_format<F>(&mut self, schema_type: SchemaType, format: &str, factory: F)
    where
        F: Fn(PlainNode) -> Box<dyn Convertible> + Send + Sync + 'static,
    {
        self.formats.register(schema_type, format, Arc::new(factory));
    }

    /// Number of nodes compiled so far.
    pub fn len(&self) -> usize {
        self.builder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builder.is_empty()
    }

    /// Check the schema at `pointer`, and every schema it references,
    /// against the Schema Object model.
    pub fn check(&mut self, pointer: &str) -> SchemaResult<()> {
        let checker = match self.checker.take() {
            Some(checker) => checker,
            None => meta::schema_object(&self.messages).map_err(|e| {
                SchemaError::single(&Path::root(), ErrorKind::InvalidSchema, e.to_string())
            })?,
        };
        let result = self.check_with(&checker, pointer);
        self.checker = Some(checker);
        result
    }

    fn check_with(&mut self, checker: &Converter, pointer: &str) -> SchemaResult<()> {
        let (url, target) = self.resolve_pointer(pointer)?;
        let path = Path::from_uri(&url);
        trace!("Checking {}", path);

        self.resolver.push_scope(&url);
        let result = checker.convert_at(
            Input::Value(&target),
            &path,
            &ConvertOptions::specification(),
            Some(&mut self.resolver),
        );
        self.pop_scope(&url);
        result.map(|_| ())
    }

    /// Compile the schema at `pointer` and return its node.
    ///
    /// `pointer` is resolved like a `$ref` against the base URI, e.g.
    /// `#/components/schemas/Pet` or `pets.yaml#/Pet`.
    pub fn compile(&mut self, pointer: &str) -> SchemaResult<NodeId> {
        if self.config.check_schemas {
            self.check(pointer)?;
        }

        debug!("Compiling {}", pointer);
        let mark = self.builder.len();
        match self.compile_pointer(pointer) {
            Ok(id) => {
                debug!(
                    "Compiled {} to node {} ({} nodes in total)",
                    pointer,
                    id,
                    self.builder.len()
                );
                Ok(id)
            }
            Err(error) => {
                debug!("Compilation of {} failed with {} errors", pointer, error.len());
                self.builder.truncate(mark);
                self.registry.forget_from(mark);
                Err(error)
            }
        }
    }

    /// Build the graph of everything compiled so far.
    pub fn finish(self) -> BuildResult<Graph> {
        self.builder.build()
    }

    /// Build the graph and wrap it with `root` as entry point.
    pub fn into_converter(self, root: NodeId) -> BuildResult<Converter> {
        let graph = self.finish()?;
        if graph.get(root).is_none() {
            return Err(BuildError::UnknownNode(root.index()));
        }
        Ok(Converter::new(Arc::new(graph), root))
    }

    fn error(&self, path: &Path, key: MessageKey) -> Error {
        Violation::from_key(&self.messages, key, &[]).at(path)
    }

    fn resolve_pointer(&mut self, pointer: &str) -> SchemaResult<(String, JsonValue)> {
        self.resolver.resolve(pointer).map_err(|e| {
            debug!("Failed to resolve {}: {}", pointer, e);
            let path = Path::from_uri(&uri::join(self.resolver.resolution_scope(), pointer));
            SchemaError::new(self.error(&path, MessageKey::UnresolvableReference))
        })
    }

    fn pop_scope(&mut self, url: &str) {
        if let Err(e) = self.resolver.pop_scope() {
            warn!("Unbalanced resolution scope after '{}': {}", url, e);
        }
    }

    fn compile_pointer(&mut self, pointer: &str) -> SchemaResult<NodeId> {
        let (url, target) = self.resolve_pointer(pointer)?;
        let path = Path::from_uri(&url);
        let polymorphic = self.config.allow_polymorphism;

        self.resolver.push_scope(&url);
        self.chain = vec![path.clone()];
        let result = self.compile_value(&target, &path, &path, polymorphic);
        self.chain.clear();
        self.pop_scope(&url);

        match result {
            Ok(id) => Ok(id),
            Err(Failure::Schema(error)) => Err(error),
            Err(Failure::Recursive) => {
                self.registry.poison((path.clone(), polymorphic));
                Err(SchemaError::new(
                    self.error(&path, MessageKey::RecursiveReference),
                ))
            }
        }
    }

    /// Compile the schema found at `path`. `referencing` is where a failure
    /// to reuse an earlier result is reported.
    fn compile_value(
        &mut self,
        schema: &JsonValue,
        path: &Path,
        referencing: &Path,
        polymorphic: bool,
    ) -> CompileResult<NodeId> {
        let key = (path.clone(), polymorphic);
        match self.registry.get(&key) {
            Some(Entry::Reserved(id) | Entry::Defined(id)) => {
                trace!("Reusing node {} for {}", id, path);
                return Ok(id);
            }
            Some(Entry::Poisoned) => {
                return Err(SchemaError::new(self.error(referencing, MessageKey::BadReference)).into());
            }
            None => {}
        }

        let Some(map) = schema.as_object() else {
            return Err(SchemaError::new(self.error(path, MessageKey::MappingType)).into());
        };

        if let Some(reference) = map.get("$ref") {
            let result = match reference.as_str() {
                Some(reference) => self.compile_ref(reference, path, polymorphic),
                None => {
                    let error = Violation::from_key(
                        &self.messages,
                        MessageKey::InvalidKeyword,
                        &[&"$ref"],
                    )
                    .at(&path.child("$ref"));
                    Err(SchemaError::new(error).into())
                }
            };
            match &result {
                Ok(id) => self.registry.define(key, *id),
                Err(_) => self.registry.poison(key),
            }
            return result;
        }

        let id = self.builder.reserve();
        self.registry.reserve(key.clone(), id);

        // Children start alias chains of their own
        let chain = std::mem::take(&mut self.chain);
        let result = self.compile_node(map, path, polymorphic);
        self.chain = chain;

        let node = match result {
            Ok(node) => node,
            Err(failure) => {
                self.registry.poison(key);
                return Err(failure);
            }
        };
        if let Err(e) = self.builder.define_boxed(id, node) {
            self.registry.poison(key);
            return Err(SchemaError::single(path, ErrorKind::InvalidSchema, e.to_string()).into());
        }
        self.registry.define(key, id);
        Ok(id)
    }

    fn compile_ref(
        &mut self,
        reference: &str,
        referencing: &Path,
        polymorphic: bool,
    ) -> CompileResult<NodeId> {
        let (url, target) = match self.resolver.resolve(reference) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Failed to resolve '{}' at {}: {}", reference, referencing, e);
                return Err(SchemaError::new(
                    self.error(referencing, MessageKey::UnresolvableReference),
                )
                .into());
            }
        };
        let target_path = Path::from_uri(&url);
        trace!("Following $ref at {} to {}", referencing, target_path);

        if self.chain.contains(&target_path) {
            return Err(Failure::Recursive);
        }

        let key = (target_path.clone(), polymorphic);
        match self.registry.get(&key) {
            Some(Entry::Reserved(id) | Entry::Defined(id)) => return Ok(id),
            Some(Entry::Poisoned) => {
                return Err(SchemaError::new(self.error(referencing, MessageKey::BadReference)).into());
            }
            None => {}
        }

        self.resolver.push_scope(&url);
        self.chain.push(target_path.clone());
        let result = self.compile_value(&target, &target_path, &target_path, polymorphic);
        self.chain.pop();
        self.pop_scope(&url);

        match result {
            Ok(id) => Ok(id),
            Err(Failure::Schema(error)) => {
                let bad = self.error(referencing, MessageKey::BadReference);
                Err(SchemaError::new(bad).extended(error).into())
            }
            Err(Failure::Recursive) => {
                self.registry.poison(key);
                Err(SchemaError::new(self.error(referencing, MessageKey::RecursiveReference)).into())
            }
        }
    }

    fn compile_node(
        &mut self,
        schema: &Map<String, JsonValue>,
        path: &Path,
        polymorphic: bool,
    ) -> CompileResult<Box<dyn Convertible>> {
        let messages = self.messages.clone();
        let schema_type = keywords::schema_type(schema, &messages)
            .map_err(|violation| SchemaError::new(violation.at(path)))?;

        let mut keywords = Keywords::new(schema, path, &messages);
        if keywords.flag("deprecated") {
            warn!("The schema '{}' is deprecated", path);
        }
        let common = self.common(&mut keywords);
        let mut errors = Vec::new();

        let node: Option<Box<dyn Convertible>> = match schema_type {
            Some(SchemaType::String) => {
                let node = PlainNode::String(string_node(common, &mut keywords));
                Some(self.apply_format(node, &mut keywords, path))
            }
            Some(SchemaType::Number) => {
                let bounds = numeric_bounds(&mut keywords);
                let node = PlainNode::Number(NumberType::new(common).with_bounds(bounds));
                Some(self.apply_format(node, &mut keywords, path))
            }
            Some(SchemaType::Integer) => {
                let bounds = numeric_bounds(&mut keywords);
                let node = PlainNode::Integer(IntegerType::new(common).with_bounds(bounds));
                Some(self.apply_format(node, &mut keywords, path))
            }
            Some(SchemaType::Boolean) => {
                let node = PlainNode::Boolean(BooleanType::new(common));
                Some(self.apply_format(node, &mut keywords, path))
            }
            Some(SchemaType::Array) => self.compile_array(common, &mut keywords, path, &mut errors)?,
            Some(SchemaType::Object) => {
                let discriminator = keywords.mapping("discriminator");
                let subschemas = match discriminator {
                    Some(_) if polymorphic => self.subschemas(path),
                    _ => Vec::new(),
                };
                match discriminator {
                    Some(discriminator) if !subschemas.is_empty() => self.compile_polymorphic(
                        common,
                        &mut keywords,
                        discriminator,
                        subschemas,
                        &mut errors,
                    )?,
                    _ => self.compile_object(common, &mut keywords, path, &mut errors)?,
                }
            }
            None => self.compile_untyped(common, &mut keywords, path, &mut errors)?,
        };

        let mut all = keywords.into_errors();
        all.append(&mut errors);
        if let Some(error) = SchemaError::from_errors(all) {
            return Err(error.into());
        }
        node.ok_or_else(|| {
            SchemaError::single(path, ErrorKind::InvalidSchema, "Schema could not be compiled").into()
        })
    }

    fn common(&self, keywords: &mut Keywords<'_>) -> Common {
        let mut common = Common::new()
            .with_messages(self.messages.clone())
            .nullable(keywords.flag("nullable"));
        if let Some(default) = keywords.raw("default") {
            common = common.with_default(default.clone());
        }
        if let Some(values) = keywords.array("enum") {
            common = common.with_enum(values.to_vec());
        }
        common
    }

    fn apply_format(
        &self,
        node: PlainNode,
        keywords: &mut Keywords<'_>,
        path: &Path,
    ) -> Box<dyn Convertible> {
        let Some(format) = keywords.string("format") else {
            return node.into_boxed();
        };
        let schema_type = node.schema_type();
        if let Some(factory) = self.formats.get(schema_type, format) {
            return factory(node);
        }

        if self.config.strict_formats {
            let error = Violation::from_key(
                &self.messages,
                MessageKey::UnknownFormat,
                &[&format, &schema_type],
            )
            .at(&path.child("format"));
            keywords.push(error);
        } else {
            warn!(
                "Unknown format '{}' for type '{}' at {}; compiling as a plain {}",
                format, schema_type, path, schema_type
            );
        }
        node.into_boxed()
    }

    fn compile_array(
        &mut self,
        common: Common,
        keywords: &mut Keywords<'_>,
        path: &Path,
        errors: &mut Vec<Error>,
    ) -> CompileResult<Option<Box<dyn Convertible>>> {
        let Some(items) = keywords.raw("items") else {
            keywords.push(self.error(path, MessageKey::ItemsRequired));
            return Ok(None);
        };
        let items_path = path.child("items");
        let items = collect(
            self.compile_value(items, &items_path, &items_path, true),
            errors,
        )?;

        let mut node = match items {
            Some(items) => ArrayType::new(common, items),
            None => return Ok(None),
        };
        if let Some(min_items) = keywords.count("minItems") {
            node = node.with_min_items(min_items);
        }
        if let Some(max_items) = keywords.count("maxItems") {
            node = node.with_max_items(max_items);
        }
        if keywords.flag("uniqueItems") {
            node = node.with_unique_items(true);
        }
        if let Some(names) = keywords.array("x-uniqueItemProperties") {
            if names.iter().any(|name| !name.is_string()) {
                keywords.invalid("x-uniqueItemProperties");
            }
            let names = names.iter().filter_map(JsonValue::as_str).map(String::from);
            node = node.with_unique_item_properties(names.collect());
        }
        Ok(Some(Box::new(node)))
    }

    fn compile_object(
        &mut self,
        common: Common,
        keywords: &mut Keywords<'_>,
        path: &Path,
        errors: &mut Vec<Error>,
    ) -> CompileResult<Option<Box<dyn Convertible>>> {
        let messages = Messages::new()
            .with(MessageKey::AdditionalProperties, ADDITIONAL_PROPERTIES_DENIED)
            .merged(&self.messages);
        let mut builder = ObjectType::builder(common.with_messages(messages));
        let mut complete = true;

        if let Some(properties) = keywords.mapping("properties") {
            for (name, property) in properties {
                let property_path = path.child("properties").child(name);
                let (read_only, write_only) = self.access(property);
                match collect(
                    self.compile_value(property, &property_path, &property_path, true),
                    errors,
                )? {
                    Some(id) => builder = builder.property(name, id),
                    None => complete = false,
                }
                if read_only {
                    builder = builder.read_only(name);
                }
                if write_only {
                    builder = builder.write_only(name);
                }
            }
        }

        if let Some(required) = keywords.array("required") {
            if required.iter().any(|name| !name.is_string()) {
                keywords.invalid("required");
            }
            builder = builder.required(required.iter().filter_map(JsonValue::as_str));
        }

        match keywords.raw("additionalProperties") {
            None | Some(JsonValue::Bool(true)) => {}
            Some(JsonValue::Bool(false)) => {
                builder = builder.additional_properties(AdditionalProperties::Deny);
            }
            Some(schema @ JsonValue::Object(_)) => {
                let additional_path = path.child("additionalProperties");
                match collect(
                    self.compile_value(schema, &additional_path, &additional_path, true),
                    errors,
                )? {
                    Some(id) => {
                        builder = builder.additional_properties(AdditionalProperties::Schema(id));
                    }
                    None => complete = false,
                }
            }
            Some(_) => keywords.invalid("additionalProperties"),
        }

        if let Some(patterns) = keywords.mapping("x-patternProperties") {
            for (pattern, schema) in patterns {
                let pattern_path = path.child("x-patternProperties").child(pattern);
                match collect(
                    self.compile_value(schema, &pattern_path, &pattern_path, true),
                    errors,
                )? {
                    Some(id) => builder = builder.pattern_property(pattern, id),
                    None => complete = false,
                }
            }
        }

        if let Some(min) = keywords.count("minProperties") {
            builder = builder.min_properties(min);
        }
        if let Some(max) = keywords.count("maxProperties") {
            builder = builder.max_properties(max);
        }

        if !complete {
            return Ok(None);
        }
        match builder.build() {
            Ok(object) => Ok(Some(Box::new(object))),
            Err(BuildError::InvalidPattern { pattern, .. }) => {
                let pattern_path = path.child("x-patternProperties").child(pattern);
                errors.push(self.error(&pattern_path, MessageKey::RegexFormat));
                Ok(None)
            }
            Err(BuildError::ReadWriteOverlap(_)) => {
                errors.push(self.error(path, MessageKey::ReadOnlyAndWriteOnly));
                Ok(None)
            }
            Err(e) => {
                errors.push(Error::new(path.clone(), ErrorKind::InvalidSchema, e.to_string()));
                Ok(None)
            }
        }
    }

    /// `readOnly` and `writeOnly` of a property schema, following its
    /// `$ref`s.
    fn access(&mut self, schema: &JsonValue) -> (bool, bool) {
        let mut current = schema.clone();
        let mut seen = HashSet::new();
        let mut pushed = Vec::new();

        while let Some(reference) = current.get("$ref").and_then(JsonValue::as_str) {
            let Ok((url, target)) = self.resolver.resolve(reference) else {
                break;
            };
            if !seen.insert(url.clone()) {
                break;
            }
            self.resolver.push_scope(&url);
            pushed.push(url);
            current = target;
        }
        for url in pushed.iter().rev() {
            self.pop_scope(url);
        }

        let flag = |name: &str| current.get(name).and_then(JsonValue::as_bool) == Some(true);
        (flag("readOnly"), flag("writeOnly"))
    }

    /// The value at `path`, if its document is loaded.
    fn lookup(&self, path: &Path) -> Option<&JsonValue> {
        let mut current = self.resolver.document(path.base_uri())?;
        for part in path.parts() {
            current = match current {
                JsonValue::Object(map) => map.get(part)?,
                JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Siblings of the schema at `path` that extend it: untyped schemas whose
    /// first `allOf` entry references `path`.
    fn subschemas(&self, path: &Path) -> Vec<(String, Path, JsonValue)> {
        if path.is_root() {
            return Vec::new();
        }
        let parent = path.parent();
        let Some(siblings) = self.lookup(&parent).and_then(JsonValue::as_object) else {
            return Vec::new();
        };

        siblings
            .iter()
            .filter(|(_, schema)| {
                let Some(schema) = schema.as_object() else {
                    return false;
                };
                if !matches!(keywords::schema_type(schema, &self.messages), Ok(None)) {
                    return false;
                }
                schema
                    .get("allOf")
                    .and_then(JsonValue::as_array)
                    .and_then(|all_of| all_of.first())
                    .and_then(|first| first.get("$ref"))
                    .and_then(JsonValue::as_str)
                    .is_some_and(|reference| {
                        Path::from_uri(&uri::join(path.base_uri(), reference)) == *path
                    })
            })
            .map(|(name, schema)| (name.clone(), parent.child(name), schema.clone()))
            .collect()
    }

    /// An object extended by other schemas of its document, selected by the
    /// discriminator property.
    fn compile_polymorphic(
        &mut self,
        common: Common,
        keywords: &mut Keywords<'_>,
        discriminator: &Map<String, JsonValue>,
        subschemas: Vec<(String, Path, JsonValue)>,
        errors: &mut Vec<Error>,
    ) -> CompileResult<Option<Box<dyn Convertible>>> {
        let Some(property_name) = discriminator.get("propertyName").and_then(JsonValue::as_str)
        else {
            keywords.invalid("discriminator");
            return Ok(None);
        };

        let mut named: IndexMap<String, NodeId> = IndexMap::new();
        let mut complete = true;
        for (name, path, schema) in subschemas {
            match collect(self.compile_value(&schema, &path, &path, true), errors)? {
                Some(id) => {
                    named.insert(name, id);
                }
                None => complete = false,
            }
        }
        if !complete {
            return Ok(None);
        }

        let mut mapping = named.clone();
        if let Some(explicit) = discriminator.get("mapping").and_then(JsonValue::as_object) {
            for (value, target) in explicit {
                let Some(target) = target.as_str() else {
                    continue;
                };
                let id = named
                    .get(target)
                    .or_else(|| named.get(target.rsplit('/').next().unwrap_or(target)));
                if let Some(id) = id {
                    mapping.insert(value.clone(), *id);
                }
            }
        }

        Ok(Some(Box::new(DiscriminatedType::new(
            common,
            property_name,
            mapping,
        ))))
    }

    /// `discriminator` with `anyOf` or `oneOf`: the variants that are
    /// `$ref`s, keyed by the name of their target.
    fn compile_discriminated(
        &mut self,
        common: Common,
        keywords: &mut Keywords<'_>,
        discriminator: &Map<String, JsonValue>,
        (keyword, variants): (&str, &[JsonValue]),
        path: &Path,
        errors: &mut Vec<Error>,
    ) -> CompileResult<Option<Box<dyn Convertible>>> {
        let Some(property_name) = discriminator.get("propertyName").and_then(JsonValue::as_str)
        else {
            keywords.invalid("discriminator");
            return Ok(None);
        };

        let mut by_reference: IndexMap<&str, NodeId> = IndexMap::new();
        let mut complete = true;
        for (i, variant) in variants.iter().enumerate() {
            let Some(reference) = variant.get("$ref").and_then(JsonValue::as_str) else {
                continue;
            };
            let variant_path = path.child(keyword).child(i);
            match collect(
                self.compile_value(variant, &variant_path, &variant_path, true),
                errors,
            )? {
                Some(id) => {
                    by_reference.insert(reference, id);
                }
                None => complete = false,
            }
        }
        if !complete {
            return Ok(None);
        }

        let mut mapping: IndexMap<String, NodeId> = by_reference
            .iter()
            .map(|(reference, id)| (reference_name(reference).to_string(), *id))
            .collect();
        if let Some(explicit) = discriminator.get("mapping").and_then(JsonValue::as_object) {
            for (value, target) in explicit {
                if let Some(id) = target.as_str().and_then(|target| by_reference.get(target)) {
                    mapping.insert(value.clone(), *id);
                }
            }
        }

        Ok(Some(Box::new(DiscriminatedType::new(
            common,
            property_name,
            mapping,
        ))))
    }

    fn compile_untyped(
        &mut self,
        common: Common,
        keywords: &mut Keywords<'_>,
        path: &Path,
        errors: &mut Vec<Error>,
    ) -> CompileResult<Option<Box<dyn Convertible>>> {
        let any_of = non_empty(keywords.raw("anyOf"));
        let one_of = non_empty(keywords.raw("oneOf"));
        let all_of = non_empty(keywords.raw("allOf"));

        if keywords.contains("discriminator") {
            let discriminator = keywords.mapping("discriminator");
            let variants = any_of
                .map(|variants| ("anyOf", variants))
                .or_else(|| one_of.map(|variants| ("oneOf", variants)));
            if let (Some(discriminator), Some(variants)) = (discriminator, variants) {
                return self.compile_discriminated(
                    common,
                    keywords,
                    discriminator,
                    variants,
                    path,
                    errors,
                );
            }
        }

        if let Some(subschemas) = all_of {
            let subtypes = self.compile_each(subschemas, path, "allOf", errors, |i| i != 0)?;
            return Ok(subtypes.map(|subtypes| {
                Box::new(AllOfType::new(common, subtypes)) as Box<dyn Convertible>
            }));
        }
        if let Some(subschemas) = any_of {
            let subtypes = self.compile_each(subschemas, path, "anyOf", errors, |_| true)?;
            return Ok(subtypes.map(|subtypes| {
                Box::new(AnyOfType::new(common, subtypes)) as Box<dyn Convertible>
            }));
        }
        if let Some(subschemas) = one_of {
            let subtypes = self.compile_each(subschemas, path, "oneOf", errors, |_| true)?;
            return Ok(subtypes.map(|subtypes| {
                Box::new(OneOfType::new(common, subtypes)) as Box<dyn Convertible>
            }));
        }

        match keywords.raw("not") {
            Some(schema @ JsonValue::Object(_)) => {
                let not_path = path.child("not");
                let subtype = collect(self.compile_value(schema, &not_path, &not_path, true), errors)?;
                Ok(subtype.map(|subtype| {
                    Box::new(NotType::new(common, vec![subtype])) as Box<dyn Convertible>
                }))
            }
            Some(JsonValue::Array(subschemas)) if !subschemas.is_empty() => {
                let subtypes = self.compile_each(subschemas, path, "not", errors, |_| true)?;
                Ok(subtypes.map(|subtypes| {
                    Box::new(NotType::new(common, subtypes)) as Box<dyn Convertible>
                }))
            }
            Some(_) => {
                keywords.invalid("not");
                Ok(None)
            }
            None => Ok(Some(Box::new(AnyType::new(common)))),
        }
    }

    /// Compile `path/<keyword>/<i>` for every subschema. `polymorphic`
    /// decides the flag per index.
    fn compile_each(
        &mut self,
        subschemas: &[JsonValue],
        path: &Path,
        keyword: &str,
        errors: &mut Vec<Error>,
        polymorphic: impl Fn(usize) -> bool,
    ) -> CompileResult<Option<Vec<NodeId>>> {
        let mut subtypes = Vec::with_capacity(subschemas.len());
        let mut complete = true;
        for (i, subschema) in subschemas.iter().enumerate() {
            let subschema_path = path.child(keyword).child(i);
            match collect(
                self.compile_value(subschema, &subschema_path, &subschema_path, polymorphic(i)),
                errors,
            )? {
                Some(id) => subtypes.push(id),
                None => complete = false,
            }
        }
        Ok(complete.then_some(subtypes))
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("nodes", &self.builder.len())
            .field("compiled", &self.registry.len())
            .field("formats", &self.formats)
            .finish()
    }
}

fn string_node(common: Common, keywords: &mut Keywords<'_>) -> StringType {
    let mut node = StringType::new(common);
    if let Some(min_length) = keywords.count("minLength") {
        node = node.with_min_length(min_length);
    }
    if let Some(max_length) = keywords.count("maxLength") {
        node = node.with_max_length(max_length);
    }
    if let Some(pattern) = keywords.regex("pattern") {
        node = node.with_pattern(pattern);
    }
    node
}

fn numeric_bounds(keywords: &mut Keywords<'_>) -> NumericBounds {
    NumericBounds {
        minimum: keywords.number("minimum"),
        maximum: keywords.number("maximum"),
        exclusive_minimum: keywords.flag("exclusiveMinimum"),
        exclusive_maximum: keywords.flag("exclusiveMaximum"),
        multiple_of: keywords.positive("multipleOf"),
    }
}
