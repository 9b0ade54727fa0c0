/*!

Loading of manifests and rendering of scenario templates.

A manifest is either an OpenShift `Template` (a document with `parameters` and `objects`) or a
plain, possibly multi-document, YAML stream of objects. Parameters are substituted into string
values: `${NAME}` is replaced anywhere inside a string, and a string that is exactly `${{NAME}}`
is replaced by the parsed scalar (so `replicas: ${{REPLICAS}}` becomes a number).

!*/

use crate::error::{self, Result};
use lazy_static::lazy_static;
use log::{debug, trace};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use snafu::{ensure, ResultExt};
use std::collections::BTreeMap;
use std::path::Path;

const PARAMETER_REGEX: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";
const WHOLE_VALUE_PARAMETER_REGEX: &str = r"^\$\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}$";
const TEMPLATE_KIND: &str = "Template";

lazy_static! {
    static ref PARAMETER: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(PARAMETER_REGEX).unwrap()
    };
    static ref WHOLE_VALUE_PARAMETER: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(WHOLE_VALUE_PARAMETER_REGEX).unwrap()
    };
}

/// Where a manifest is read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ManifestSource {
    Http(String),
    File(String),
}

impl ManifestSource {
    /// Classify `location`: `http://` and `https://` URLs are fetched, `file://` URLs and anything
    /// else are read from the local file system.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            ManifestSource::Http(location.to_string())
        } else {
            ManifestSource::File(
                location
                    .strip_prefix("file://")
                    .unwrap_or(location)
                    .to_string(),
            )
        }
    }
}

/// Read the manifest at `location`.
pub async fn load(location: &str) -> Result<String> {
    debug!("Loading manifest '{}'", location);
    match ManifestSource::parse(location) {
        ManifestSource::Http(url) => {
            let response = reqwest::get(&url)
                .await
                .and_then(|response| response.error_for_status())
                .context(error::ManifestFetchSnafu {
                    manifest: location,
                })?;
            response
                .text()
                .await
                .context(error::ManifestFetchSnafu {
                    manifest: location,
                })
        }
        ManifestSource::File(path) => tokio::fs::read_to_string(&path)
            .await
            .context(error::ManifestReadSnafu { manifest: location }),
    }
}

/// The location of `file` under `base`, which is either a base URL or a directory.
pub fn join_location(base: &str, file: &str) -> String {
    match ManifestSource::parse(base) {
        ManifestSource::Http(url) => format!("{}/{}", url.trim_end_matches('/'), file),
        ManifestSource::File(dir) => Path::new(&dir).join(file).to_string_lossy().into_owned(),
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct TemplateParameter {
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    required: bool,
}

/// Split a YAML stream into its non-empty documents.
pub fn documents(source: &str, what: &str) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = Value::deserialize(document).context(error::ManifestParseSnafu { what })?;
        if !value.is_null() {
            values.push(value);
        }
    }
    Ok(values)
}

/// Render `source` with `params` and return the resulting objects. Template objects are
/// flattened; `List` documents are not expanded.
pub fn render(source: &str, what: &str, params: &BTreeMap<String, String>) -> Result<Vec<Value>> {
    let mut objects = Vec::new();
    for document in documents(source, what)? {
        if document["kind"].as_str() == Some(TEMPLATE_KIND) {
            objects.extend(render_template(document, what, params)?);
        } else {
            let mut document = document;
            substitute(&mut document, params);
            objects.push(document);
        }
    }
    trace!("Rendered {} object(s) from '{}'", objects.len(), what);
    Ok(objects)
}

fn render_template(
    template: Value,
    what: &str,
    params: &BTreeMap<String, String>,
) -> Result<Vec<Value>> {
    let declared: Vec<TemplateParameter> = match template.get("parameters") {
        Some(parameters) if !parameters.is_null() => serde_yaml::from_value(parameters.clone())
            .context(error::ManifestParseSnafu { what })?,
        _ => Vec::new(),
    };
    let mut values = BTreeMap::new();
    for parameter in declared {
        let value = params
            .get(&parameter.name)
            .cloned()
            .or(parameter.value)
            .filter(|value| !value.is_empty());
        match value {
            Some(value) => {
                values.insert(parameter.name, value);
            }
            None => {
                ensure!(
                    !parameter.required,
                    error::ConfigMissingSnafu {
                        key: parameter.name
                    }
                );
                // Unset optional parameters render as empty, like `oc process`.
                values.insert(parameter.name, String::new());
            }
        }
    }
    for (name, value) in params {
        values.entry(name.clone()).or_insert_with(|| value.clone());
    }
    let objects = match template.get("objects") {
        Some(Value::Sequence(objects)) => objects.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return error::ManifestObjectSnafu {
                reason: format!("'objects' of template '{}' is not a list", what),
            }
            .fail()
        }
    };
    Ok(objects
        .into_iter()
        .map(|mut object| {
            substitute(&mut object, &values);
            object
        })
        .collect())
}

/// Substitute parameters into every string value of `value`. Unknown parameters are left as they
/// are.
pub fn substitute(value: &mut Value, params: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            if let Some(replacement) = whole_value_parameter(s, params) {
                *value = replacement;
            } else if PARAMETER.is_match(s) {
                let replaced = PARAMETER
                    .replace_all(s, |captures: &Captures<'_>| {
                        params
                            .get(&captures[1])
                            .cloned()
                            .unwrap_or_else(|| captures[0].to_string())
                    })
                    .into_owned();
                *s = replaced;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                substitute(item, params);
            }
        }
        Value::Mapping(mapping) => {
            for (_, item) in mapping.iter_mut() {
                substitute(item, params);
            }
        }
        _ => {}
    }
}

fn whole_value_parameter(s: &str, params: &BTreeMap<String, String>) -> Option<Value> {
    let name = WHOLE_VALUE_PARAMETER.captures(s)?.get(1)?.as_str();
    let raw = params.get(name)?;
    Some(serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone())))
}

/// Serialize `objects` as a multi-document YAML stream.
pub fn to_yaml(objects: &[Value], what: &str) -> Result<String> {
    let mut out = String::new();
    for object in objects {
        let document = serde_yaml::to_string(object).context(error::ManifestParseSnafu { what })?;
        let document = document.strip_prefix("---\n").unwrap_or(&document);
        out.push_str("---\n");
        out.push_str(document);
        if !document.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}
