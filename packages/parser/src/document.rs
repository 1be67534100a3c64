//! Serde model of DSL documents.
//!
//! Documents are JSON trees of components and elements. Control-flow keys
//! (`if`, `for`, ...) and prop values stay as raw JSON here: they are DSL
//! values that only get meaning once resolved against a render context.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub type JsonMap = IndexMap<String, JsonValue>;

/// A node in the render tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    pub id: String,

    #[serde(rename = "type")]
    pub element_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub props: JsonMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<JsonValue>,

    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<JsonValue>,

    #[serde(rename = "elseIf", default, skip_serializing_if = "Option::is_none")]
    pub else_if_condition: Option<JsonValue>,

    /// Rendered when `if`/`elseIf` are both falsy; validated when rendered
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_branch: Option<JsonValue>,

    #[serde(rename = "for", default, skip_serializing_if = "Option::is_none")]
    pub for_directive: Option<ForDirective>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformOverrides>,

    #[serde(rename = "link-to", default, skip_serializing_if = "Option::is_none")]
    pub link_to: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<JsonValue>,

    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<JsonValue>,
}

impl UIElement {
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            key: None,
            props: JsonMap::new(),
            children: None,
            if_condition: None,
            else_if_condition: None,
            else_branch: None,
            for_directive: None,
            platform: None,
            link_to: None,
            query: None,
            meta: None,
            slots: None,
        }
    }

    pub fn from_json(value: &JsonValue) -> Result<Self, serde_json::Error> {
        UIElement::deserialize(value)
    }

    pub fn has_conditional(&self) -> bool {
        self.if_condition.is_some()
    }
}

/// `for: { in, as, index?, key? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForDirective {
    #[serde(rename = "in")]
    pub source: JsonValue,

    #[serde(rename = "as")]
    pub item: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<JsonValue>,
}

/// Per-platform partial element overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<JsonMap>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Web,
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Web => "web",
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

/// Shallow-merge the `platform.<name>` override onto a raw element.
///
/// Returns `None` when the node has no override for that platform so callers
/// can keep borrowing the original.
pub fn apply_platform_override(node: &JsonValue, platform: Platform) -> Option<JsonValue> {
    let JsonValue::Object(fields) = node else {
        return None;
    };
    let overrides = fields.get("platform")?.get(platform.as_str())?.as_object()?;
    let mut merged = fields.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    Some(JsonValue::Object(merged))
}

/// Navigation intent attached through `link-to`
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Target id given directly, possibly as a DSL value
    Direct(JsonValue),
    /// `{ ui, params? }`
    Detailed {
        ui: JsonValue,
        params: Option<JsonMap>,
    },
}

impl LinkTarget {
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Object(fields) if fields.contains_key("ui") => {
                let ui = fields.get("ui").cloned().unwrap_or(JsonValue::Null);
                let params = fields.get("params").and_then(|params| {
                    params
                        .as_object()
                        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                });
                Some(LinkTarget::Detailed { ui, params })
            }
            other => Some(LinkTarget::Direct(other.clone())),
        }
    }
}

/// A stateful unit wrapping a render tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIComponent {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub props: JsonMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub states: JsonMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub methods: IndexMap<String, MethodDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectDef>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: JsonMap,

    pub render: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QuerySpec>,
}

impl UIComponent {
    pub fn from_json(value: &JsonValue) -> Result<Self, serde_json::Error> {
        UIComponent::deserialize(value)
    }

    /// Component nodes are the objects carrying a `render` tree
    pub fn is_component(value: &JsonValue) -> bool {
        value
            .as_object()
            .map(|fields| fields.contains_key("render"))
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    #[serde(rename = "fn")]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDef {
    #[serde(rename = "fn")]
    pub source: String,

    /// Accepted but not used for scheduling: effects run once per mount
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
}

/// Declarative data-fetch descriptor. Carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch_policy: Option<RefetchPolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefetchPolicy {
    CacheFirst,
    NetworkOnly,
    CacheAndNetwork,
}

/// Named step of a `$transform` pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<JsonValue>,
}

/// Classification of a DSL value, in resolution order
#[derive(Debug, Clone, PartialEq)]
pub enum DslValue<'a> {
    /// `{ $exp, $deps? }`
    Expression { source: &'a str, deps: Vec<String> },
    /// `{ $bind, $transform? }`
    Binding {
        path: &'a str,
        transforms: Vec<Transform>,
    },
    /// String carrying `${...}` or `{{...}}` markers
    Template(&'a str),
    Literal(&'a JsonValue),
}

impl<'a> DslValue<'a> {
    pub fn classify(value: &'a JsonValue) -> Self {
        match value {
            JsonValue::Object(fields) => {
                if let Some(source) = fields
                    .get("$exp")
                    .and_then(JsonValue::as_str)
                    .filter(|source| !source.is_empty())
                {
                    let deps = fields
                        .get("$deps")
                        .and_then(|deps| Vec::<String>::deserialize(deps).ok())
                        .unwrap_or_default();
                    return DslValue::Expression { source, deps };
                }
                if let Some(path) = fields
                    .get("$bind")
                    .and_then(JsonValue::as_str)
                    .filter(|path| !path.is_empty())
                {
                    let transforms = fields
                        .get("$transform")
                        .and_then(|steps| Vec::<Transform>::deserialize(steps).ok())
                        .unwrap_or_default();
                    return DslValue::Binding { path, transforms };
                }
                DslValue::Literal(value)
            }
            JsonValue::String(text) if has_interpolation(text) => DslValue::Template(text),
            _ => DslValue::Literal(value),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !matches!(self, DslValue::Literal(_))
    }
}

/// Whether a string contains `${` or `{{` interpolation markers
pub fn has_interpolation(text: &str) -> bool {
    text.contains("${") || text.contains("{{")
}
