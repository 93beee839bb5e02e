//! Typed metadata attached to symbols.
//!
//! Add-ons are persisted as `{"type": <tag>, "data": <payload>}`. Decoding goes through
//! an [`AddOnRegistry`] that maps tags to decode functions; tags nobody registered (for
//! example written by a newer build) decode to [`AddOn::Unknown`] and are written back
//! byte-for-byte equivalent, so an older reader never corrupts a newer cache.

use crate::symbol::Range;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const BEAN_TAG: &str = "bean";
pub const REQUEST_MAPPING_TAG: &str = "request-mapping";
pub const WEBFLUX_HANDLER_TAG: &str = "webflux-handler";
pub const WEBFLUX_ELEMENTS_TAG: &str = "webflux-elements";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub bean_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMappingInfo {
    pub path: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebfluxHandlerInfo {
    pub handler_class: String,
    pub handler_method: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebfluxElementsInfo {
    pub ranges: Vec<Range>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AddOn {
    Bean(BeanInfo),
    RequestMapping(RequestMappingInfo),
    WebfluxHandler(WebfluxHandlerInfo),
    WebfluxElements(WebfluxElementsInfo),
    /// A payload whose tag is not registered. Kept verbatim.
    Unknown { tag: String, data: Value },
}

impl AddOn {
    pub fn tag(&self) -> &str {
        match self {
            AddOn::Bean(_) => BEAN_TAG,
            AddOn::RequestMapping(_) => REQUEST_MAPPING_TAG,
            AddOn::WebfluxHandler(_) => WEBFLUX_HANDLER_TAG,
            AddOn::WebfluxElements(_) => WEBFLUX_ELEMENTS_TAG,
            AddOn::Unknown { tag, .. } => tag,
        }
    }

    pub fn as_bean(&self) -> Option<&BeanInfo> {
        match self {
            AddOn::Bean(bean) => Some(bean),
            _ => None,
        }
    }

    fn data(&self) -> serde_json::Result<Value> {
        match self {
            AddOn::Bean(info) => serde_json::to_value(info),
            AddOn::RequestMapping(info) => serde_json::to_value(info),
            AddOn::WebfluxHandler(info) => serde_json::to_value(info),
            AddOn::WebfluxElements(info) => serde_json::to_value(info),
            AddOn::Unknown { data, .. } => Ok(data.clone()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TaggedPayload {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    data: Value,
}

impl Serialize for AddOn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.data().map_err(S::Error::custom)?;
        TaggedPayload {
            tag: self.tag().to_string(),
            data,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AddOn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = TaggedPayload::deserialize(deserializer)?;
        if payload.tag.is_empty() {
            return Err(D::Error::custom("add-on payload has an empty type tag"));
        }
        Ok(AddOnRegistry::builtin().decode(payload.tag, payload.data))
    }
}

pub type AddOnDecoder = fn(Value) -> serde_json::Result<AddOn>;

/// Maps add-on tags to decode functions.
#[derive(Clone, Debug, Default)]
pub struct AddOnRegistry {
    decoders: HashMap<String, AddOnDecoder>,
}

impl AddOnRegistry {
    /// The registry used when deserializing cache artifacts.
    pub fn builtin() -> &'static AddOnRegistry {
        static BUILTIN: OnceLock<AddOnRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut registry = AddOnRegistry::default();
            registry.register(BEAN_TAG, |data| serde_json::from_value(data).map(AddOn::Bean));
            registry.register(REQUEST_MAPPING_TAG, |data| {
                serde_json::from_value(data).map(AddOn::RequestMapping)
            });
            registry.register(WEBFLUX_HANDLER_TAG, |data| {
                serde_json::from_value(data).map(AddOn::WebfluxHandler)
            });
            registry.register(WEBFLUX_ELEMENTS_TAG, |data| {
                serde_json::from_value(data).map(AddOn::WebfluxElements)
            });
            registry
        })
    }

    pub fn register(&mut self, tag: impl Into<String>, decoder: AddOnDecoder) {
        self.decoders.insert(tag.into(), decoder);
    }

    /// Decodes one payload. Never fails: unregistered tags and payloads that do not
    /// match their registered shape both come back as [`AddOn::Unknown`].
    pub fn decode(&self, tag: String, data: Value) -> AddOn {
        let Some(decoder) = self.decoders.get(&tag) else {
            return AddOn::Unknown { tag, data };
        };
        match decoder(data.clone()) {
            Ok(add_on) => add_on,
            Err(err) => {
                tracing::debug!(
                    target = "boot.cache",
                    tag = %tag,
                    error = %crate::error::CacheError::from(err),
                    "add-on payload does not match its registered shape; keeping it opaque"
                );
                AddOn::Unknown { tag, data }
            }
        }
    }
}
