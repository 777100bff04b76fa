//! Binding declarations, as written on component options.
//!
//! State declarations come in four shapes: a list of paths, and a map from key
//! to a path, to a getter function, or to a `{ get, set }` descriptor. Action
//! declarations are a list of paths or a map from key to a path or a factory.
//! Both can be built in code or deserialized from JSON configuration, where only
//! the path based forms can be expressed.

use std::{fmt, rc::Rc};

use ferry_store::Value;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{instance::Instance, path::last_segment};

/// `getter(instance, store)`.
pub type GetterFn = Rc<dyn Fn(&Instance, &Value) -> Value>;
/// `setter(instance, value, store)`.
pub type SetterFn = Rc<dyn Fn(&Instance, Value, &Value)>;
/// `factory(instance, store)`, expected to return a function.
pub type FactoryFn = Rc<dyn Fn(&Instance, &Value) -> Value>;

/// The read half of a descriptor.
#[derive(Clone)]
pub enum Accessor {
    Path(String),
    Function(GetterFn),
}

impl Accessor {
    pub fn function(f: impl Fn(&Instance, &Value) -> Value + 'static) -> Self {
        Accessor::Function(Rc::new(f))
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Accessor::Function(_) => f.write_str("Function"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(path: &str) -> Self {
        Accessor::Path(path.to_string())
    }
}

impl From<String> for Accessor {
    fn from(path: String) -> Self {
        Accessor::Path(path)
    }
}

/// The write half of a descriptor.
///
/// A path names a store function called with `(value, store)` on the path's
/// parent object.
#[derive(Clone)]
pub enum Mutator {
    Path(String),
    Function(SetterFn),
}

impl Mutator {
    pub fn function(f: impl Fn(&Instance, Value, &Value) + 'static) -> Self {
        Mutator::Function(Rc::new(f))
    }
}

impl From<&str> for Mutator {
    fn from(path: &str) -> Self {
        Mutator::Path(path.to_string())
    }
}

impl From<String> for Mutator {
    fn from(path: String) -> Self {
        Mutator::Path(path)
    }
}

#[derive(Clone)]
pub enum StateField {
    Path(String),
    Getter(GetterFn),
    Descriptor { get: Accessor, set: Option<Mutator> },
    /// Anything else; ignored when normalized.
    Unrecognized,
}

impl StateField {
    pub fn getter(f: impl Fn(&Instance, &Value) -> Value + 'static) -> Self {
        StateField::Getter(Rc::new(f))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            StateField::Path(_) => "path",
            StateField::Getter(_) => "getter",
            StateField::Descriptor { .. } => "descriptor",
            StateField::Unrecognized => "unrecognized",
        }
    }
}

impl From<&str> for StateField {
    fn from(path: &str) -> Self {
        StateField::Path(path.to_string())
    }
}

impl fmt::Debug for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateField::Path(path) => f.debug_tuple("Path").field(path).finish(),
            StateField::Getter(_) => f.write_str("Getter"),
            StateField::Descriptor { get, set } => f
                .debug_struct("Descriptor")
                .field("get", get)
                .field("set", &set.is_some())
                .finish(),
            StateField::Unrecognized => f.write_str("Unrecognized"),
        }
    }
}

/// A `$mapState` declaration.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "RawState")]
pub enum StateDeclaration {
    List(Vec<String>),
    Map(IndexMap<String, StateField>),
}

impl Default for StateDeclaration {
    fn default() -> Self {
        StateDeclaration::Map(IndexMap::new())
    }
}

impl StateDeclaration {
    /// A list of paths, each bound under its last segment.
    pub fn list<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Self {
        StateDeclaration::List(paths.into_iter().map(Into::into).collect())
    }

    pub fn map() -> Self {
        Self::default()
    }

    /// Adds `key`. A list declaration is turned into a map first.
    pub fn field(self, key: impl Into<String>, field: impl Into<StateField>) -> Self {
        let mut entries = self.into_entries();
        entries.insert(key.into(), field.into());
        StateDeclaration::Map(entries)
    }

    pub fn path(self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.field(key, StateField::Path(path.into()))
    }

    pub fn getter(
        self,
        key: impl Into<String>,
        f: impl Fn(&Instance, &Value) -> Value + 'static,
    ) -> Self {
        self.field(key, StateField::getter(f))
    }

    /// A readable and writable binding.
    pub fn descriptor(
        self,
        key: impl Into<String>,
        get: impl Into<Accessor>,
        set: impl Into<Mutator>,
    ) -> Self {
        self.field(
            key,
            StateField::Descriptor {
                get: get.into(),
                set: Some(set.into()),
            },
        )
    }

    /// Adds every entry of `other`, replacing keys that already exist.
    pub fn extend(self, other: StateDeclaration) -> Self {
        let mut entries = self.into_entries();
        entries.extend(other.into_entries());
        StateDeclaration::Map(entries)
    }

    /// Parses a declaration from configuration. A value of the wrong shape
    /// yields an empty declaration.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring malformed state declaration");
            Self::default()
        })
    }

    /// Keyed entries; list items are keyed by their last path segment.
    pub fn into_entries(self) -> IndexMap<String, StateField> {
        match self {
            StateDeclaration::List(paths) => paths
                .into_iter()
                .map(|path| (last_segment(&path).to_string(), StateField::Path(path)))
                .collect(),
            StateDeclaration::Map(entries) => entries,
        }
    }
}

#[derive(Clone)]
pub enum ActionField {
    Path(String),
    Factory(FactoryFn),
    Unrecognized,
}

impl ActionField {
    pub fn factory(f: impl Fn(&Instance, &Value) -> Value + 'static) -> Self {
        ActionField::Factory(Rc::new(f))
    }
}

impl From<&str> for ActionField {
    fn from(path: &str) -> Self {
        ActionField::Path(path.to_string())
    }
}

impl fmt::Debug for ActionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionField::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ActionField::Factory(_) => f.write_str("Factory"),
            ActionField::Unrecognized => f.write_str("Unrecognized"),
        }
    }
}

/// A `$mapAction` declaration.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "RawActions")]
pub enum ActionDeclaration {
    List(Vec<String>),
    Map(IndexMap<String, ActionField>),
}

impl Default for ActionDeclaration {
    fn default() -> Self {
        ActionDeclaration::Map(IndexMap::new())
    }
}

impl ActionDeclaration {
    pub fn list<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Self {
        ActionDeclaration::List(paths.into_iter().map(Into::into).collect())
    }

    pub fn map() -> Self {
        Self::default()
    }

    pub fn field(self, key: impl Into<String>, field: impl Into<ActionField>) -> Self {
        let mut entries = self.into_entries();
        entries.insert(key.into(), field.into());
        ActionDeclaration::Map(entries)
    }

    pub fn path(self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.field(key, ActionField::Path(path.into()))
    }

    pub fn factory(
        self,
        key: impl Into<String>,
        f: impl Fn(&Instance, &Value) -> Value + 'static,
    ) -> Self {
        self.field(key, ActionField::factory(f))
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring malformed action declaration");
            Self::default()
        })
    }

    pub fn into_entries(self) -> IndexMap<String, ActionField> {
        match self {
            ActionDeclaration::List(paths) => paths
                .into_iter()
                .map(|path| (last_segment(&path).to_string(), ActionField::Path(path)))
                .collect(),
            ActionDeclaration::Map(entries) => entries,
        }
    }
}

// What configuration can express.

#[derive(Deserialize)]
#[serde(untagged)]
enum RawState {
    List(Vec<RawListItem>),
    Map(IndexMap<String, RawStateField>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawListItem {
    Path(String),
    Other(serde::de::IgnoredAny),
}

/// Keeps the string entries of a configured list, skipping the rest.
fn list_paths(items: Vec<RawListItem>) -> Vec<String> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            RawListItem::Path(path) => Some(path),
            RawListItem::Other(_) => {
                tracing::warn!(index, "ignoring list entry that is not a path");
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStateField {
    Path(String),
    Descriptor {
        get: String,
        #[serde(default)]
        set: Option<String>,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawActions {
    List(Vec<RawListItem>),
    Map(IndexMap<String, RawActionField>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawActionField {
    Path(String),
    Other(serde::de::IgnoredAny),
}

impl From<RawState> for StateDeclaration {
    fn from(raw: RawState) -> Self {
        match raw {
            RawState::List(items) => StateDeclaration::List(list_paths(items)),
            RawState::Map(fields) => StateDeclaration::Map(
                fields
                    .into_iter()
                    .map(|(key, field)| {
                        let field = match field {
                            RawStateField::Path(path) => StateField::Path(path),
                            RawStateField::Descriptor { get, set } => StateField::Descriptor {
                                get: Accessor::Path(get),
                                set: set.map(Mutator::Path),
                            },
                            RawStateField::Other(_) => StateField::Unrecognized,
                        };
                        (key, field)
                    })
                    .collect(),
            ),
        }
    }
}

impl From<RawActions> for ActionDeclaration {
    fn from(raw: RawActions) -> Self {
        match raw {
            RawActions::List(items) => ActionDeclaration::List(list_paths(items)),
            RawActions::Map(fields) => ActionDeclaration::Map(
                fields
                    .into_iter()
                    .map(|(key, field)| {
                        let field = match field {
                            RawActionField::Path(path) => ActionField::Path(path),
                            RawActionField::Other(_) => ActionField::Unrecognized,
                        };
                        (key, field)
                    })
                    .collect(),
            ),
        }
    }
}
