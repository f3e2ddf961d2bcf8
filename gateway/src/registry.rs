//! Module registry: name -> execution descriptor.
//!
//! A registry is built once (from code for the local deployment, from the catalog document for
//! the proxy deployment) and is read-only afterwards. Listing order is registration order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::serde_ext::{de_method_lenient, de_ordered_entries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// HTTP method used to call a proxied module.
pub enum RemoteMethod {
    /// Params travel as a query string.
    Get,
    /// Params travel as a JSON body.
    Post,
}

impl RemoteMethod {
    pub fn as_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    /// `namespace:function` in the handler catalog.
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub url: String,
    pub method: RemoteMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleTarget {
    Local(LocalTarget),
    Remote(RemoteTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub description: String,
    pub target: ModuleTarget,
}

impl ModuleDescriptor {
    pub fn local(
        name: impl Into<String>,
        description: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target: ModuleTarget::Local(LocalTarget {
                reference: reference.into(),
            }),
        }
    }

    pub fn remote(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        method: RemoteMethod,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target: ModuleTarget::Remote(RemoteTarget {
                url: url.into(),
                method,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// One module entry of the catalog document.
struct CatalogEntry {
    url: String,
    #[serde(deserialize_with = "de_method_lenient")]
    method: RemoteMethod,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ModuleRegistry {
    /// Build a registry. Names must be unique.
    pub fn new(modules: Vec<ModuleDescriptor>) -> anyhow::Result<Self> {
        let mut by_name = HashMap::with_capacity(modules.len());
        for (idx, module) in modules.iter().enumerate() {
            if module.name.is_empty() {
                anyhow::bail!("module names must not be empty");
            }
            if by_name.insert(module.name.clone(), idx).is_some() {
                anyhow::bail!("module '{}' registered twice", module.name);
            }
        }
        Ok(Self { modules, by_name })
    }

    /// Parse a catalog document: `{"<name>": {"url": ..., "method": ..., "description"?: ...}}`.
    pub fn from_catalog_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let entries: Vec<(String, CatalogEntry)> = de_ordered_entries(&mut de)?;
        de.end()?;

        let mut modules = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let url = url::Url::parse(&entry.url).map_err(|err| {
                anyhow::anyhow!("module '{name}': invalid url {:?}: {err}", entry.url)
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("module '{name}': url must be http(s): {}", entry.url);
            }
            modules.push(ModuleDescriptor::remote(
                name,
                entry.description.unwrap_or_default(),
                entry.url,
                entry.method,
            ));
        }
        Self::new(modules)
    }

    pub fn lookup(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.by_name.get(name).map(|&idx| &self.modules[idx])
    }

    /// All descriptors in registration order.
    pub fn list_all(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
