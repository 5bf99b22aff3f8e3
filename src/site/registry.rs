use crate::config::SiteEntry;
use crate::site::{
    InfinityAdapter, Listing, LynxchanAdapter, MediaLayout, SiteAdapter, SiteEndpoints,
    SiteFamily, VichanAdapter,
};
use crate::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Immutable table of known imageboards, keyed by alias
///
/// Built once at startup and shared by reference with everything that
/// needs to pick an adapter.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<String, Arc<dyn SiteAdapter>>,
}

impl SiteRegistry {
    /// Creates a registry holding only the built-in imageboards
    pub fn builtin() -> Self {
        let mut registry = Self::default();

        if let Some(endpoints) = endpoints("https://a.4cdn.org", "https://i.4cdn.org") {
            registry.insert(Arc::new(VichanAdapter::new(
                "4chan",
                endpoints,
                "thread",
                Listing::Threads,
                MediaLayout::BoardScoped,
            )));
        }
        if let Some(endpoints) = endpoints("https://8ch.net", "https://media.8ch.net") {
            registry.insert(Arc::new(VichanAdapter::new(
                "8chan",
                endpoints,
                "res",
                Listing::Threads,
                MediaLayout::FileStore,
            )));
        }
        if let Some(endpoints) = endpoints("https://lainchan.org", "https://lainchan.org") {
            registry.insert(Arc::new(VichanAdapter::new(
                "lainchan",
                endpoints,
                "res",
                Listing::Threads,
                MediaLayout::BoardSrc,
            )));
        }
        if let Some(endpoints) = endpoints("https://endchan.xyz", "https://endchan.xyz") {
            registry.insert(Arc::new(LynxchanAdapter::new("endchan", endpoints)));
        }
        if let Some(endpoints) = endpoints("https://nextchan.org", "https://nextchan.org/file") {
            registry.insert(Arc::new(InfinityAdapter::new("nextchan", endpoints)));
        }

        registry
    }

    /// Creates the built-in registry extended with `[[site]]` entries
    ///
    /// A custom entry with the same name as a built-in site replaces it.
    ///
    /// # Arguments
    ///
    /// * `entries` - Custom site definitions, already validated
    ///
    /// # Returns
    ///
    /// * `Ok(SiteRegistry)` - Registry with every site available
    /// * `Err(ConfigError)` - An entry could not be turned into an adapter
    pub fn from_config(entries: &[SiteEntry]) -> ConfigResult<Self> {
        let mut registry = Self::builtin();
        for entry in entries {
            let adapter = adapter_from_entry(entry)?;
            tracing::debug!(site = %entry.name, family = %adapter.family(), "Registered custom imageboard");
            registry.insert(adapter);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, adapter: Arc<dyn SiteAdapter>) {
        self.sites
            .insert(adapter.name().trim().to_ascii_lowercase(), adapter);
    }

    /// Looks up an adapter by alias (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.sites.get(&name.trim().to_ascii_lowercase()).cloned()
    }

    /// Every registered alias, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

fn endpoints(api: &str, media: &str) -> Option<SiteEndpoints> {
    Some(SiteEndpoints::new(Url::parse(api).ok()?, Url::parse(media).ok()?))
}

fn adapter_from_entry(entry: &SiteEntry) -> ConfigResult<Arc<dyn SiteAdapter>> {
    let parse = |raw: &str| {
        Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("site '{}': '{}': {}", entry.name, raw, e)))
    };

    let api_base = parse(&entry.api_base)?;
    let media_base = match &entry.media_base {
        Some(media) => parse(media)?,
        None => api_base.clone(),
    };
    let endpoints = SiteEndpoints::new(api_base, media_base);
    let name = entry.name.to_ascii_lowercase();

    let family = SiteFamily::parse(&entry.family).ok_or_else(|| {
        ConfigError::Validation(format!(
            "site '{}' has unknown family '{}'",
            entry.name, entry.family
        ))
    })?;

    let adapter: Arc<dyn SiteAdapter> = match family {
        SiteFamily::Vichan => {
            let listing = Listing::parse(&entry.listing).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "site '{}' listing must be \"threads\" or \"catalog\", got '{}'",
                    entry.name, entry.listing
                ))
            })?;
            Arc::new(VichanAdapter::new(
                name,
                endpoints,
                entry.thread_dir.clone(),
                listing,
                MediaLayout::BoardSrc,
            ))
        }
        SiteFamily::Lynxchan => Arc::new(LynxchanAdapter::new(name, endpoints)),
        SiteFamily::Infinity => Arc::new(InfinityAdapter::new(name, endpoints)),
    };
    Ok(adapter)
}
