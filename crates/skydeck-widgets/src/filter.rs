//! City name autocomplete.

use std::sync::Arc;

use skydeck_weather::CityListProvider;

/// Case-insensitively sorted list of known city names.
///
/// The list is frozen after construction; every query is a fresh pass over it.
#[derive(Debug, Clone, Default)]
pub struct CityFilter {
    names: Arc<[String]>,
}

impl CityFilter {
    pub fn new(mut names: Vec<String>) -> Self {
        names.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        Self {
            names: names.into(),
        }
    }

    /// Load names once from the provider; an unavailable list yields an
    /// empty filter rather than an error.
    pub async fn load<P: CityListProvider>(provider: &P) -> Self {
        match provider.list().await {
            Ok(names) => Self::new(names),
            Err(e) => {
                tracing::warn!("City list unavailable, autocomplete disabled: {}", e);
                Self::default()
            }
        }
    }

    /// Names whose lowercase form contains the lowercase query, in sorted order
    pub fn filter(&self, query: &str) -> Vec<String> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return self.names.to_vec();
        }
        self.names
            .iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Autocomplete options that follow the text in an input field
#[derive(Debug, Clone)]
pub struct LiveFilter {
    index: CityFilter,
    query: String,
    options: Vec<String>,
}

impl LiveFilter {
    /// Starts with an empty query, i.e. the full list
    pub fn new(index: CityFilter) -> Self {
        let options = index.filter("");
        Self {
            index,
            query: String::new(),
            options,
        }
    }

    /// Recompute the options for a changed query
    pub fn set_query(&mut self, query: &str) -> &[String] {
        if query != self.query {
            self.query = query.to_string();
            self.options = self.index.filter(&self.query);
        }
        &self.options
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}
