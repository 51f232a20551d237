//! Fixture-backed catalog: tour and destination records, site settings, and
//! their conversion into query-engine items.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use safari_core::{build_searchable_text, parse_duration_days, CatalogItem, CatalogKind};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const CRATE_NAME: &str = "safari-catalog";

pub const TOURS_FILE: &str = "tours.json";
pub const DESTINATIONS_FILE: &str = "destinations.json";
pub const SITE_FILE: &str = "site.yaml";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("duplicate {kind} {field} `{value}`")]
    DuplicateKey {
        kind: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("invalid {kind} `{id}`: {reason}")]
    InvalidRecord {
        kind: &'static str,
        id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub short_description: Option<String>,
    pub description: String,
    pub country: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    pub duration: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryDay>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    pub description: String,
    pub price_from: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    pub ideal_duration: String,
    #[serde(default)]
    pub best_time: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<&TourRecord> for CatalogItem {
    fn from(t: &TourRecord) -> Self {
        let searchable_text = build_searchable_text(
            [t.title.as_str(), t.description.as_str()]
                .into_iter()
                .chain(t.keywords.iter().map(String::as_str))
                .chain(t.highlights.iter().map(String::as_str)),
        );
        CatalogItem {
            id: t.id.clone(),
            slug: t.slug.clone(),
            kind: CatalogKind::Tour,
            title: t.title.clone(),
            summary: t
                .short_description
                .clone()
                .unwrap_or_else(|| first_sentence(&t.description)),
            country: t.country.clone(),
            difficulty: t.difficulty.clone(),
            price: t.price,
            rating: t.rating,
            duration_label: t.duration.clone(),
            duration_days: parse_duration_days(&t.duration),
            searchable_text,
            tags: t.highlights.iter().cloned().collect(),
            image: t.image.clone(),
        }
    }
}

impl From<&DestinationRecord> for CatalogItem {
    fn from(d: &DestinationRecord) -> Self {
        let searchable_text = build_searchable_text(
            [
                d.name.as_str(),
                d.description.as_str(),
                d.region.as_deref().unwrap_or_default(),
            ]
            .into_iter()
            .chain(d.keywords.iter().map(String::as_str))
            .chain(d.activities.iter().map(String::as_str)),
        );
        CatalogItem {
            id: d.id.clone(),
            slug: d.slug.clone(),
            kind: CatalogKind::Destination,
            title: d.name.clone(),
            summary: first_sentence(&d.description),
            country: d.country.clone(),
            difficulty: d.tier.clone(),
            price: d.price_from,
            rating: d.rating,
            duration_label: d.ideal_duration.clone(),
            duration_days: parse_duration_days(&d.ideal_duration),
            searchable_text,
            tags: d.activities.iter().cloned().collect(),
            image: d.image.clone(),
        }
    }
}

fn first_sentence(text: &str) -> String {
    let text = text.trim();
    match text.find(". ") {
        Some(idx) => text[..=idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub business_name: String,
    #[serde(default)]
    pub tagline: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Recipient of booking and contact notifications; defaults to `contact_email`.
    #[serde(default)]
    pub notify_to: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_featured_count")]
    pub featured_count: usize,
}

fn default_page_size() -> usize {
    safari_core::DEFAULT_PAGE_SIZE
}

fn default_featured_count() -> usize {
    3
}

impl SiteConfig {
    pub fn notification_recipient(&self) -> &str {
        self.notify_to.as_deref().unwrap_or(&self.contact_email)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            business_name: "Safari Tours".to_string(),
            tagline: String::new(),
            contact_email: "bookings@example.com".to_string(),
            contact_phone: None,
            notify_to: None,
            page_size: default_page_size(),
            featured_count: default_featured_count(),
        }
    }
}

/// Read-only catalog loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    site: SiteConfig,
    tours: Vec<TourRecord>,
    destinations: Vec<DestinationRecord>,
    tour_items: Vec<CatalogItem>,
    destination_items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(
        site: SiteConfig,
        tours: Vec<TourRecord>,
        destinations: Vec<DestinationRecord>,
    ) -> Result<Self, CatalogError> {
        check_unique("tour", tours.iter().map(|t| (&t.id, &t.slug)))?;
        check_unique("destination", destinations.iter().map(|d| (&d.id, &d.slug)))?;
        for t in &tours {
            check_numbers("tour", &t.id, t.price, t.rating)?;
        }
        for d in &destinations {
            check_numbers("destination", &d.id, d.price_from, d.rating)?;
        }

        let tour_items = tours.iter().map(CatalogItem::from).collect();
        let destination_items = destinations.iter().map(CatalogItem::from).collect();
        Ok(Self {
            site,
            tours,
            destinations,
            tour_items,
            destination_items,
        })
    }

    /// Loads `tours.json`, `destinations.json` and (optionally) `site.yaml`
    /// from `data_dir`.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data_dir = data_dir.as_ref();
        let tours: Vec<TourRecord> = read_json_file(data_dir.join(TOURS_FILE))?;
        let destinations: Vec<DestinationRecord> =
            read_json_file(data_dir.join(DESTINATIONS_FILE))?;

        let site_path = data_dir.join(SITE_FILE);
        let site = if site_path.exists() {
            read_yaml_file(site_path)?
        } else {
            debug!(dir = %data_dir.display(), "no site.yaml, using default site settings");
            SiteConfig::default()
        };

        let catalog = Self::new(site, tours, destinations)?;
        info!(
            dir = %data_dir.display(),
            tours = catalog.tours.len(),
            destinations = catalog.destinations.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn tours(&self) -> &[TourRecord] {
        &self.tours
    }

    pub fn destinations(&self) -> &[DestinationRecord] {
        &self.destinations
    }

    /// Engine view of one collection, in fixture order.
    pub fn collection(&self, kind: CatalogKind) -> &[CatalogItem] {
        match kind {
            CatalogKind::Tour => &self.tour_items,
            CatalogKind::Destination => &self.destination_items,
        }
    }

    pub fn find_tour(&self, slug: &str) -> Option<&TourRecord> {
        self.tours.iter().find(|t| t.slug == slug)
    }

    pub fn find_destination(&self, slug: &str) -> Option<&DestinationRecord> {
        self.destinations.iter().find(|d| d.slug == slug)
    }
}

fn check_unique<'a>(
    kind: &'static str,
    keys: impl Iterator<Item = (&'a String, &'a String)>,
) -> Result<(), CatalogError> {
    let mut ids = HashSet::new();
    let mut slugs = HashSet::new();
    for (id, slug) in keys {
        if !ids.insert(id) {
            return Err(CatalogError::DuplicateKey {
                kind,
                field: "id",
                value: id.clone(),
            });
        }
        if !slugs.insert(slug) {
            return Err(CatalogError::DuplicateKey {
                kind,
                field: "slug",
                value: slug.clone(),
            });
        }
    }
    Ok(())
}

fn check_numbers(
    kind: &'static str,
    id: &str,
    price: f64,
    rating: Option<f64>,
) -> Result<(), CatalogError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CatalogError::InvalidRecord {
            kind,
            id: id.to_string(),
            reason: format!("price {price} must be a non-negative number"),
        });
    }
    if let Some(rating) = rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(CatalogError::InvalidRecord {
                kind,
                id: id.to_string(),
                reason: format!("rating {rating} outside 0..=5"),
            });
        }
    }
    Ok(())
}

fn read_to_string(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, CatalogError> {
    let path = path.as_ref();
    let data = read_to_string(path)?;
    serde_json::from_str(&data).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_yaml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, CatalogError> {
    let path = path.as_ref();
    let data = read_to_string(path)?;
    serde_yaml::from_str(&data).map_err(|source| CatalogError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
