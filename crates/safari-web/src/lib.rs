//! Axum + Askama web UI for the safari catalog.
//!
//! Listing pages are rebuilt from the query string on every request: the URL
//! is the only place filter state lives.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use safari_catalog::{Catalog, DestinationRecord, SiteConfig, TourRecord};
use safari_core::{
    facet_counts, run_query, CatalogItem, CatalogKind, Facet, FilterState, PageSize, ResultView,
    SortKey,
};
use safari_enquiry::{
    compose_booking_notifications, compose_contact_notification, deliver, BookingRequest,
    ContactRequest, EnquiryError, FieldError, LogNotifier, Notifier,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub const CRATE_NAME: &str = "safari-web";

const PAGER_RADIUS: usize = 2;

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub page_size: Option<usize>,
    pub notify_to: Option<String>,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("SAFARI_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            data_dir: std::env::var("SAFARI_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            assets_dir: std::env::var("SAFARI_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./assets")),
            page_size: std::env::var("SAFARI_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok()),
            notify_to: std::env::var("SAFARI_NOTIFY_TO")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub site: SiteConfig,
    pub page_size: PageSize,
    pub notifier: Arc<dyn Notifier>,
    pub assets_dir: PathBuf,
}

impl AppState {
    pub fn new(catalog: Catalog, page_size: PageSize, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            site: catalog.site().clone(),
            catalog: Arc::new(catalog),
            page_size,
            notifier,
            assets_dir: PathBuf::from("./assets"),
        }
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    pub fn from_config(config: &WebConfig) -> anyhow::Result<Self> {
        let catalog = Catalog::load(&config.data_dir)
            .with_context(|| format!("loading catalog from {}", config.data_dir.display()))?;
        let size = config.page_size.unwrap_or(catalog.site().page_size);
        let page_size = PageSize::new(size).context("invalid listing page size")?;
        let mut state = Self::new(catalog, page_size, Arc::new(LogNotifier))
            .with_assets_dir(&config.assets_dir);
        if let Some(to) = &config.notify_to {
            state.site.notify_to = Some(to.clone());
        }
        Ok(state)
    }
}

#[derive(Debug, Clone)]
struct ItemCard {
    href: String,
    title: String,
    summary: String,
    country: String,
    difficulty: String,
    price: String,
    rating: String,
    duration: String,
    tags: String,
}

impl From<&CatalogItem> for ItemCard {
    fn from(item: &CatalogItem) -> Self {
        Self {
            href: format!("/{}/{}", item.kind.path_segment(), item.slug),
            title: item.title.clone(),
            summary: item.summary.clone(),
            country: item.country.clone(),
            difficulty: item.difficulty.clone().unwrap_or_default(),
            price: format_price(item.price),
            rating: item.rating.map(|r| format!("{r:.1}")).unwrap_or_default(),
            duration: item.duration_label.clone(),
            tags: item.tags.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

#[derive(Debug, Clone)]
struct SortOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Debug, Clone)]
struct HiddenField {
    name: String,
    value: String,
}

#[derive(Debug, Clone)]
struct PageLink {
    number: usize,
    href: String,
    current: bool,
}

#[derive(Debug, Clone)]
struct FacetOption {
    value: String,
    count: usize,
    selected: bool,
    href: String,
}

#[derive(Debug, Clone)]
struct FacetGroup {
    title: &'static str,
    options: Vec<FacetOption>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    site_name: String,
    tagline: String,
    total_tours: usize,
    total_destinations: usize,
    featured: Vec<ItemCard>,
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingPageTemplate {
    site_name: String,
    heading: &'static str,
    base_path: &'static str,
    q: String,
    hidden: Vec<HiddenField>,
    sort_options: Vec<SortOption>,
    clear_href: String,
    facets_html: String,
    table_html: String,
}

#[derive(Template)]
#[template(path = "listing_table_partial.html")]
struct ListingTablePartialTemplate {
    cards: Vec<ItemCard>,
    total_matched: usize,
    page: usize,
    total_pages: usize,
    prev_href: String,
    next_href: String,
    pages: Vec<PageLink>,
}

#[derive(Template)]
#[template(path = "listing_facets_partial.html")]
struct ListingFacetsPartialTemplate {
    groups: Vec<FacetGroup>,
}

#[derive(Template)]
#[template(path = "tour_detail.html")]
struct TourDetailTemplate {
    site_name: String,
    tour: TourRecord,
    price: String,
    rating: String,
    difficulty: String,
    min_date: String,
}

#[derive(Template)]
#[template(path = "destination_detail.html")]
struct DestinationDetailTemplate {
    site_name: String,
    destination: DestinationRecord,
    price_from: String,
    best_time: String,
    related: Vec<ItemCard>,
}

#[derive(Template)]
#[template(path = "contact.html")]
struct ContactTemplate {
    site_name: String,
    contact_email: String,
    contact_phone: String,
}

#[derive(Template)]
#[template(path = "enquiry_result_partial.html")]
struct EnquiryResultPartialTemplate {
    accepted: bool,
    reference: String,
    errors: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
struct ApiResultView<'a> {
    kind: CatalogKind,
    query: BTreeMap<String, String>,
    page: usize,
    page_size: usize,
    total_pages: usize,
    total_matched: usize,
    items: &'a [&'a CatalogItem],
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/tours", get(tours_page_handler))
        .route("/tours/table", get(tours_table_handler))
        .route("/tours/facets", get(tours_facets_handler))
        .route("/tours/{slug}", get(tour_detail_handler))
        .route("/destinations", get(destinations_page_handler))
        .route("/destinations/table", get(destinations_table_handler))
        .route("/destinations/facets", get(destinations_facets_handler))
        .route("/destinations/{slug}", get(destination_detail_handler))
        .route("/api/tours", get(tours_api_handler))
        .route("/api/destinations", get(destinations_api_handler))
        .route("/contact", get(contact_page_handler).post(contact_submit_handler))
        .route("/booking", post(booking_submit_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: WebConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!(port = config.port, "safari web listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(WebConfig::from_env()).await
}

type Params = Query<BTreeMap<String, String>>;

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let tours = state.catalog.collection(CatalogKind::Tour);
    let view = run_query(tours, &FilterState::default(), state.page_size);
    let featured = view
        .matched
        .iter()
        .take(state.site.featured_count)
        .map(|item| ItemCard::from(*item))
        .collect();
    render_html(IndexTemplate {
        site_name: state.site.business_name.clone(),
        tagline: state.site.tagline.clone(),
        total_tours: tours.len(),
        total_destinations: state.catalog.destinations().len(),
        featured,
    })
}

async fn tours_page_handler(State(state): State<Arc<AppState>>, Query(params): Params) -> Response {
    listing_page(&state, CatalogKind::Tour, &params)
}

async fn destinations_page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Response {
    listing_page(&state, CatalogKind::Destination, &params)
}

async fn tours_table_handler(State(state): State<Arc<AppState>>, Query(params): Params) -> Response {
    listing_table(&state, CatalogKind::Tour, &params)
}

async fn destinations_table_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Response {
    listing_table(&state, CatalogKind::Destination, &params)
}

async fn tours_facets_handler(State(state): State<Arc<AppState>>, Query(params): Params) -> Response {
    listing_facets(&state, CatalogKind::Tour, &params)
}

async fn destinations_facets_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Response {
    listing_facets(&state, CatalogKind::Destination, &params)
}

async fn tours_api_handler(State(state): State<Arc<AppState>>, Query(params): Params) -> Response {
    listing_json(&state, CatalogKind::Tour, &params)
}

async fn destinations_api_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Response {
    listing_json(&state, CatalogKind::Destination, &params)
}

fn listing_page(state: &AppState, kind: CatalogKind, params: &BTreeMap<String, String>) -> Response {
    let filter = FilterState::from_query_map(params);
    let base_path = base_path(kind);
    let table_html = match render_table(state, kind, &filter) {
        Ok(html) => html,
        Err(err) => return server_error(err),
    };
    let facets_html = match render_facets(state, kind, &filter) {
        Ok(html) => html,
        Err(err) => return server_error(err),
    };
    let mut cleared = filter.clone();
    cleared.clear_filters();

    render_html(ListingPageTemplate {
        site_name: state.site.business_name.clone(),
        heading: match kind {
            CatalogKind::Tour => "Safari tours",
            CatalogKind::Destination => "Destinations",
        },
        base_path,
        q: filter.query.clone(),
        hidden: facet_fields(&filter),
        sort_options: SortKey::ALL
            .into_iter()
            .map(|key| SortOption {
                value: key.as_str(),
                label: key.label(),
                selected: key == filter.sort,
            })
            .collect(),
        clear_href: href(base_path, &cleared),
        facets_html,
        table_html,
    })
}

fn listing_table(state: &AppState, kind: CatalogKind, params: &BTreeMap<String, String>) -> Response {
    let filter = FilterState::from_query_map(params);
    let html = match render_table(state, kind, &filter) {
        Ok(html) => html,
        Err(err) => return server_error(err),
    };
    // History points at the full listing page, never at this partial.
    let push_url = match header::HeaderValue::from_str(&href(base_path(kind), &filter)) {
        Ok(value) => value,
        Err(err) => return server_error(anyhow::Error::from(err)),
    };
    let mut resp = Html(html).into_response();
    let headers = resp.headers_mut();
    headers.insert(
        header::HeaderName::from_static("hx-trigger"),
        header::HeaderValue::from_static("catalogTableLoaded"),
    );
    headers.insert(header::HeaderName::from_static("hx-push-url"), push_url);
    resp
}

fn listing_facets(state: &AppState, kind: CatalogKind, params: &BTreeMap<String, String>) -> Response {
    let filter = FilterState::from_query_map(params);
    match render_facets(state, kind, &filter) {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(err),
    }
}

fn listing_json(state: &AppState, kind: CatalogKind, params: &BTreeMap<String, String>) -> Response {
    let filter = FilterState::from_query_map(params);
    let view = run_query(state.catalog.collection(kind), &filter, state.page_size);
    Json(ApiResultView {
        kind,
        query: filter.to_query_map(),
        page: view.page,
        page_size: view.page_size.get(),
        total_pages: view.total_pages,
        total_matched: view.total_matched(),
        items: view.page_items(),
    })
    .into_response()
}

fn render_table(state: &AppState, kind: CatalogKind, filter: &FilterState) -> anyhow::Result<String> {
    let view = run_query(state.catalog.collection(kind), filter, state.page_size);
    debug!(
        kind = kind.as_str(),
        matched = view.total_matched(),
        page = view.page,
        total_pages = view.total_pages,
        "catalog query"
    );
    let base = base_path(kind);
    let tpl = ListingTablePartialTemplate {
        cards: view.page_items().iter().map(|item| ItemCard::from(*item)).collect(),
        total_matched: view.total_matched(),
        page: view.page,
        total_pages: view.total_pages,
        prev_href: if view.has_prev() {
            page_href(base, filter, view.page - 1)
        } else {
            String::new()
        },
        next_href: if view.has_next() {
            page_href(base, filter, view.page + 1)
        } else {
            String::new()
        },
        pages: pager_links(base, filter, &view),
    };
    Ok(tpl.render()?)
}

fn render_facets(state: &AppState, kind: CatalogKind, filter: &FilterState) -> anyhow::Result<String> {
    let collection = state.catalog.collection(kind);
    let base = base_path(kind);
    let (difficulty_title, tags_title) = match kind {
        CatalogKind::Tour => ("Difficulty", "Highlights"),
        CatalogKind::Destination => ("Tier", "Activities"),
    };
    let groups = [
        ("Country", Facet::Country),
        (difficulty_title, Facet::Difficulty),
        (tags_title, Facet::Tags),
    ]
    .into_iter()
    .map(|(title, facet)| FacetGroup {
        title,
        options: facet_counts(collection, facet)
            .into_iter()
            .map(|fc| {
                let selected = filter.selection(facet).contains(&fc.value.as_str());
                let mut next = filter.clone();
                match facet {
                    Facet::Country => next.set_country((!selected).then(|| fc.value.clone())),
                    Facet::Difficulty => {
                        next.set_difficulty((!selected).then(|| fc.value.clone()))
                    }
                    Facet::Tags => next.toggle_tag(&fc.value),
                }
                FacetOption {
                    href: href(base, &next),
                    value: fc.value,
                    count: fc.count,
                    selected,
                }
            })
            .collect(),
    })
    .filter(|group| !group.options.is_empty())
    .collect();

    Ok(ListingFacetsPartialTemplate { groups }.render()?)
}

// Facet selections carried through the search/sort form.
fn facet_fields(filter: &FilterState) -> Vec<HiddenField> {
    filter
        .to_query_map()
        .into_iter()
        .filter(|(name, _)| {
            [Facet::Country, Facet::Difficulty, Facet::Tags]
                .iter()
                .any(|f| f.param() == name.as_str())
        })
        .map(|(name, value)| HiddenField { name, value })
        .collect()
}

fn pager_links(base: &str, filter: &FilterState, view: &ResultView<'_>) -> Vec<PageLink> {
    view.page_window(PAGER_RADIUS)
        .into_iter()
        .map(|number| PageLink {
            number,
            href: page_href(base, filter, number),
            current: number == view.page,
        })
        .collect()
}

fn base_path(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Tour => "/tours",
        CatalogKind::Destination => "/destinations",
    }
}

fn page_href(base: &str, filter: &FilterState, page: usize) -> String {
    let mut next = filter.clone();
    next.set_page(page);
    href(base, &next)
}

fn query_string(filter: &FilterState) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(filter.to_query_map())
        .finish()
}

fn href(base: &str, filter: &FilterState) -> String {
    let qs = query_string(filter);
    if qs.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{qs}")
    }
}

async fn tour_detail_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
) -> Response {
    let Some(tour) = state.catalog.find_tour(&slug) else {
        return not_found("Tour not found");
    };
    render_html(TourDetailTemplate {
        site_name: state.site.business_name.clone(),
        price: format_price(tour.price),
        rating: tour.rating.map(|r| format!("{r:.1}")).unwrap_or_default(),
        difficulty: tour.difficulty.clone().unwrap_or_default(),
        min_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        tour: tour.clone(),
    })
}

async fn destination_detail_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
) -> Response {
    let Some(destination) = state.catalog.find_destination(&slug) else {
        return not_found("Destination not found");
    };
    let related = state
        .catalog
        .collection(CatalogKind::Tour)
        .iter()
        .filter(|item| item.country == destination.country)
        .map(ItemCard::from)
        .collect();
    render_html(DestinationDetailTemplate {
        site_name: state.site.business_name.clone(),
        price_from: format_price(destination.price_from),
        best_time: destination.best_time.clone().unwrap_or_default(),
        related,
        destination: destination.clone(),
    })
}

async fn contact_page_handler(State(state): State<Arc<AppState>>) -> Response {
    render_html(ContactTemplate {
        site_name: state.site.business_name.clone(),
        contact_email: state.site.contact_email.clone(),
        contact_phone: state.site.contact_phone.clone().unwrap_or_default(),
    })
}

async fn booking_submit_handler(
    State(state): State<Arc<AppState>>,
    Form(request): Form<BookingRequest>,
) -> Response {
    let today = Utc::now().date_naive();
    match request.validate(&state.catalog, today) {
        Ok(booking) => {
            let notifications = compose_booking_notifications(&state.site, &booking);
            let report = deliver(state.notifier.as_ref(), &notifications).await;
            info!(
                tour = %booking.tour_slug,
                travellers = booking.travellers,
                reference = ?report.reference,
                failed = report.failed,
                "booking request received"
            );
            enquiry_accepted(report.reference)
        }
        Err(err) => enquiry_rejected(err),
    }
}

async fn contact_submit_handler(
    State(state): State<Arc<AppState>>,
    Form(request): Form<ContactRequest>,
) -> Response {
    match request.validate() {
        Ok(contact) => {
            let notification = compose_contact_notification(&state.site, &contact);
            let report = deliver(state.notifier.as_ref(), std::slice::from_ref(&notification)).await;
            info!(reference = ?report.reference, failed = report.failed, "contact enquiry received");
            enquiry_accepted(report.reference)
        }
        Err(err) => enquiry_rejected(err),
    }
}

fn enquiry_accepted(reference: Option<impl std::fmt::Display>) -> Response {
    render_html(EnquiryResultPartialTemplate {
        accepted: true,
        reference: reference.map(|r| r.to_string()).unwrap_or_default(),
        errors: Vec::new(),
    })
}

fn enquiry_rejected(err: EnquiryError) -> Response {
    let EnquiryError::Invalid(errors) = err;
    warn!(fields = errors.len(), "enquiry rejected");
    let mut resp = render_html(EnquiryResultPartialTemplate {
        accepted: false,
        reference: String::new(),
        errors,
    });
    *resp.status_mut() = StatusCode::UNPROCESSABLE_ENTITY;
    resp
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.assets_dir.join("static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn format_price(price: f64) -> String {
    format!("USD {price:.0}")
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Html(message.to_string())).into_response()
}

fn server_error(err: anyhow::Error) -> Response {
    warn!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {err}")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use safari_enquiry::MemoryNotifier;
    use std::path::Path;
    use tower::ServiceExt;

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .unwrap()
    }

    fn test_app() -> (Router, Arc<MemoryNotifier>) {
        let root = workspace_root();
        let catalog = Catalog::load(root.join("data")).unwrap();
        let notifier = Arc::new(MemoryNotifier::default());
        let state = AppState::new(catalog, PageSize::new(3).unwrap(), notifier.clone())
            .with_assets_dir(root.join("assets"));
        (app(state), notifier)
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn post_form(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn handler_smoke_get_index() {
        let (app, _) = test_app();
        let (status, text) = get_text(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Savannah Trails Safaris"));
    }

    #[tokio::test]
    async fn listing_applies_country_filter_and_price_sort() {
        let (app, _) = test_app();
        let (status, text) = get_text(app, "/tours?country=Kenya&sort=price-asc").await;
        assert_eq!(status, StatusCode::OK);
        let amboseli = text.find("Amboseli").unwrap();
        let mara = text.find("Maasai Mara Classic").unwrap();
        assert!(amboseli < mara);
        assert!(!text.contains("Bwindi Gorilla Trek"));
    }

    #[tokio::test]
    async fn table_partial_clamps_page_and_sets_trigger() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/tours/table?page=99").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["hx-trigger"], "catalogTableLoaded");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Page 3 of 3"));
    }

    #[tokio::test]
    async fn table_partial_pushes_listing_url() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/tours/table?q=kibale&sort=price-asc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["hx-push-url"], "/tours?q=kibale&sort=price-asc");
    }

    #[tokio::test]
    async fn listing_facets_refresh_follows_current_form() {
        let (app, _) = test_app();
        let (status, text) = get_text(app, "/tours?q=gorilla").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!text.contains("hx-push-url"));
        assert!(text.contains(r##"hx-get="/tours/facets" hx-include="#filters""##));
    }

    #[tokio::test]
    async fn facets_partial_lists_countries() {
        let (app, _) = test_app();
        let (status, text) = get_text(app, "/destinations/facets?country=Uganda").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Tanzania"));
        assert!(text.contains("Activities"));
    }

    #[tokio::test]
    async fn api_tolerates_malformed_params() {
        let (app, _) = test_app();
        let (status, text) = get_text(app, "/api/tours?sort=bogus-value&page=abc").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["page"], 1);
        assert_eq!(json["total_matched"], 8);
        assert_eq!(json["total_pages"], 3);
        assert_eq!(json["items"][0]["slug"], "bwindi-gorilla-trek");
        assert!(json["query"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_empty_search_has_one_page() {
        let (app, _) = test_app();
        let (_, text) = get_text(app, "/api/destinations?q=penguins").await;
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["total_matched"], 0);
        assert_eq!(json["total_pages"], 1);
        assert!(json["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_pages_resolve_by_slug() {
        let (app, _) = test_app();
        let (status, text) = get_text(app.clone(), "/tours/maasai-mara-classic").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Nairobi to the Mara"));

        let (status, text) = get_text(app.clone(), "/destinations/bwindi").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Kibale Chimpanzee Tracking"));

        let (status, _) = get_text(app, "/tours/no-such-tour").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn booking_post_validates_and_notifies() {
        let (app, notifier) = test_app();
        let (status, text) = post_form(app.clone(), "/booking", "tour=nope&email=bad").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(text.contains("valid email"));
        assert!(notifier.sent().is_empty());

        let body = "tour=bwindi-gorilla-trek&full_name=Amina+Otieno&email=amina%40example.org\
                    &travel_date=2099-06-01&travellers=2";
        let (status, text) = post_form(app, "/booking", body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Reference"));
        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "bookings@savannahtrails.example");
    }

    #[tokio::test]
    async fn contact_post_sends_one_notification() {
        let (app, notifier) = test_app();
        let body = "full_name=Jo&email=jo%40example.org&message=Do+you+run+April+trips%3F";
        let (status, _) = post_form(app, "/contact", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn stylesheet_is_served() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/assets/static/app.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "text/css; charset=utf-8"
        );
    }
}
