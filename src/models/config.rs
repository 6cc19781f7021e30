//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and concurrency settings
    #[serde(default)]
    pub http: HttpConfig,

    /// RE/MAX query-API scraper
    #[serde(default)]
    pub remax: RemaxConfig,

    /// ERA cookie-authenticated scraper
    #[serde(default)]
    pub era: EraConfig,

    /// CSV sink settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Vector database job
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, falling back to defaults only when the file is
    /// absent. A file that exists but cannot be read or parsed is an error.
    pub fn load_if_exists(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}. Using defaults.", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.http.max_pages == 0 {
            return Err(AppError::validation("http.max_pages must be > 0"));
        }
        if self.remax.page_size == 0 {
            return Err(AppError::validation("remax.page_size must be > 0"));
        }
        if self.remax.max_results == 0 {
            return Err(AppError::validation("remax.max_results must be > 0"));
        }
        if self.remax.cities.is_empty() {
            return Err(AppError::validation("No remax cities defined"));
        }
        if self.era.shape.len() < 3 {
            return Err(AppError::validation(
                "era.shape needs at least 3 points to form a polygon",
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(AppError::validation("embedding.batch_size must be > 0"));
        }
        if self.embedding.max_chars == 0 {
            return Err(AppError::validation("embedding.max_chars must be > 0"));
        }
        if self.embedding.timeout_secs == 0 {
            return Err(AppError::validation("embedding.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client settings shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds, applied to every request
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Worker pool size for page and detail fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Upper bound on search pages read, whatever the source declares
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// RE/MAX endpoints and query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemaxConfig {
    /// `MultiMatchSearch` endpoint
    #[serde(default = "defaults::remax_search_url")]
    pub search_url: String,

    /// Base of the `searchdetails_V2/{title}.html` fragments (listing type)
    #[serde(default = "defaults::remax_search_details_url")]
    pub search_details_url: String,

    /// Base of the `details-mobile_V2/{title}.html` fragments
    #[serde(default = "defaults::remax_details_url")]
    pub details_url: String,

    /// Site origin sent as `origin` and used for the referer
    #[serde(default = "defaults::remax_origin")]
    pub origin: String,

    /// Listings requested per search page
    #[serde(default = "defaults::remax_page_size")]
    pub page_size: u32,

    /// Upper bound of listings per city
    #[serde(default = "defaults::remax_max_results")]
    pub max_results: u32,

    /// Cities scraped by `remax-all` and `pipeline`
    #[serde(default = "defaults::remax_cities")]
    pub cities: Vec<String>,

    /// Detail table keys kept as attribute columns
    #[serde(default = "defaults::remax_attribute_whitelist")]
    pub attribute_whitelist: Vec<String>,
}

impl Default for RemaxConfig {
    fn default() -> Self {
        Self {
            search_url: defaults::remax_search_url(),
            search_details_url: defaults::remax_search_details_url(),
            details_url: defaults::remax_details_url(),
            origin: defaults::remax_origin(),
            page_size: defaults::remax_page_size(),
            max_results: defaults::remax_max_results(),
            cities: defaults::remax_cities(),
            attribute_whitelist: defaults::remax_attribute_whitelist(),
        }
    }
}

/// A polygon vertex as the ERA API expects it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// ERA endpoints and query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraConfig {
    /// `Property/Search` endpoint
    #[serde(default = "defaults::era_search_url")]
    pub search_url: String,

    /// `Property/PropertyDetailByReference` endpoint
    #[serde(default = "defaults::era_detail_url")]
    pub detail_url: String,

    #[serde(default = "defaults::era_origin")]
    pub origin: String,

    #[serde(default = "defaults::era_referer")]
    pub referer: String,

    /// JSON file holding cookies and the verification token
    #[serde(default = "defaults::era_credentials_path")]
    pub credentials_path: PathBuf,

    /// Search polygon (closed ring)
    #[serde(default = "defaults::era_shape")]
    pub shape: Vec<GeoPoint>,

    #[serde(default = "defaults::era_business_type_ids")]
    pub business_type_ids: Vec<u32>,

    #[serde(default = "defaults::era_property_type_ids")]
    pub property_type_ids: Vec<u32>,
}

impl Default for EraConfig {
    fn default() -> Self {
        Self {
            search_url: defaults::era_search_url(),
            detail_url: defaults::era_detail_url(),
            origin: defaults::era_origin(),
            referer: defaults::era_referer(),
            credentials_path: defaults::era_credentials_path(),
            shape: defaults::era_shape(),
            business_type_ids: defaults::era_business_type_ids(),
            property_type_ids: defaults::era_property_type_ids(),
        }
    }
}

/// CSV sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `{source}_{scope}_{date}.csv` files
    #[serde(default = "defaults::output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
        }
    }
}

/// Embedding back-end selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[default]
    Openai,
    BertMultilingual,
}

impl FromStr for EmbeddingBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "bert_multilingual" | "bert-multilingual" => Ok(Self::BertMultilingual),
            other => Err(AppError::validation(format!(
                "Unsupported embedding type: {other} (expected openai or bert_multilingual)"
            ))),
        }
    }
}

/// Vector database job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// OpenAI-compatible API base (without `/embeddings`)
    #[serde(default = "defaults::openai_url")]
    pub openai_url: String,

    #[serde(default = "defaults::openai_model")]
    pub openai_model: String,

    /// Environment variable holding the OpenAI key
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// text-embeddings-inference server hosting bert-base-multilingual-cased
    #[serde(default = "defaults::bert_url")]
    pub bert_url: String,

    /// Descriptions are cut to this many graphemes before embedding
    #[serde(default = "defaults::max_chars")]
    pub max_chars: usize,

    /// Texts per embedding request
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// CSV column holding the listing description
    #[serde(default = "defaults::description_column")]
    pub description_column: String,

    /// Per-request timeout for embedding calls, in seconds
    #[serde(default = "defaults::embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            openai_url: defaults::openai_url(),
            openai_model: defaults::openai_model(),
            api_key_env: defaults::api_key_env(),
            bert_url: defaults::bert_url(),
            max_chars: defaults::max_chars(),
            batch_size: defaults::batch_size(),
            description_column: defaults::description_column(),
            timeout_secs: defaults::embedding_timeout(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::GeoPoint;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_concurrent() -> usize {
        10
    }
    pub fn max_pages() -> u32 {
        1000
    }

    // RE/MAX defaults
    pub fn remax_search_url() -> String {
        "https://remax.pt/Api/Listing/MultiMatchSearch".into()
    }
    pub fn remax_search_details_url() -> String {
        "https://s.maxwork.pt/site/static/9/listings/searchdetails_V2".into()
    }
    pub fn remax_details_url() -> String {
        "https://s.maxwork.pt/site/static/9/listings/details-mobile_V2".into()
    }
    pub fn remax_origin() -> String {
        "https://remax.pt".into()
    }
    pub fn remax_page_size() -> u32 {
        500
    }
    pub fn remax_max_results() -> u32 {
        10_000
    }
    pub fn remax_cities() -> Vec<String> {
        [
            "Aveiro",
            "Beja",
            "Braga",
            "Braganca",
            "Castelo Branco",
            "Coimbra",
            "Evora",
            "Faro",
            "Guarda",
            "Leiria",
            "Lisboa",
            "Portalegre",
            "Porto",
            "Santarem",
            "Setubal",
            "Viana do Castelo",
            "Vila Real",
            "Viseu",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn remax_attribute_whitelist() -> Vec<String> {
        [
            "Área Bruta Privativa m2",
            "Área Bruta m2",
            "Área Total do Lote m2",
            "Área Útil m2",
            "Quartos",
            "Ano de construção",
            "Piso",
            "WCs",
            "Elevador",
            "Estacionamento",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // ERA defaults
    pub fn era_search_url() -> String {
        "https://www.era.pt/API/ServicesModule/Property/Search".into()
    }
    pub fn era_detail_url() -> String {
        "https://www.era.pt/API/ServicesModule/Property/PropertyDetailByReference".into()
    }
    pub fn era_origin() -> String {
        "https://www.era.pt".into()
    }
    pub fn era_referer() -> String {
        "https://www.era.pt/comprar?ob=1&tp=1,2&page=1&ord=3".into()
    }
    pub fn era_credentials_path() -> PathBuf {
        PathBuf::from("cookies.json")
    }
    pub fn era_shape() -> Vec<GeoPoint> {
        // Bounding box of mainland Portugal.
        vec![
            GeoPoint { lat: 42.1545, lng: -9.5 },
            GeoPoint { lat: 42.1545, lng: -6.189814 },
            GeoPoint { lat: 36.979792, lng: -6.189814 },
            GeoPoint { lat: 36.979792, lng: -9.5 },
            GeoPoint { lat: 42.1545, lng: -9.5 },
        ]
    }
    pub fn era_business_type_ids() -> Vec<u32> {
        vec![1]
    }
    pub fn era_property_type_ids() -> Vec<u32> {
        (1..=11).collect()
    }

    // Output defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("gathered_data")
    }

    // Embedding defaults
    pub fn openai_url() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn openai_model() -> String {
        "text-embedding-ada-002".into()
    }
    pub fn api_key_env() -> String {
        "OPEN_API_KEY".into()
    }
    pub fn bert_url() -> String {
        "http://localhost:8080".into()
    }
    pub fn max_chars() -> usize {
        2000
    }
    pub fn batch_size() -> usize {
        100
    }
    pub fn description_column() -> String {
        "description".into()
    }
    pub fn embedding_timeout() -> u64 {
        300
    }
}
