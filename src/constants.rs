//! File locations and defaults shared by the binary and the configuration layer

// Configuration documents
pub const CONFIG_TEMPLATE_PATH: &str = "./config/config.template.json";
pub const CONFIG_PATH: &str = "./config/config.json";
pub const ENV_PATH: &str = "./config/.env";

// Logging
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "app.log";
pub const METRICS_SNAPSHOT_PATH: &str = "logs/metrics.prom";

// Stopword resource cache, laid out as `<dir>/corpora/stopwords/<language>`
pub const DEFAULT_STOPWORDS_DIR: &str = "./nltk_data";
pub const DEFAULT_STOPWORDS_LANGUAGE: &str = "english";

// CSV fields read as missing values, in addition to the empty field
pub const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// Cleaning defaults
pub const DEFAULT_IMBALANCE_THRESHOLD: f64 = 0.1;
pub const OUTLIER_STD_DEVIATIONS: f64 = 3.0;
pub const DEFAULT_IGNORED_VALUE: &str = "Other";

// Label remapping table columns
pub const REMAP_VALUE_COLUMN: &str = "value";
pub const REMAP_MAPPING_COLUMN: &str = "mapping";
