//! Process configuration, read from the environment

use crate::hours::{parse_offset, HoursError, OperatingHours};
use crate::sheets::{ServiceAccountKey, SheetsAuth, DEFAULT_BASE_URL, DEFAULT_TOKEN_URI};
use crate::state_machine::{BotContext, ResetPolicy};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_PATH: &str = "pedido.db";
const DEFAULT_MENU_RANGE: &str = "productos!A1:D51";
const DEFAULT_ORDERS_RANGE: &str = "pedidos!A1";
const DEFAULT_UTC_OFFSET: &str = "-05:00";
const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?} (expected {expected})")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{var}: {source}")]
    Hours {
        var: &'static str,
        #[source]
        source: HoursError,
    },
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

/// Where completed orders are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Sqlite,
    Sheets,
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub base_url: String,
    pub auth: SheetsAuth,
    pub menu_range: String,
    pub orders_range: String,
}

#[derive(Debug, Clone)]
pub struct OutboundConfig {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub bot: BotContext,
    pub sheets: Option<SheetsConfig>,
    /// Local rows file; takes precedence over Sheets for the catalog
    pub catalog_file: Option<PathBuf>,
    pub catalog_timeout: Duration,
    pub ledger_backend: LedgerBackend,
    /// `None` means operator notifications are only logged
    pub outbound: Option<OutboundConfig>,
    /// `None` disables idle eviction
    pub idle_ttl: Option<chrono::Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut bot = BotContext::default();
        if let Some(v) = get("TRIGGER_KEYWORD") {
            bot.trigger_keyword = v.to_lowercase();
        }
        for (var, field) in [
            ("BUSINESS_NAME", &mut bot.business_name),
            ("PICKUP_LOCATION", &mut bot.pickup_location),
            ("OPERATOR_ID", &mut bot.operator_id),
            ("PROMOTIONS_CATEGORY", &mut bot.promotions_category),
            ("DELIVERY_ETA", &mut bot.delivery_eta),
            ("HOURS_MESSAGE", &mut bot.hours_message),
        ] {
            if let Some(v) = get(var) {
                *field = v;
            }
        }

        let offset_raw = get("UTC_OFFSET").unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
        let offset = parse_offset(&offset_raw).map_err(|source| ConfigError::Hours {
            var: "UTC_OFFSET",
            source,
        })?;
        bot.hours = match get("OPERATING_HOURS") {
            Some(schedule) => OperatingHours::parse(offset, &schedule).map_err(|source| {
                ConfigError::Hours {
                    var: "OPERATING_HOURS",
                    source,
                }
            })?,
            None => OperatingHours::default().with_offset(offset),
        };

        bot.reset_policy = match get("RESET_POLICY").as_deref() {
            None | Some("keep") => ResetPolicy::KeepProfile,
            Some("clear") => ResetPolicy::ClearProfile,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "RESET_POLICY",
                    value: other.to_string(),
                    expected: "keep or clear",
                })
            }
        };

        let sheets = match get("SHEETS_SPREADSHEET_ID") {
            Some(spreadsheet_id) => {
                let auth = match (
                    service_account(&get)?,
                    get("SHEETS_ACCESS_TOKEN"),
                    get("SHEETS_API_KEY"),
                ) {
                    (Some(key), _, _) => SheetsAuth::ServiceAccount(key),
                    (None, Some(token), _) => SheetsAuth::Bearer(token),
                    (None, None, Some(key)) => SheetsAuth::ApiKey(key),
                    (None, None, None) => {
                        return Err(ConfigError::Missing(
                            "CLIENT_EMAIL and PRIVATE_KEY, SHEETS_ACCESS_TOKEN or SHEETS_API_KEY for SHEETS_SPREADSHEET_ID",
                        ))
                    }
                };
                Some(SheetsConfig {
                    spreadsheet_id,
                    base_url: get("SHEETS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                    auth,
                    menu_range: get("SHEETS_MENU_RANGE")
                        .unwrap_or_else(|| DEFAULT_MENU_RANGE.to_string()),
                    orders_range: get("SHEETS_ORDERS_RANGE")
                        .unwrap_or_else(|| DEFAULT_ORDERS_RANGE.to_string()),
                })
            }
            None => None,
        };

        let catalog_file = get("CATALOG_FILE").map(PathBuf::from);
        if catalog_file.is_none() && sheets.is_none() {
            return Err(ConfigError::Missing(
                "a catalog source (CATALOG_FILE or SHEETS_SPREADSHEET_ID)",
            ));
        }

        let ledger_backend = match get("LEDGER_BACKEND").as_deref() {
            None | Some("sqlite") => LedgerBackend::Sqlite,
            Some("sheets") if sheets.is_some() => LedgerBackend::Sheets,
            Some("sheets") => {
                return Err(ConfigError::Missing(
                    "SHEETS_SPREADSHEET_ID for LEDGER_BACKEND=sheets",
                ))
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LEDGER_BACKEND",
                    value: other.to_string(),
                    expected: "sqlite or sheets",
                })
            }
        };

        let outbound = get("OUTBOUND_URL").map(|url| OutboundConfig {
            url,
            token: get("OUTBOUND_TOKEN"),
        });

        let idle_ttl_secs: u64 = parse_number(&get, "IDLE_TTL_SECS", DEFAULT_IDLE_TTL_SECS)?;
        let idle_ttl = match idle_ttl_secs {
            0 => None,
            secs => Some(
                i64::try_from(secs)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .ok_or(ConfigError::Invalid {
                        var: "IDLE_TTL_SECS",
                        value: secs.to_string(),
                        expected: "a smaller number of seconds",
                    })?,
            ),
        };

        Ok(Self {
            port: parse_number(&get, "PEDIDO_PORT", DEFAULT_PORT)?,
            db_path: get("PEDIDO_DB_PATH").map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            bot,
            sheets,
            catalog_file,
            catalog_timeout: Duration::from_secs(parse_number(
                &get,
                "CATALOG_TIMEOUT_SECS",
                DEFAULT_CATALOG_TIMEOUT_SECS,
            )?),
            ledger_backend,
            outbound,
            idle_ttl,
        })
    }
}

/// Service-account key from the variables of a downloaded key file
/// (`CLIENT_EMAIL`, `PRIVATE_KEY`, `PRIVATE_KEY_ID`, `TOKEN_URI`).
/// The private key may carry escaped `\\n` line breaks.
fn service_account<G>(get: &G) -> Result<Option<ServiceAccountKey>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match (get("CLIENT_EMAIL"), get("PRIVATE_KEY")) {
        (Some(client_email), Some(private_key)) => Ok(Some(ServiceAccountKey {
            client_email,
            private_key: private_key.replace("\\n", "\n"),
            private_key_id: get("PRIVATE_KEY_ID"),
            token_uri: get("TOKEN_URI").unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::Missing(
            "both CLIENT_EMAIL and PRIVATE_KEY for a service account",
        )),
    }
}

fn parse_number<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            expected: "a non-negative integer",
        }),
    }
}
