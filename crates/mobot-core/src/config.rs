use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use reqwest::Url;

use crate::{errors::Error, Result};

/// Tokens handled by the dispatcher itself; they can never name a category.
pub const START_COMMAND: &str = "start";
pub const USERS_COMMAND: &str = "users";

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "rmo", "inmo", "amc8", "amc10", "amc12", "aime", "usamo", "imo",
];

const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// A content command and the competition it serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub token: String,
    pub title: String,
}

impl Category {
    pub fn new(token: &str) -> Self {
        let token = token.trim().to_lowercase();
        let title = known_title(&token)
            .map(str::to_string)
            .unwrap_or_else(|| token.to_uppercase());
        Self { token, title }
    }

    /// Label used in captions and empty-category replies.
    pub fn label(&self) -> String {
        self.token.to_uppercase()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: Url,
    pub listen: SocketAddr,
    pub secret_token: Option<String>,
}

/// How updates reach the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    Polling,
    Webhook(WebhookConfig),
}

/// Typed configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub admin_id: i64,

    // Content + tracking
    pub problems_dir: PathBuf,
    pub users_file: PathBuf,
    pub categories: Vec<Category>,

    pub transport: Transport,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let telegram_bot_token = get("TELEGRAM_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_TOKEN environment variable is required".to_string())
            })?;

        let admin_raw = get("ADMIN_ID").ok_or_else(|| {
            Error::Config("ADMIN_ID environment variable is required".to_string())
        })?;
        let admin_id = admin_raw.trim().parse::<i64>().map_err(|_| {
            Error::Config(format!("ADMIN_ID must be a numeric user id, got {admin_raw:?}"))
        })?;

        let problems_dir = get("PROBLEMS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("problems"));
        let users_file = get("USER_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("users.txt"));

        let categories = parse_categories(get("CATEGORIES"))?;
        let transport = parse_transport(&get)?;

        Ok(Self {
            telegram_bot_token,
            admin_id,
            problems_dir,
            users_file,
            categories,
            transport,
        })
    }

    pub fn category(&self, token: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.token == token)
    }
}

fn known_title(token: &str) -> Option<&'static str> {
    Some(match token {
        "rmo" => "Regional Mathematics Olympiad",
        "inmo" => "Indian National Mathematics Olympiad",
        "amc8" => "American Math Competition 8",
        "amc10" => "American Math Competition 10",
        "amc12" => "American Math Competition 12",
        "aime" => "American Invitational Mathematics Examination",
        "usamo" => "USA Mathematical Olympiad",
        "imo" => "International Mathematical Olympiad",
        _ => return None,
    })
}

fn parse_categories(v: Option<String>) -> Result<Vec<Category>> {
    let tokens = match v {
        Some(raw) => parse_csv_lower(&raw),
        None => DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
    };

    let mut out: Vec<Category> = Vec::new();
    for token in tokens {
        if token == START_COMMAND || token == USERS_COMMAND {
            return Err(Error::Config(format!(
                "CATEGORIES may not contain the reserved command {token:?}"
            )));
        }
        if !is_valid_command_name(&token) {
            return Err(Error::Config(format!(
                "CATEGORIES entry {token:?} is not a valid command name"
            )));
        }
        if out.iter().any(|c| c.token == token) {
            continue;
        }
        out.push(Category::new(&token));
    }

    if out.is_empty() {
        return Err(Error::Config(
            "CATEGORIES must name at least one category".to_string(),
        ));
    }
    Ok(out)
}

fn parse_transport(get: &impl Fn(&str) -> Option<String>) -> Result<Transport> {
    let Some(raw_url) = get("WEBHOOK_URL") else {
        return Ok(Transport::Polling);
    };

    let url = Url::parse(raw_url.trim())
        .map_err(|e| Error::Config(format!("WEBHOOK_URL is not a valid URL: {e}")))?;

    let listen = match get("WEBHOOK_LISTEN") {
        Some(addr) => addr.trim().parse::<SocketAddr>().map_err(|e| {
            Error::Config(format!("WEBHOOK_LISTEN is not a socket address: {e}"))
        })?,
        None => {
            let port = match get("PORT") {
                Some(p) => p.trim().parse::<u16>().map_err(|_| {
                    Error::Config(format!("PORT must be a port number, got {p:?}"))
                })?,
                None => DEFAULT_WEBHOOK_PORT,
            };
            SocketAddr::from(([0, 0, 0, 0], port))
        }
    };

    let secret_token = get("WEBHOOK_SECRET");
    if let Some(secret) = &secret_token {
        if !is_valid_secret_token(secret) {
            return Err(Error::Config(
                "WEBHOOK_SECRET must be 1-256 characters of A-Z, a-z, 0-9, _ or -".to_string(),
            ));
        }
    }

    Ok(Transport::Webhook(WebhookConfig {
        url,
        listen,
        secret_token,
    }))
}

/// Telegram bot commands: 1-32 of lowercase ASCII letters, digits, underscores.
fn is_valid_command_name(s: &str) -> bool {
    (1..=32).contains(&s.len())
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn is_valid_secret_token(s: &str) -> bool {
    (1..=256).contains(&s.len())
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_csv_lower(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
