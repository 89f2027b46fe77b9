use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::Result;

/// Process-wide configuration, read once at boot.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Bot API token. `None` when neither `BOT_TOKEN` nor `TELEGRAM_BOT_TOKEN` is set.
    pub bot_token: Option<String>,
    /// The single operator allowed to drive the bot.
    pub admin_user_id: Option<String>,
    /// Raw `alias:id,alias:id` string; parsed by [`crate::registry::AliasRegistry::build`].
    pub group_map: String,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    /// Load from the process environment, after merging a local `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Build from an arbitrary key lookup. Missing or blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let bot_token = get("BOT_TOKEN").or_else(|| get("TELEGRAM_BOT_TOKEN"));
        let admin_user_id = get("ADMIN_USER_ID").map(|s| s.trim().to_string());
        let group_map = lookup("GROUP_MAP").unwrap_or_default();

        let audit_log_path = get("AUDIT_LOG_PATH").map(PathBuf::from);
        let audit_log_json = get("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Self {
            bot_token,
            admin_user_id,
            group_map,
            audit_log_path,
            audit_log_json,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    // Real environment variables take precedence over the file.
    for (key, value) in dotenv_pairs(&contents) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` pairs from a `.env` file. Accepts an `export ` prefix and
/// one layer of matching quotes; comments and lines without `=` are skipped.
fn dotenv_pairs(contents: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    contents.lines().filter_map(|line| {
        let line = line.trim();
        if line.starts_with('#') {
            return None;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        (!key.is_empty()).then(|| (key, unquote(value.trim())))
    })
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q)?.strip_suffix(q))
        .unwrap_or(value)
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
