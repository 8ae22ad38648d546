use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskboard_core::config::{Backend, ConfigOverrides, Mode};
use taskboard_core::model::{Priority, TaskStatus};
use taskboard_core::workflow::TransitionPolicy;

#[derive(Parser, Debug)]
#[command(name = "taskboard", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,

    /// Log at debug level unless TASKBOARD_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the board, one column per status
    ///
    /// Example: taskboard board
    Board,
    /// List tasks, optionally only one status
    ///
    /// Example: taskboard list --status "In Progress"
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Show details of a task and its comments
    ///
    /// Example: taskboard show 3
    Show { id: u64 },
    /// Create a task
    ///
    /// Example: taskboard add "Replace pump seal" --priority High --due 2026-10-20
    Add {
        description: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Issue date (YYYY-MM-DD or RFC 3339)
        #[arg(long = "issue-date", value_name = "DATE")]
        issue_date: Option<String>,
        /// Target completion date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        #[arg(long, value_name = "ID")]
        customer: Option<u64>,
        #[arg(long, value_name = "ID")]
        resolver: Option<u64>,
    },
    /// Change fields of a task
    ///
    /// Example: taskboard edit 3 --notes "waiting on parts"
    /// Example: taskboard edit 3 --clear-due
    Edit {
        id: u64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long = "clear-notes")]
        clear_notes: bool,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long = "issue-date", value_name = "DATE")]
        issue_date: Option<String>,
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long = "clear-due")]
        clear_due: bool,
        /// Actual completion date (YYYY-MM-DD or RFC 3339)
        #[arg(long = "completed-on", value_name = "DATE")]
        completed_on: Option<String>,
        #[arg(long, value_name = "ID")]
        customer: Option<u64>,
        #[arg(long, value_name = "ID")]
        resolver: Option<u64>,
    },
    /// Move a task to another column
    ///
    /// Example: taskboard move 3 "In Progress"
    Move { id: u64, status: String },
    /// Delete a task and its comments
    ///
    /// Example: taskboard delete 3
    Delete { id: u64 },
    /// Add a comment to a task
    ///
    /// Example: taskboard comment 3 "Ordered the part" --author 2
    Comment {
        id: u64,
        content: String,
        /// Author user id; defaults to identity.user_id
        #[arg(long, value_name = "USER_ID")]
        author: Option<u64>,
    },
    /// List the comments of a task
    ///
    /// Example: taskboard comments 3
    Comments { id: u64 },
    /// List customers that tasks can be raised for
    ///
    /// Example: taskboard customers
    Customers,
    /// List users that can resolve tasks or author comments
    ///
    /// Example: taskboard users
    Users,
    /// Send notifications for overdue and approaching tasks
    ///
    /// Example: taskboard notify
    Notify,
    /// Reload the board on an interval and notify about deadlines
    ///
    /// Example: taskboard watch --interval 300
    Watch {
        /// Seconds between reloads
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
    /// Show or change the board theme
    Theme {
        #[command(subcommand)]
        theme: ThemeCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ThemeCommand {
    /// Print the active theme
    ///
    /// Example: taskboard theme show
    Show,
    /// Change and save theme settings
    ///
    /// Example: taskboard theme set --scheme "Gruvbox" --radius 4
    Set {
        #[arg(long)]
        mode: Option<Mode>,
        #[arg(long)]
        scheme: Option<String>,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        font: Option<String>,
    },
    /// Switch between light and dark mode
    ///
    /// Example: taskboard theme toggle
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Backend,
    BaseUrl,
    PageSize,
    TimeoutSecs,
    StorePath,
    UserId,
    ApproachDays,
    Transitions,
    ThemeMode,
    ThemeColorScheme,
    ThemeBorderRadius,
    ThemeFontFamily,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (section, remainder) = key_raw
        .split_once('.')
        .map(|(section, rest)| (section.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let section =
        canonicalize_flag_name(section).ok_or_else(|| "override key cannot be empty".to_string())?;
    let field = remainder.and_then(canonicalize_flag_name);

    let target = match (section.as_str(), field.as_deref()) {
        ("store_path", None) => ConfigOverrideTarget::StorePath,
        ("api", Some("backend")) => ConfigOverrideTarget::Backend,
        ("api", Some("base_url")) => ConfigOverrideTarget::BaseUrl,
        ("api", Some("page_size")) => ConfigOverrideTarget::PageSize,
        ("api", Some("timeout_secs")) => ConfigOverrideTarget::TimeoutSecs,
        ("identity", Some("user_id")) => ConfigOverrideTarget::UserId,
        ("deadline", Some("approach_days")) => ConfigOverrideTarget::ApproachDays,
        ("workflow", Some("transitions")) => ConfigOverrideTarget::Transitions,
        ("theme", Some("mode")) => ConfigOverrideTarget::ThemeMode,
        ("theme", Some("color_scheme" | "scheme")) => ConfigOverrideTarget::ThemeColorScheme,
        ("theme", Some("border_radius" | "radius")) => ConfigOverrideTarget::ThemeBorderRadius,
        ("theme", Some("font_family" | "font")) => ConfigOverrideTarget::ThemeFontFamily,
        ("api" | "identity" | "deadline" | "workflow" | "theme", None) => {
            return Err(format!("{section} override requires a field name"));
        }
        ("api" | "identity" | "deadline" | "workflow" | "theme", Some(other)) => {
            return Err(format!("unknown config field '{section}.{other}'"));
        }
        (other, _) => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` into one set of overrides; later values
/// win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry)?;
        let value = parsed.value.as_str();
        match parsed.target {
            ConfigOverrideTarget::Backend => {
                let backend = value.parse::<Backend>().map_err(|err| err.message().to_string())?;
                overrides.backend = Some(backend);
            }
            ConfigOverrideTarget::BaseUrl => overrides.base_url = Some(non_empty(entry, value)?),
            ConfigOverrideTarget::PageSize => overrides.page_size = Some(number(entry, value)?),
            ConfigOverrideTarget::TimeoutSecs => overrides.timeout_secs = Some(number(entry, value)?),
            ConfigOverrideTarget::StorePath => {
                overrides.store_path = Some(PathBuf::from(non_empty(entry, value)?));
            }
            ConfigOverrideTarget::UserId => overrides.user_id = Some(number(entry, value)?),
            ConfigOverrideTarget::ApproachDays => overrides.approach_days = Some(number(entry, value)?),
            ConfigOverrideTarget::Transitions => {
                overrides.transitions =
                    Some(TransitionPolicy::parse(value).map_err(|err| err.message().to_string())?);
            }
            ConfigOverrideTarget::ThemeMode => {
                let mode = value.parse::<Mode>().map_err(|err| err.message().to_string())?;
                overrides.theme.mode = Some(mode);
            }
            ConfigOverrideTarget::ThemeColorScheme => {
                overrides.theme.color_scheme = Some(non_empty(entry, value)?);
            }
            ConfigOverrideTarget::ThemeBorderRadius => {
                overrides.theme.border_radius = Some(number(entry, value)?);
            }
            ConfigOverrideTarget::ThemeFontFamily => {
                overrides.theme.font_family = Some(non_empty(entry, value)?);
            }
        }
    }

    Ok(overrides)
}

fn non_empty(entry: &str, value: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("override '{}' needs a value", entry.trim()))
    } else {
        Ok(value.to_string())
    }
}

fn number<T: std::str::FromStr>(entry: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("override '{}' needs a number", entry.trim()))
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
