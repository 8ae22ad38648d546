use clap::Parser;
use clap::error::ErrorKind;
use std::io::IsTerminal;
use std::time::Duration;
use taskboard_cli::cli::{Cli, Command, ThemeCommand, collect_config_overrides};
use taskboard_cli::render;
use taskboard_core::board::{DropEvent, DropOutcome, handle_drop, load_board};
use taskboard_core::comments::{add_comment, list_comments};
use taskboard_core::config::{
    Backend, Config, ConfigOverrides, JsonThemeStore, Palette, ThemeController, ThemeSettings,
    ThemeUpdate, load_config_with_fallback, merge_overrides, theme_path,
};
use taskboard_core::deadline::{WarningLedger, evaluate};
use taskboard_core::error::AppError;
use taskboard_core::model::{TaskDraft, TaskPatch};
use taskboard_core::notify::notifier_from_env;
use taskboard_core::store::{DataApi, FileStore, StrapiClient, file};
use taskboard_core::task_api::{self, NotificationOutcome};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

const LOG_ENV_VAR: &str = "TASKBOARD_LOG";
const STORE_ENV_VAR: &str = "TASKBOARD_STORE_PATH";

struct Context {
    config: Config,
    overrides: ConfigOverrides,
    json: bool,
}

impl Context {
    fn plain_output(&self) -> bool {
        self.json || std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal()
    }

    /// Palette for data commands. A broken theme file only costs the colors.
    fn palette(&self) -> Palette {
        if self.plain_output() {
            return Palette::plain();
        }
        match self.theme() {
            Ok(theme) => theme.tokens().palette(),
            Err(err) => {
                warn!(error = %err, "theme ignored, using config theme");
                self.config_theme().resolve().palette()
            }
        }
    }

    fn config_theme(&self) -> ThemeSettings {
        let mut settings = self.config.theme.clone();
        self.overrides.theme.apply(&mut settings);
        settings
    }

    fn theme(&self) -> Result<ThemeController<JsonThemeStore>, AppError> {
        let store = JsonThemeStore::new(theme_path()?);
        let mut controller = ThemeController::load(store, self.config.theme.clone())?;
        controller.apply_overrides(&self.overrides.theme);
        Ok(controller)
    }

    fn open_api(&self) -> Result<Box<dyn DataApi>, AppError> {
        let env_store = std::env::var(STORE_ENV_VAR)
            .ok()
            .filter(|path| !path.trim().is_empty());

        if env_store.is_some() || self.config.api.backend == Backend::File {
            let path = match self.config.store_path.clone() {
                Some(path) if env_store.is_none() => path,
                _ => file::store_path()?,
            };
            debug!(path = %path.display(), "using file store");
            return Ok(Box::new(FileStore::open(&path)?));
        }

        let timeout = self.config.api.timeout_secs.map(Duration::from_secs);
        let client = StrapiClient::new(&self.config.api.base_url, self.config.api_token(), timeout)?;
        debug!(url = client.api_url(), "using strapi store");
        Ok(Box::new(client))
    }
}

fn init_tracing(verbose: bool) -> Result<(), AppError> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| AppError::io(format!("failed to initialize logging: {err}")))
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn print_outcome(outcome: &NotificationOutcome, ctx: &Context, palette: &Palette) {
    if ctx.json {
        let failures: Vec<_> = outcome
            .failures
            .iter()
            .map(|failure| {
                serde_json::json!({
                    "task_id": failure.task_id,
                    "code": failure.error.code(),
                    "message": failure.error.message(),
                })
            })
            .collect();
        let payload = serde_json::json!({
            "warnings": outcome.warnings,
            "failures": failures,
        });
        println!("{payload}");
    } else {
        println!("{}", render::warnings_text(&outcome.warnings, palette));
        for failure in &outcome.failures {
            eprintln!("WARNING: notification for task {} failed: {}", failure.task_id, failure.error);
        }
    }
}

fn run_watch(ctx: &Context, interval: u64) -> Result<(), AppError> {
    let api = ctx.open_api()?;
    let palette = ctx.palette();
    let notifier = notifier_from_env()?;
    let policy = ctx.config.deadline_policy();
    let mut ledger = WarningLedger::new();
    let pause = Duration::from_secs(interval.max(1));

    info!(interval = pause.as_secs(), "watching board");
    loop {
        match task_api::notify_deadlines(
            api.as_ref(),
            notifier.as_ref(),
            &mut ledger,
            &policy,
            OffsetDateTime::now_utc(),
            ctx.config.page_size(),
        ) {
            Ok(outcome) => {
                if !outcome.warnings.is_empty() || !outcome.failures.is_empty() {
                    print_outcome(&outcome, ctx, &palette);
                }
                debug!(tracked = ledger.len(), "board reloaded");
            }
            Err(err) => warn!(error = %err, "reload failed, keeping last board"),
        }
        std::thread::sleep(pause);
    }
}

fn run_command(cli: Cli, ctx: &Context) -> Result<(), AppError> {
    match cli.command {
        Command::Watch { interval } => run_watch(ctx, interval),
        Command::Theme { theme } => run_theme(theme, ctx),
        command => run_store_command(command, ctx),
    }
}

fn run_store_command(command: Command, ctx: &Context) -> Result<(), AppError> {
    let api = ctx.open_api()?;
    let api = api.as_ref();
    let page_size = ctx.config.page_size();
    let policy = ctx.config.deadline_policy();
    let now = OffsetDateTime::now_utc();

    match command {
        Command::Board => {
            let board = load_board(api, page_size)?;
            if ctx.json {
                println!("{}", render::to_json(&board)?);
            } else {
                let tasks: Vec<_> = board
                    .columns()
                    .iter()
                    .flat_map(|column| column.tasks.iter().cloned())
                    .collect();
                let warnings = evaluate(&tasks, now, &policy);
                println!("{}", render::board_text(&board, &warnings, &ctx.palette()));
            }
        }
        Command::List { status } => {
            let tasks = match status {
                Some(status) => task_api::list_tasks_by_status(api, status, page_size)?,
                None => task_api::list_tasks(api, page_size)?,
            };
            if ctx.json {
                println!("{}", render::to_json(&tasks)?);
            } else {
                let warnings = evaluate(&tasks, now, &policy);
                println!("{}", render::tasks_text(&tasks, &warnings, &ctx.palette()));
            }
        }
        Command::Show { id } => match task_api::get_task(api, id) {
            Ok(task) => {
                if ctx.json {
                    println!("{}", render::to_json(&task)?);
                } else {
                    let warnings = evaluate(std::slice::from_ref(&task), now, &policy);
                    println!("{}", render::task_detail_text(&task, &warnings, &ctx.palette()));
                }
            }
            Err(err) if err.is_not_found() => {
                if ctx.json {
                    println!("null");
                } else {
                    println!("No task found with id {id}");
                }
            }
            Err(err) => return Err(err),
        },
        Command::Add {
            description,
            notes,
            priority,
            status,
            issue_date,
            due,
            customer,
            resolver,
        } => {
            let mut draft = TaskDraft::new(description);
            draft.notes = notes;
            draft.priority = priority.unwrap_or_default();
            draft.status = status.unwrap_or_default();
            draft.issue_date = issue_date;
            draft.tobe_completed_date = due;
            draft.customer = customer;
            draft.resolver = resolver;

            let task = task_api::create_task(api, draft)?;
            if ctx.json {
                println!("{}", render::to_json(&task)?);
            } else {
                println!("Added task: {} ({})", task.issue_description, task.id);
            }
        }
        Command::Edit {
            id,
            description,
            notes,
            clear_notes,
            priority,
            issue_date,
            due,
            clear_due,
            completed_on,
            customer,
            resolver,
        } => {
            let patch = TaskPatch {
                issue_description: description,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
                priority,
                status: None,
                issue_date: issue_date.map(Some),
                tobe_completed_date: if clear_due { Some(None) } else { due.map(Some) },
                actual_complete_date: completed_on.map(Some),
                customer: customer.map(Some),
                resolver: resolver.map(Some),
            };

            let task = task_api::update_task(api, id, patch)?;
            if ctx.json {
                println!("{}", render::to_json(&task)?);
            } else {
                println!("Updated task: {} ({})", task.issue_description, task.id);
            }
        }
        Command::Move { id, status } => {
            let event = DropEvent {
                task_id: id,
                destination: Some(status),
            };
            match handle_drop(api, ctx.config.transition_policy(), &event)? {
                DropOutcome::Moved(task) => {
                    if ctx.json {
                        println!("{}", render::to_json(&task)?);
                    } else {
                        println!("Moved task: {} ({}) to {}", task.issue_description, task.id, task.status);
                    }
                }
                DropOutcome::Ignored => println!("Nothing to move"),
            }
        }
        Command::Delete { id } => {
            let task = task_api::delete_task(api, id)?;
            if ctx.json {
                println!("{}", render::to_json(&task)?);
            } else {
                println!("Deleted task: {} ({})", task.issue_description, task.id);
            }
        }
        Command::Comment {
            id,
            content,
            author,
        } => {
            let author = author.or(ctx.config.identity.user_id);
            let comment = add_comment(api, id, &content, author)?;
            if ctx.json {
                println!("{}", render::to_json(&comment)?);
            } else {
                println!("Added comment {} to task {}", comment.id, id);
            }
        }
        Command::Comments { id } => {
            let comments = list_comments(api, id)?;
            if ctx.json {
                println!("{}", render::to_json(&comments)?);
            } else {
                println!("{}", render::comments_text(&comments, &ctx.palette()));
            }
        }
        Command::Customers => {
            let customers = task_api::list_customers(api, page_size)?;
            if ctx.json {
                println!("{}", render::to_json(&customers)?);
            } else {
                println!("{}", render::customers_text(&customers, &ctx.palette()));
            }
        }
        Command::Users => {
            let users = task_api::list_users(api, page_size)?;
            if ctx.json {
                println!("{}", render::to_json(&users)?);
            } else {
                println!("{}", render::users_text(&users, &ctx.palette()));
            }
        }
        Command::Notify => {
            let notifier = notifier_from_env()?;
            let mut ledger = WarningLedger::new();
            let outcome = task_api::notify_deadlines(
                api,
                notifier.as_ref(),
                &mut ledger,
                &policy,
                now,
                page_size,
            )?;
            print_outcome(&outcome, ctx, &ctx.palette());
        }
        // Handled by run_command.
        Command::Watch { .. } | Command::Theme { .. } => {}
    }

    Ok(())
}

fn run_theme(command: ThemeCommand, ctx: &Context) -> Result<(), AppError> {
    let mut theme = ctx.theme()?;

    match command {
        ThemeCommand::Show => {}
        ThemeCommand::Toggle => {
            let mode = theme.toggle_mode()?;
            info!(%mode, "theme mode switched");
        }
        ThemeCommand::Set {
            mode,
            scheme,
            radius,
            font,
        } => theme.update(ThemeUpdate {
            mode,
            color_scheme: scheme,
            border_radius: radius,
            font_family: font,
        })?,
    }

    let tokens = theme.tokens();
    if ctx.json {
        println!("{}", render::to_json(&tokens)?);
    } else {
        let palette = if ctx.plain_output() {
            Palette::plain()
        } else {
            tokens.palette()
        };
        println!("{}", render::theme_text(&tokens, &palette));
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("ERROR: {}", err);
    }

    let overrides = match collect_config_overrides(&cli.config_override) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("ERROR: {}", AppError::invalid_input(message));
            std::process::exit(1);
        }
    };

    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        warn!(error = %err, "config ignored, using defaults");
    }

    let ctx = Context {
        config: merge_overrides(&loaded.config, &overrides),
        overrides,
        json: cli.json,
    };

    if let Err(err) = run_command(cli, &ctx) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
