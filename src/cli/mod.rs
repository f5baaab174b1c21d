mod render;
pub mod shell;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    api::{HttpTaskClient, TaskApi},
    drafts::{DraftStore, TaskFormDraft},
    projection::{ViewOptions, category_counts, project},
    settings::Settings,
    store::{BulkOutcome, StoreError, TaskStore},
    summary::Summary,
    theme::{ThemePreset, is_hex_color},
    types::{Category, CategoryDraft, CategoryId, TaskPatch},
};

use render::{
    category_counts_json, category_json, render_category_chips, render_category_list_text,
    render_summary_text, render_task_detail, render_task_list_text, task_json,
};

const SCHEMA_VERSION: &str = "cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    /// Completion and deadline overview
    Summary,
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Interactive session with selection, pinning and confirmations
    Shell,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    List(TaskListArgs),
    Show(TaskIdArgs),
    Add(TaskAddArgs),
    Edit(TaskEditArgs),
    /// Toggle completion
    Done(TaskIdArgs),
    Delete(TaskIdsArgs),
    /// Mark several tasks done at once
    Complete(TaskIdsArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum CategoryCommand {
    List,
    Create(CategoryCreateArgs),
    Rename(CategoryRenameArgs),
    Delete(CategoryIdArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum DraftCommand {
    Show,
    Set(DraftSetArgs),
    Clear,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// Update the settings file; environment and flag overrides are not saved
    Set(SettingsSetArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TaskListArgs {
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    #[arg(long)]
    pub no_done_last: bool,

    #[arg(long)]
    pub no_pinned_first: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TaskIdArgs {
    #[arg(value_name = "TASK_ID")]
    pub id: String,
}

#[derive(Debug, Clone, Args)]
pub struct TaskIdsArgs {
    #[arg(value_name = "TASK_ID", required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskAddArgs {
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub deadline: Option<NaiveDate>,

    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,

    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    #[arg(long, value_name = "EMOJI")]
    pub emoji: Option<String>,

    /// Start from the saved draft; explicit flags take precedence
    #[arg(long)]
    pub from_draft: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TaskEditArgs {
    #[arg(value_name = "TASK_ID")]
    pub id: String,

    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,

    #[arg(long, value_name = "TEXT", conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        value_parser = parse_date,
        conflicts_with = "clear_deadline"
    )]
    pub deadline: Option<NaiveDate>,

    #[arg(long)]
    pub clear_deadline: bool,

    #[arg(long = "category", value_name = "CATEGORY", conflicts_with = "clear_categories")]
    pub categories: Vec<String>,

    #[arg(long)]
    pub clear_categories: bool,

    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    #[arg(long, value_name = "EMOJI", conflicts_with = "clear_emoji")]
    pub emoji: Option<String>,

    #[arg(long)]
    pub clear_emoji: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CategoryCreateArgs {
    #[arg(long, value_name = "TEXT")]
    pub name: String,

    #[arg(long, value_name = "EMOJI")]
    pub emoji: Option<String>,

    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct CategoryRenameArgs {
    #[arg(value_name = "CATEGORY")]
    pub id: String,

    #[arg(long, value_name = "TEXT")]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct CategoryIdArgs {
    #[arg(value_name = "CATEGORY")]
    pub id: String,
}

#[derive(Debug, Clone, Args)]
pub struct DraftSetArgs {
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub deadline: Option<NaiveDate>,

    #[arg(long = "category", value_name = "CATEGORY_ID")]
    pub categories: Vec<String>,

    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    #[arg(long, value_name = "EMOJI")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsSetArgs {
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_name = "PRESET")]
    pub theme: Option<String>,

    #[arg(long, value_name = "HEX")]
    pub default_color: Option<String>,

    #[arg(long, value_name = "BOOL")]
    pub done_last: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    pub pinned_first: Option<bool>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

/// Connection and local state shared by one-shot commands and the shell.
pub struct Session<C> {
    pub store: TaskStore<C>,
    pub settings: Settings,
    pub drafts: DraftStore,
    settings_path: Option<PathBuf>,
}

impl Session<HttpTaskClient> {
    pub fn connect(settings: Settings) -> anyhow::Result<Self> {
        let client = HttpTaskClient::new(&settings.api_config())?;
        let drafts = DraftStore::open_default()?;
        Ok(Self::new(client, settings, drafts))
    }
}

impl<C> Session<C>
where
    C: TaskApi + 'static,
{
    pub fn new(client: C, settings: Settings, drafts: DraftStore) -> Self {
        let store = TaskStore::new(client, settings.store_options());
        Self {
            store,
            settings,
            drafts,
            settings_path: Settings::config_path(),
        }
    }

    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    /// Categories first so task category colors come from the palette.
    pub async fn refresh(&mut self) {
        self.store.load_categories().await;
        self.store.load().await;
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

pub async fn run(settings: Settings, command: RootCommand, json_output: bool, quiet: bool) -> i32 {
    let mut session = match Session::connect(settings) {
        Ok(session) => session,
        Err(err) => {
            let err = runtime_error(format!("{err:#}"));
            print_error(&err, json_output);
            return err.exit_code;
        }
    };

    if matches!(command, RootCommand::Shell) {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        return match shell::run_shell(&mut session, stdin, &mut stdout).await {
            Ok(()) => 0,
            Err(err) => {
                let err = runtime_error(format!("{err:#}"));
                print_error(&err, json_output);
                err.exit_code
            }
        };
    }

    match execute(&mut session, command).await {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

pub(crate) struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl CliError {
    pub(crate) fn display_line(&self) -> String {
        format!("error[{}]: {}", self.code, self.message)
    }
}

type CliResult<T> = Result<T, CliError>;

pub(crate) async fn execute<C>(
    session: &mut Session<C>,
    command: RootCommand,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    match command {
        RootCommand::Draft { command } => execute_draft_command(session, command),
        RootCommand::Settings { command } => execute_settings_command(session, command),
        RootCommand::Shell => Err(usage_error(
            "SHELL_NOT_NESTABLE",
            "the shell cannot be started from inside a command",
        )),
        RootCommand::Task { command } => {
            session.refresh().await;
            execute_task_command(session, command).await
        }
        RootCommand::Category { command } => {
            session.refresh().await;
            execute_category_command(session, command).await
        }
        RootCommand::Summary => {
            session.refresh().await;
            Ok(summary(session))
        }
    }
}

async fn execute_task_command<C>(
    session: &mut Session<C>,
    command: TaskCommand,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    match command {
        TaskCommand::List(args) => task_list(session, args),
        TaskCommand::Show(args) => task_show(session, args),
        TaskCommand::Add(args) => task_add(session, args).await,
        TaskCommand::Edit(args) => task_edit(session, args).await,
        TaskCommand::Done(args) => task_done(session, args).await,
        TaskCommand::Delete(args) => task_delete(session, args).await,
        TaskCommand::Complete(args) => task_complete(session, args).await,
    }
}

async fn execute_category_command<C>(
    session: &mut Session<C>,
    command: CategoryCommand,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    match command {
        CategoryCommand::List => Ok(category_list(session)),
        CategoryCommand::Create(args) => category_create(session, args).await,
        CategoryCommand::Rename(args) => category_rename(session, args).await,
        CategoryCommand::Delete(args) => category_delete(session, args).await,
    }
}

fn task_list<C>(session: &Session<C>, args: TaskListArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let mut options = ViewOptions::from_settings(&session.settings)
        .with_search(args.search.unwrap_or_default());
    if args.no_done_last {
        options.done_last = false;
    }
    if args.no_pinned_first {
        options.pinned_first = false;
    }
    if let Some(selector) = args.category.as_deref() {
        let category = session.store.resolve_category(selector).map_err(store_error)?;
        options.category = Some(category.id.clone());
    }

    let today = session.today();
    let projected = project(session.store.tasks(), &options);
    let chip_view = options.clone().with_category(None);
    let counts = category_counts(session.store.tasks(), &chip_view);
    let data = json!({
        "tasks": projected.iter().map(|task| task_json(task, today)).collect::<Vec<_>>(),
        "categories": category_counts_json(&counts),
        "filters": {
            "search": options.search,
            "category": options.category,
            "pinned_first": options.pinned_first,
            "done_last": options.done_last
        }
    });

    let mut text = if projected.is_empty() && options.is_filtering() {
        "No tasks match the current filters.".to_string()
    } else {
        render_task_list_text(&projected, today)
    };
    if let Some(chips) = render_category_chips(&counts) {
        text = format!("{chips}\n{text}");
    }

    Ok(CommandOutput {
        command: "task list",
        text,
        data,
    })
}

fn task_show<C>(session: &Session<C>, args: TaskIdArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let task_id = session.store.resolve_task_id(&args.id).map_err(store_error)?;
    let task = session
        .store
        .task(task_id)
        .ok_or_else(|| store_error(StoreError::TaskNotFound(task_id)))?;
    let today = session.today();

    Ok(CommandOutput {
        command: "task show",
        data: json!({ "task": task_json(task, today) }),
        text: render_task_detail(task, today),
    })
}

async fn task_add<C>(session: &mut Session<C>, args: TaskAddArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let mut form = if args.from_draft {
        let saved = session.drafts.load();
        if saved.is_empty() {
            return Err(usage_error("DRAFT_EMPTY", "no saved draft to create a task from"));
        }
        saved
    } else {
        TaskFormDraft::default()
    };

    if let Some(name) = args.name {
        form.name = name;
    }
    if let Some(description) = args.description {
        form.description = Some(description);
    }
    if args.deadline.is_some() {
        form.deadline = args.deadline;
    }
    if let Some(color) = args.color {
        form.color = Some(validate_color(color)?);
    }
    if args.emoji.is_some() {
        form.emoji = args.emoji;
    }
    if !args.categories.is_empty() {
        form.category_ids = resolve_categories(session, &args.categories)?
            .into_iter()
            .map(|category| category.id)
            .collect();
    }

    let draft = form.to_task_draft(session.store.categories());
    let created = session.store.create(draft).await.map_err(store_error)?;

    if args.from_draft {
        if let Err(err) = session.drafts.clear() {
            warn!(error = %err, "task created but the draft could not be cleared");
        }
    }

    Ok(CommandOutput {
        command: "task add",
        text: format!("created task {} {}", created.short_id(), created.name),
        data: json!({ "task": task_json(&created, session.today()) }),
    })
}

async fn task_edit<C>(session: &mut Session<C>, args: TaskEditArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let task_id = session.store.resolve_task_id(&args.id).map_err(store_error)?;

    let mut patch = TaskPatch {
        name: args.name,
        ..TaskPatch::default()
    };
    if args.clear_description {
        patch.description = Some(None);
    } else if let Some(description) = args.description {
        patch.description = Some(Some(description));
    }
    if args.clear_deadline {
        patch.deadline = Some(None);
    } else if let Some(deadline) = args.deadline {
        patch.deadline = Some(Some(deadline));
    }
    if args.clear_categories {
        patch.categories = Some(Vec::new());
    } else if !args.categories.is_empty() {
        patch.categories = Some(resolve_categories(session, &args.categories)?);
    }
    if let Some(color) = args.color {
        patch.color = Some(validate_color(color)?);
    }
    if args.clear_emoji {
        patch.emoji = Some(None);
    } else if let Some(emoji) = args.emoji {
        patch.emoji = Some(Some(emoji));
    }

    if patch.is_empty() {
        return Err(usage_error(
            "TASK_EDIT_EMPTY",
            "nothing to change; pass at least one field flag",
        ));
    }

    let updated = session
        .store
        .update(task_id, patch)
        .await
        .map_err(store_error)?;

    Ok(CommandOutput {
        command: "task edit",
        text: format!("updated task {} {}", updated.short_id(), updated.name),
        data: json!({ "task": task_json(&updated, session.today()) }),
    })
}

async fn task_done<C>(session: &mut Session<C>, args: TaskIdArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let task_id = session.store.resolve_task_id(&args.id).map_err(store_error)?;
    let updated = session
        .store
        .toggle_done(task_id)
        .await
        .map_err(store_error)?;
    let verb = if updated.done { "completed" } else { "reopened" };

    Ok(CommandOutput {
        command: "task done",
        text: format!("{verb} task {} {}", updated.short_id(), updated.name),
        data: json!({ "task": task_json(&updated, session.today()) }),
    })
}

async fn task_delete<C>(session: &mut Session<C>, args: TaskIdsArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let ids = resolve_task_ids(session, &args.ids)?;

    if let [task_id] = ids.as_slice() {
        let task_id = *task_id;
        session.store.remove(task_id).await.map_err(store_error)?;
        return Ok(CommandOutput {
            command: "task delete",
            text: format!("deleted task {task_id}"),
            data: json!({ "deleted": [task_id], "failed": [] }),
        });
    }

    let outcome = session.store.remove_many(&ids).await;
    bulk_output("task delete", "deleted", outcome)
}

async fn task_complete<C>(session: &mut Session<C>, args: TaskIdsArgs) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let ids = resolve_task_ids(session, &args.ids)?;
    let outcome = session.store.mark_many_done(&ids).await;
    bulk_output("task complete", "completed", outcome)
}

fn bulk_output(
    command: &'static str,
    verb: &str,
    outcome: BulkOutcome,
) -> CliResult<CommandOutput> {
    let succeeded = outcome.succeeded.clone();
    let mut data = json!({
        "failed": outcome
            .failed
            .iter()
            .map(|(id, err)| json!({ "id": id, "code": err.code(), "message": err.to_string() }))
            .collect::<Vec<_>>()
    });
    if let Some(object) = data.as_object_mut() {
        object.insert(verb.to_string(), json!(succeeded));
    }

    if outcome.is_complete() {
        return Ok(CommandOutput {
            command,
            text: format!("{verb} {} tasks", succeeded.len()),
            data,
        });
    }

    if let Some(object) = data.as_object_mut() {
        object.insert("requested".to_string(), json!(succeeded.len() + outcome.failed.len()));
    }
    Err(CliError {
        exit_code: 5,
        code: "BULK_PARTIAL_FAILURE",
        message: format!(
            "{verb} {} tasks; {} failed",
            succeeded.len(),
            outcome.failed.len()
        ),
        details: Some(data),
    })
}

fn category_list<C>(session: &Session<C>) -> CommandOutput
where
    C: TaskApi + 'static,
{
    let categories = session.store.categories();
    CommandOutput {
        command: "category list",
        data: json!({
            "categories": categories.iter().map(category_json).collect::<Vec<_>>()
        }),
        text: render_category_list_text(categories, session.store.tasks()),
    }
}

async fn category_create<C>(
    session: &mut Session<C>,
    args: CategoryCreateArgs,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let color = args.color.map(validate_color).transpose()?;
    let created = session
        .store
        .create_category(CategoryDraft {
            name: args.name,
            emoji: args.emoji,
            color,
        })
        .await
        .map_err(store_error)?;

    Ok(CommandOutput {
        command: "category create",
        text: format!("created category {} ({})", created.name, created.id),
        data: json!({ "category": category_json(&created) }),
    })
}

async fn category_rename<C>(
    session: &mut Session<C>,
    args: CategoryRenameArgs,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let category_id = resolve_category_id(session, &args.id)?;
    let renamed = session
        .store
        .rename_category(
            &category_id,
            CategoryDraft {
                name: args.name,
                ..CategoryDraft::default()
            },
        )
        .await
        .map_err(store_error)?;

    Ok(CommandOutput {
        command: "category rename",
        text: format!("renamed category {} to {}", renamed.id, renamed.name),
        data: json!({ "category": category_json(&renamed) }),
    })
}

async fn category_delete<C>(
    session: &mut Session<C>,
    args: CategoryIdArgs,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    let category_id = resolve_category_id(session, &args.id)?;
    session
        .store
        .remove_category(&category_id)
        .await
        .map_err(store_error)?;

    Ok(CommandOutput {
        command: "category delete",
        text: format!("deleted category {category_id}"),
        data: json!({ "deleted": true, "category_id": category_id }),
    })
}

fn summary<C>(session: &Session<C>) -> CommandOutput
where
    C: TaskApi + 'static,
{
    let summary = Summary::compute(session.store.tasks(), session.today());
    CommandOutput {
        command: "summary",
        text: render_summary_text(&summary),
        data: json!({ "summary": summary }),
    }
}

fn execute_draft_command<C>(
    session: &mut Session<C>,
    command: DraftCommand,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    match command {
        DraftCommand::Show => {
            let draft = session.drafts.load();
            let text = if draft.is_empty() {
                "No draft saved.".to_string()
            } else {
                render_draft_text(&draft)
            };
            Ok(CommandOutput {
                command: "draft show",
                data: json!({ "draft": draft, "path": session.drafts.path() }),
                text,
            })
        }
        DraftCommand::Set(args) => {
            let mut draft = session.drafts.load();
            if let Some(name) = args.name {
                draft.name = name;
            }
            if let Some(description) = args.description {
                draft.description = Some(description);
            }
            if args.deadline.is_some() {
                draft.deadline = args.deadline;
            }
            if let Some(color) = args.color {
                draft.color = Some(validate_color(color)?);
            }
            if args.emoji.is_some() {
                draft.emoji = args.emoji;
            }
            if !args.categories.is_empty() {
                draft.category_ids = args
                    .categories
                    .iter()
                    .map(|raw| CategoryId::new(raw.trim()))
                    .collect();
            }

            session.drafts.save(&draft).map_err(runtime_error)?;
            Ok(CommandOutput {
                command: "draft set",
                text: format!("saved draft to {}", session.drafts.path().display()),
                data: json!({ "draft": draft }),
            })
        }
        DraftCommand::Clear => {
            session.drafts.clear().map_err(runtime_error)?;
            Ok(CommandOutput {
                command: "draft clear",
                text: "cleared draft".to_string(),
                data: json!({ "cleared": true }),
            })
        }
    }
}

fn execute_settings_command<C>(
    session: &mut Session<C>,
    command: SettingsCommand,
) -> CliResult<CommandOutput>
where
    C: TaskApi + 'static,
{
    match command {
        SettingsCommand::Show => Ok(CommandOutput {
            command: "settings show",
            data: json!({
                "settings": session.settings,
                "theme": session.settings.theme_preset().as_str(),
                "path": session.settings_path
            }),
            text: render_settings_text(&session.settings, session.settings_path.as_deref()),
        }),
        SettingsCommand::Set(args) => {
            let path = session
                .settings_path
                .clone()
                .ok_or_else(|| runtime_error("unable to determine config path"))?;
            let mut stored = Settings::load_from_path(&path);
            let mut changed = false;

            if let Some(url) = args.api_url {
                if url.trim().is_empty() {
                    return Err(usage_error("INVALID_API_URL", "the api url cannot be blank"));
                }
                stored.override_api_url(&url);
                changed = true;
            }
            if let Some(timeout_ms) = args.timeout_ms {
                stored.request_timeout_ms = timeout_ms;
                changed = true;
            }
            if let Some(theme) = args.theme {
                let preset = ThemePreset::from_str(&theme).map_err(|()| {
                    usage_error(
                        "INVALID_THEME",
                        format!("'{theme}' is not one of system, auto, light, dark"),
                    )
                })?;
                stored.theme = preset.as_str().to_string();
                changed = true;
            }
            if let Some(color) = args.default_color {
                stored.default_task_color = validate_color(color)?;
                changed = true;
            }
            if let Some(done_last) = args.done_last {
                stored.done_last = done_last;
                changed = true;
            }
            if let Some(pinned_first) = args.pinned_first {
                stored.pinned_first = pinned_first;
                changed = true;
            }
            if !changed {
                return Err(usage_error(
                    "SETTINGS_EMPTY",
                    "nothing to change; pass at least one setting flag",
                ));
            }

            stored
                .save_to_path(&path)
                .map_err(|err| runtime_error(format!("{err:#}")))?;
            let saved = Settings::load_from_path(&path);
            Ok(CommandOutput {
                command: "settings set",
                text: format!("saved settings to {}", path.display()),
                data: json!({ "settings": saved, "path": path }),
            })
        }
    }
}

fn render_settings_text(settings: &Settings, path: Option<&Path>) -> String {
    let path = path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "(none)".to_string());
    [
        format!("config file:   {path}"),
        format!("api base url:  {}", settings.api_base_url),
        format!("timeout:       {} ms", settings.request_timeout_ms),
        format!("theme:         {}", settings.theme_preset().as_str()),
        format!("palette:       {}", settings.color_list.join(" ")),
        format!("default color: {}", settings.default_task_color),
        format!("done last:     {}", settings.done_last),
        format!("pinned first:  {}", settings.pinned_first),
    ]
    .join("\n")
}

fn render_draft_text(draft: &TaskFormDraft) -> String {
    let mut lines = vec![format!("name:        {}", draft.name)];
    if let Some(description) = draft.description.as_deref() {
        lines.push(format!("description: {description}"));
    }
    if let Some(deadline) = draft.deadline {
        lines.push(format!("deadline:    {deadline}"));
    }
    if let Some(color) = draft.color.as_deref() {
        lines.push(format!("color:       {color}"));
    }
    if !draft.category_ids.is_empty() {
        lines.push(format!(
            "categories:  {}",
            draft
                .category_ids
                .iter()
                .map(CategoryId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    lines.join("\n")
}

fn resolve_task_ids<C>(session: &Session<C>, selectors: &[String]) -> CliResult<Vec<Uuid>>
where
    C: TaskApi + 'static,
{
    selectors
        .iter()
        .map(|selector| session.store.resolve_task_id(selector).map_err(store_error))
        .collect()
}

fn resolve_categories<C>(session: &Session<C>, selectors: &[String]) -> CliResult<Vec<Category>>
where
    C: TaskApi + 'static,
{
    selectors
        .iter()
        .map(|selector| {
            session
                .store
                .resolve_category(selector)
                .cloned()
                .map_err(store_error)
        })
        .collect()
}

fn resolve_category_id<C>(session: &Session<C>, selector: &str) -> CliResult<CategoryId>
where
    C: TaskApi + 'static,
{
    session
        .store
        .resolve_category(selector)
        .map(|category| category.id.clone())
        .map_err(store_error)
}

fn validate_color(color: String) -> CliResult<String> {
    if is_hex_color(&color) {
        Ok(color.trim().to_string())
    } else {
        Err(usage_error(
            "INVALID_COLOR",
            format!("'{color}' is not a hex color like #88c9f2"),
        ))
    }
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
        details: None,
    }
}

fn not_found_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 3,
        code,
        message: message.into(),
        details: None,
    }
}

fn conflict_error(
    code: &'static str,
    message: impl Into<String>,
    details: Option<Value>,
) -> CliError {
    CliError {
        exit_code: 4,
        code,
        message: message.into(),
        details,
    }
}

fn runtime_error(err: impl std::fmt::Display) -> CliError {
    CliError {
        exit_code: 5,
        code: "RUNTIME_ERROR",
        message: err.to_string(),
        details: None,
    }
}

pub(crate) fn store_error(err: StoreError) -> CliError {
    let code = err.code();
    let message = err.to_string();
    match &err {
        StoreError::Validation(validation) => CliError {
            exit_code: 2,
            code,
            message,
            details: Some(json!({ "field": validation.field() })),
        },
        StoreError::TaskNotFound(_)
        | StoreError::UnknownTask(_)
        | StoreError::CategoryNotFound(_) => not_found_error(code, message),
        StoreError::AmbiguousTask { .. } => conflict_error(code, message, None),
        StoreError::Remote(remote) if remote.status() == Some(404) => {
            not_found_error(code, message)
        }
        StoreError::Remote(remote) => CliError {
            exit_code: 5,
            code,
            message,
            details: remote.status().map(|status| json!({ "status": status })),
        },
    }
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(
        code = err.code,
        message = %err.message,
        details = ?err.details,
        "cli command failed"
    );

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message,
                "details": err.details
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("{}", err.display_line());
}
