//! Line-oriented interactive session. Pinning, selection and the edit and
//! delete dialogs live only for the duration of the session.

use std::io::Write;

use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use uuid::Uuid;

use super::render::{render_category_chips, render_delete_prompt, render_summary_text};
use super::{Session, store_error};
use crate::api::TaskApi;
use crate::projection::{ViewOptions, category_counts, project};
use crate::selection::{DeleteTarget, MenuAnchor, SelectionController};
use crate::store::BulkOutcome;
use crate::summary::{Summary, deadline_status};
use crate::theme::is_hex_color;

const HELP: &str = "\
commands:
  list                      show tasks (numbers can be used as references)
  search [TEXT]             filter by name/description; no text clears
  category [CATEGORY]       filter by category; no argument clears
  menu REF [X Y]            open the task menu
  close                     close the task menu
  select [REF]              toggle selection; without REF selects the menu task
  clear                     clear the selection
  pin [REF] | done [REF]    toggle pinned / completion
  edit [REF]                open the edit dialog
  set FIELD VALUE           edit name, description, deadline or color
  save | cancel             finish the edit dialog
  delete [REF]              ask to delete a task, or the selection
  yes | no                  answer a delete confirmation
  complete                  mark every selected task done
  refresh | summary | help | quit";

enum Flow {
    Continue,
    Quit,
}

struct Shell<'a, C> {
    session: &'a mut Session<C>,
    selection: SelectionController,
    view: ViewOptions,
    listed: Vec<Uuid>,
}

pub async fn run_shell<C, R, W>(
    session: &mut Session<C>,
    input: R,
    output: &mut W,
) -> anyhow::Result<()>
where
    C: TaskApi + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    session.refresh().await;
    let view = ViewOptions::from_settings(&session.settings);
    let mut shell = Shell {
        session,
        selection: SelectionController::new(),
        view,
        listed: Vec::new(),
    };

    writeln!(
        output,
        "{} tasks loaded; type `help` for commands",
        shell.session.store.tasks().len()
    )?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if let Flow::Quit = shell.handle(line.trim(), output).await? {
            break;
        }
    }
    Ok(())
}

impl<C> Shell<'_, C>
where
    C: TaskApi + 'static,
{
    async fn handle<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "" => {}
            "help" | "?" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => {
                if self.selection.should_warn_before_leave() {
                    writeln!(out, "unsaved changes; `save`, `cancel!` or `quit!`")?;
                } else {
                    return Ok(Flow::Quit);
                }
            }
            "quit!" => return Ok(Flow::Quit),
            "refresh" => {
                self.session.refresh().await;
                let known: Vec<Uuid> =
                    self.session.store.tasks().iter().map(|task| task.id).collect();
                self.selection.prune_selection(&known);
                writeln!(out, "{} tasks loaded", known.len())?;
            }
            "list" | "ls" => self.print_list(out)?,
            "search" => {
                self.view.search = rest.to_string();
                self.print_list(out)?;
            }
            "category" => {
                if rest.is_empty() {
                    self.view.category = None;
                } else {
                    match self.session.store.resolve_category(rest) {
                        Ok(category) => self.view.category = Some(category.id.clone()),
                        Err(err) => {
                            writeln!(out, "{}", store_error(err).display_line())?;
                            return Ok(Flow::Continue);
                        }
                    }
                }
                self.print_list(out)?;
            }
            "menu" => self.open_menu(rest, out)?,
            "close" => self.selection.close_menu(),
            "select" => {
                if rest.is_empty() {
                    match self.selection.select_from_menu() {
                        Some(id) => writeln!(out, "selected {}", self.label(id))?,
                        None => writeln!(out, "no menu open")?,
                    }
                } else if let Some(id) = self.reference(rest, out)? {
                    let selected = self.selection.toggle_selected(id);
                    let verb = if selected { "selected" } else { "unselected" };
                    writeln!(out, "{verb} {}", self.label(id))?;
                }
            }
            "clear" => {
                self.selection.clear_selection();
                writeln!(out, "selection cleared")?;
            }
            "pin" => {
                if let Some(id) = self.target(rest, out)? {
                    match self.session.store.toggle_pinned(id) {
                        Ok(true) => writeln!(out, "pinned {}", self.label(id))?,
                        Ok(false) => writeln!(out, "unpinned {}", self.label(id))?,
                        Err(err) => writeln!(out, "{}", store_error(err).display_line())?,
                    }
                }
            }
            "done" => {
                if let Some(id) = self.target(rest, out)? {
                    match self.session.store.toggle_done(id).await {
                        Ok(task) if task.done => writeln!(out, "completed {}", task.name)?,
                        Ok(task) => writeln!(out, "reopened {}", task.name)?,
                        Err(err) => writeln!(out, "{}", store_error(err).display_line())?,
                    }
                }
            }
            "edit" => {
                if self.selection.should_warn_before_leave() {
                    writeln!(out, "finish the current edit first: `save` or `cancel!`")?;
                } else if let Some(id) = self.target(rest, out)? {
                    if let Some(task) = self.session.store.task(id).cloned() {
                        self.selection.open_edit(&task);
                        writeln!(out, "editing {}; use `set`, then `save` or `cancel`", task.name)?;
                    }
                }
            }
            "set" => self.set_field(rest, out)?,
            "save" => match self.selection.save_edit(&mut self.session.store).await {
                Ok(Some(task)) => writeln!(out, "saved {}", task.name)?,
                Ok(None) => writeln!(out, "nothing to save")?,
                Err(err) => writeln!(out, "{}", store_error(err).display_line())?,
            },
            "cancel" => {
                if self.selection.should_warn_before_leave() {
                    writeln!(out, "unsaved changes; `cancel!` discards them")?;
                } else {
                    self.selection.cancel_edit();
                }
            }
            "cancel!" => {
                self.selection.cancel_edit();
                writeln!(out, "changes discarded")?;
            }
            "delete" => self.request_delete(rest, out)?,
            "yes" => match self.selection.confirm_delete(&mut self.session.store).await {
                Some(outcome) => self.report("deleted", &outcome, out)?,
                None => writeln!(out, "nothing to confirm")?,
            },
            "no" => {
                self.selection.cancel_delete();
                writeln!(out, "kept")?;
            }
            "complete" => {
                let ids = self.selection.selected().to_vec();
                if ids.is_empty() {
                    writeln!(out, "nothing selected")?;
                } else {
                    let outcome = self.session.store.mark_many_done(&ids).await;
                    self.selection.clear_selection();
                    self.report("completed", &outcome, out)?;
                }
            }
            "summary" => {
                let summary = Summary::compute(self.session.store.tasks(), self.session.today());
                writeln!(out, "{}", render_summary_text(&summary))?;
            }
            other => writeln!(out, "unknown command '{other}'; type `help`")?,
        }
        Ok(Flow::Continue)
    }

    fn print_list<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let today = self.session.today();
        let projected = project(self.session.store.tasks(), &self.view);
        self.listed = projected.iter().map(|task| task.id).collect();

        if projected.is_empty() {
            if self.view.is_filtering() {
                writeln!(out, "No tasks match the current filters.")?;
            } else {
                writeln!(out, "No tasks found.")?;
            }
            return Ok(());
        }
        let chip_view = self.view.clone().with_category(None);
        let counts = category_counts(self.session.store.tasks(), &chip_view);
        if let Some(chips) = render_category_chips(&counts) {
            writeln!(out, "{chips}")?;
        }
        for (index, task) in projected.iter().enumerate() {
            let mark = if self.selection.is_selected(task.id) { "[x]" } else { "[ ]" };
            let mut flags = Vec::new();
            if task.pinned {
                flags.push("pinned".to_string());
            }
            if task.done {
                flags.push("done".to_string());
            } else if let Some(deadline) = task.deadline {
                flags.push(deadline_status(deadline, today));
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            writeln!(
                out,
                "{:>3}. {mark} {} {}{flags}",
                index + 1,
                task.short_id(),
                task.name
            )?;
        }
        Ok(())
    }

    fn open_menu<W: Write>(&mut self, rest: &str, out: &mut W) -> anyhow::Result<()> {
        let mut parts = rest.split_whitespace();
        let Some(reference) = parts.next() else {
            writeln!(out, "usage: menu REF [X Y]")?;
            return Ok(());
        };
        let Some(id) = self.reference(reference, out)? else {
            return Ok(());
        };

        let anchor = match (
            parts.next().map(str::parse::<i32>),
            parts.next().map(str::parse::<i32>),
        ) {
            (Some(Ok(x)), Some(Ok(y))) => MenuAnchor::Point { x, y },
            _ => MenuAnchor::Element(reference.to_string()),
        };
        self.selection.open_menu(id, anchor);
        writeln!(
            out,
            "menu for {}: select | edit | pin | done | delete | close",
            self.label(id)
        )?;
        Ok(())
    }

    fn set_field<W: Write>(&mut self, rest: &str, out: &mut W) -> anyhow::Result<()> {
        let (field, value) = match rest.split_once(char::is_whitespace) {
            Some((field, value)) => (field, value.trim()),
            None => (rest, ""),
        };
        let Some(draft) = self.selection.edit_draft_mut() else {
            writeln!(out, "no edit open; use `edit REF`")?;
            return Ok(());
        };

        match field {
            "name" => draft.name = value.to_string(),
            "description" => {
                draft.description = (!value.is_empty() && value != "-").then(|| value.to_string());
            }
            "deadline" => {
                if value.is_empty() || value == "none" {
                    draft.deadline = None;
                } else {
                    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                        Ok(deadline) => draft.deadline = Some(deadline),
                        Err(_) => {
                            writeln!(out, "deadline must look like YYYY-MM-DD")?;
                            return Ok(());
                        }
                    }
                }
            }
            "color" if is_hex_color(value) => draft.color = value.to_string(),
            "color" => {
                writeln!(out, "color must be a hex value like #88c9f2")?;
                return Ok(());
            }
            _ => {
                writeln!(out, "fields: name, description, deadline, color")?;
                return Ok(());
            }
        }
        writeln!(out, "{field} updated (unsaved)")?;
        Ok(())
    }

    fn request_delete<W: Write>(&mut self, rest: &str, out: &mut W) -> anyhow::Result<()> {
        if !rest.is_empty() {
            let Some(id) = self.reference(rest, out)? else {
                return Ok(());
            };
            self.selection
                .open_menu(id, MenuAnchor::Element(rest.to_string()));
        }

        if self.selection.menu().is_some() {
            self.selection.request_delete();
        } else if !self.selection.request_bulk_delete() {
            writeln!(out, "nothing to delete; pass a task or select some first")?;
            return Ok(());
        }

        match self.selection.pending_delete() {
            Some(DeleteTarget::Single(id)) => {
                if let Some(task) = self.session.store.task(*id) {
                    writeln!(out, "{}", render_delete_prompt(task))?;
                }
            }
            Some(DeleteTarget::Bulk(ids)) => {
                writeln!(out, "Delete {} selected tasks?", ids.len())?;
            }
            None => return Ok(()),
        }
        writeln!(out, "answer `yes` or `no`")?;
        Ok(())
    }

    fn report<W: Write>(
        &self,
        verb: &str,
        outcome: &BulkOutcome,
        out: &mut W,
    ) -> anyhow::Result<()> {
        writeln!(out, "{verb} {} tasks", outcome.succeeded.len())?;
        for (id, err) in &outcome.failed {
            writeln!(out, "  {id}: {}", err)?;
        }
        Ok(())
    }

    /// Explicit reference, or the task under the open menu.
    fn target<W: Write>(&mut self, rest: &str, out: &mut W) -> anyhow::Result<Option<Uuid>> {
        if !rest.is_empty() {
            return self.reference(rest, out);
        }
        match self.selection.menu().map(|menu| menu.task_id) {
            Some(id) => {
                self.selection.close_menu();
                Ok(Some(id))
            }
            None => {
                writeln!(out, "pass a task or open its menu first")?;
                Ok(None)
            }
        }
    }

    /// A list number from the last `list`, or a task id prefix.
    fn reference<W: Write>(&self, raw: &str, out: &mut W) -> anyhow::Result<Option<Uuid>> {
        if let Ok(number) = raw.parse::<usize>() {
            if let Some(id) = number.checked_sub(1).and_then(|index| self.listed.get(index)) {
                return Ok(Some(*id));
            }
        }
        match self.session.store.resolve_task_id(raw) {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                writeln!(out, "{}", store_error(err).display_line())?;
                Ok(None)
            }
        }
    }

    fn label(&self, id: Uuid) -> String {
        self.session
            .store
            .task(id)
            .map(|task| task.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
