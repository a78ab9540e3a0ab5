//! Line-oriented console over a [`UsersSession`].
//!
//! Mutations run as background tasks so the table stays usable (and the
//! pending indicator visible) while the remote is answering.

use anyhow::Result;
use std::fmt::Write as _;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

use users_admin::contract::model::{User, UserId};
use users_admin::domain::{
    CacheStatus, EditorState, ErrorSurface, Field, MutationKind, Projection, RecordEditor,
    Submission, SyncError, TableView,
};
use users_admin::UsersSession;

pub const HELP: &str = "\
Commands:
  list                 show the current page (refetches when stale)
  search <term>        filter by name
  clear                clear the search
  page <n>             go to page n
  size <n>             set rows per page
  refresh              refetch from the server
  status               show cache and pending state
  add                  open the add dialog
  edit <id>            open the edit dialog
  set <field> <value>  set name, email or company in the open dialog
  save                 submit the open dialog
  cancel               close the dialog
  delete <id>          ask to delete a user
  confirm              confirm the delete
  help                 show this help
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Search(String),
    Clear,
    Page(usize),
    Size(usize),
    Refresh,
    Status,
    Add,
    Edit(UserId),
    Set(Field, String),
    Save,
    Cancel,
    Delete(UserId),
    Confirm,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };

        let number = |what: &str| -> Result<u64, String> {
            rest.parse::<u64>()
                .map_err(|_| format!("Usage: {word} <{what}>"))
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "search" if !rest.is_empty() => Command::Search(rest.to_string()),
            "search" => return Err("Usage: search <term>".to_string()),
            "clear" => Command::Clear,
            "page" => match number("n")? {
                0 => return Err("Pages start at 1".to_string()),
                n => Command::Page(n as usize),
            },
            "size" => Command::Size(number("n")? as usize),
            "refresh" => Command::Refresh,
            "status" => Command::Status,
            "add" => Command::Add,
            "edit" => Command::Edit(UserId(number("id")?)),
            "set" => {
                let (field, value) = rest
                    .split_once(char::is_whitespace)
                    .map(|(f, v)| (f, v.trim()))
                    .unwrap_or((rest, ""));
                let field = Field::parse(field)
                    .ok_or_else(|| "Usage: set <name|email|company> <value>".to_string())?;
                Command::Set(field, value.to_string())
            }
            "save" => Command::Save,
            "cancel" => Command::Cancel,
            "delete" | "rm" => Command::Delete(UserId(number("id")?)),
            "confirm" | "yes" => Command::Confirm,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{other}', try 'help'")),
        };
        Ok(cmd)
    }
}

struct Outcome {
    kind: MutationKind,
    result: Result<User, SyncError>,
}

pub struct Shell {
    session: Arc<UsersSession>,
    editor: RecordEditor,
    in_flight: usize,
}

impl Shell {
    pub fn new(session: Arc<UsersSession>) -> Self {
        Self {
            session,
            editor: RecordEditor::new(),
            in_flight: 0,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let (tx, mut outcomes) = mpsc::unbounded_channel::<Outcome>();
        let mut lines = spawn_stdin_reader();

        println!("Type 'help' for commands.");
        if let Err(e) = self.session.ensure_fresh().await {
            self.report(&e);
        }
        self.render_table();

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(cmd) => {
                            if let Some(submission) = self.execute(cmd).await {
                                self.spawn_mutation(submission, &tx);
                            }
                        }
                        Err(msg) => println!("{msg}"),
                    }
                }
                Some(outcome) = outcomes.recv() => self.finish(outcome),
            }
        }

        // Let in-flight mutations land before exiting
        while self.in_flight > 0 {
            match outcomes.recv().await {
                Some(outcome) => self.finish(outcome),
                None => break,
            }
        }
        tracing::info!("Session closed");
        Ok(())
    }

    /// Run one command; a validated submission is handed back for dispatch.
    async fn execute(&mut self, cmd: Command) -> Option<Submission> {
        match cmd {
            Command::List => {
                if let Err(e) = self.session.ensure_fresh().await {
                    self.report(&e);
                }
                self.render_table();
            }
            Command::Search(term) => {
                self.session.set_search(term);
                self.render_table();
            }
            Command::Clear => {
                self.session.clear_search();
                self.render_table();
            }
            Command::Page(n) => {
                let pages = self
                    .session
                    .view()
                    .page_count(self.session.project().total_matches);
                if n > pages.max(1) {
                    println!("There are only {} page(s)", pages.max(1));
                } else {
                    self.session.set_page(n - 1);
                }
                self.render_table();
            }
            Command::Size(n) => {
                if !self.session.set_page_size(n) {
                    println!(
                        "Rows per page must be one of {:?}",
                        self.session.view().page_size_options()
                    );
                }
                self.render_table();
            }
            Command::Refresh => {
                match self.session.refresh().await {
                    Ok(count) => println!("Loaded {count} users"),
                    Err(e) => self.report(&e),
                }
                self.render_table();
            }
            Command::Status => self.print_status(),
            Command::Add => {
                if let Err(e) = self.editor.open(None) {
                    self.report(&e);
                }
                self.render_editor();
            }
            Command::Edit(id) => match self.session.cache().get(id) {
                Some(user) => {
                    if let Err(e) = self.editor.open(Some(&user)) {
                        self.report(&e);
                    }
                    self.render_editor();
                }
                None => println!("No user with id {id}"),
            },
            Command::Set(field, value) => {
                if let Err(e) = self.editor.change_field(field, value) {
                    self.report(&e);
                }
                self.render_editor();
            }
            Command::Save => match self.editor.submit() {
                Ok(submission) => return Some(submission),
                Err(e) => {
                    self.report(&e);
                    self.render_editor();
                }
            },
            Command::Cancel => {
                self.editor.cancel();
                println!("Dialog closed");
            }
            Command::Delete(id) => match self.session.cache().get(id) {
                Some(user) => match self.editor.request_delete(&user) {
                    Ok(()) => self.render_editor(),
                    Err(e) => self.report(&e),
                },
                None => println!("No user with id {id}"),
            },
            Command::Confirm => match self.editor.confirm_delete() {
                Ok(submission) => return Some(submission),
                Err(e) => self.report(&e),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        None
    }

    fn spawn_mutation(&mut self, submission: Submission, tx: &mpsc::UnboundedSender<Outcome>) {
        let kind = submission.kind();
        let coordinator = self.session.coordinator().clone();
        let tx = tx.clone();
        self.in_flight += 1;
        println!("{}", kind.progress_label());

        tokio::spawn(async move {
            let result = coordinator.submit(submission).await;
            // The receiver only goes away once the shell has exited
            let _ = tx.send(Outcome { kind, result });
        });
    }

    fn finish(&mut self, outcome: Outcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome.result {
            Ok(user) => {
                let verb = match outcome.kind {
                    MutationKind::Create => "created",
                    MutationKind::Update => "updated",
                    MutationKind::Delete => "deleted",
                };
                println!("User {} {verb} ({})", user.id, user.name);
            }
            Err(e) => self.report(&e),
        }
        self.render_table();
    }

    fn report(&self, err: &SyncError) {
        match err.surface() {
            ErrorSurface::Banner => println!("!! {err}"),
            ErrorSurface::Notification => println!("Error: {err}"),
            // Field errors are shown next to the fields
            ErrorSurface::Inline => {
                if !matches!(err, SyncError::ValidationFailed { .. }) {
                    println!("{err}");
                }
            }
        }
    }

    fn print_status(&self) {
        let cache = self.session.cache();
        let fetched = cache
            .last_fetched_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "Cache: {} ({} users, fetched {fetched})",
            cache.status().as_str(),
            cache.len()
        );
        println!("Dialog: {}", self.editor.state().name());
        match self.session.pending().indicator_label() {
            Some(label) => println!("Pending: {label}"),
            None => println!("Pending: none"),
        }
    }

    fn render_table(&self) {
        let cache = self.session.cache();
        if cache.status() == CacheStatus::Error {
            if let Some(err) = cache.last_error() {
                println!("!! Error loading users: {err}");
            }
        }
        if cache.status() == CacheStatus::Loading {
            println!("Loading users...");
        }
        let view = self.session.view();
        print!("{}", format_table(&self.session.project(), &view));
        if let Some(label) = self.session.pending().indicator_label() {
            println!("{label}");
        }
    }

    fn render_editor(&self) {
        print!("{}", format_editor(&self.editor));
    }
}

/// Stdin is read on a plain thread: a blocked read must not hold up exit.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            }
        }
    });
    rx
}

/// Text table for one projection, with a footer describing the page.
pub fn format_table(projection: &Projection, view: &TableView) -> String {
    let mut out = String::new();
    if projection.rows.is_empty() {
        let _ = writeln!(out, "{}", view.empty_message());
    } else {
        let header = ["ID", "Name", "Email", "Company"];
        let rows: Vec<[String; 4]> = projection
            .rows
            .iter()
            .map(|u| {
                [
                    u.id.to_string(),
                    u.name.clone(),
                    u.email.clone(),
                    u.company_label().to_string(),
                ]
            })
            .collect();

        let mut widths = header.map(str::len);
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: [&str; 4]| {
            cells
                .iter()
                .zip(widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };
        let _ = writeln!(out, "{}", line(header));
        for row in &rows {
            let _ = writeln!(out, "{}", line(row.each_ref().map(String::as_str)));
        }
    }

    let pages = view.page_count(projection.total_matches).max(1);
    let _ = writeln!(
        out,
        "Page {} of {pages} | {} per page | {} matching",
        view.page() + 1,
        view.page_size(),
        projection.total_matches
    );
    out
}

/// Dialog contents with inline field errors.
pub fn format_editor(editor: &RecordEditor) -> String {
    let mut out = String::new();
    match editor.state() {
        EditorState::Closed => {}
        EditorState::ConfirmingDelete { id, name } => {
            let _ = writeln!(out, "[Delete User] {name} (id {id})");
            let _ = writeln!(
                out,
                "{} Type 'confirm' or 'cancel'.",
                editor.confirmation_prompt().unwrap_or_default()
            );
        }
        EditorState::Adding { draft, errors } | EditorState::Editing { draft, errors, .. } => {
            let _ = writeln!(out, "[{}]", editor.title().unwrap_or_default());
            let values = [&draft.name, &draft.email, &draft.company.name];
            for (field, value) in Field::ALL.into_iter().zip(values) {
                let _ = write!(out, "  {:<8} {value}", field.as_str());
                if let Some(msg) = errors.get(field) {
                    let _ = write!(out, "  <- {msg}");
                }
                out.push('\n');
            }
            let _ = writeln!(
                out,
                "Type 'save' to {} or 'cancel'.",
                editor.submit_label().unwrap_or_default().to_lowercase()
            );
        }
    }
    out
}
