//! Interactive front end: each line is parsed into an intent, turned into a
//! reducer action, and the resulting state is printed.

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;
use triage_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use triage_contracts::report::write_report;
use triage_contracts::state::{reduce, Action, AppState, MediaCompletion, Tab};
use triage_contracts::{MediaAttachment, COMMON_CONDITIONS};
use triage_engine::TriageEngine;

use crate::render::{
    lookup_failure_message, render_analysis, render_condition, render_history, render_profiles,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

type Confirm<'a> = Box<dyn FnMut(&str) -> Result<bool> + 'a>;

pub(crate) struct ChatSession<'a> {
    engine: &'a TriageEngine,
    state: AppState,
    confirm: Confirm<'a>,
    report_dir: PathBuf,
}

impl<'a> ChatSession<'a> {
    pub(crate) fn new(
        engine: &'a TriageEngine,
        profile_id: String,
        confirm: Confirm<'a>,
        report_dir: PathBuf,
    ) -> Self {
        Self {
            engine,
            state: AppState::new(profile_id),
            confirm,
            report_dir,
        }
    }

    pub(crate) fn state(&self) -> &AppState {
        &self.state
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::replace(&mut self.state, AppState::new(String::new()));
        self.state = reduce(state, action);
    }

    pub(crate) fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let intent = parse_intent(line);
        match intent.action.as_str() {
            "noop" => {}
            "help" => writeln!(out, "Commands: {}", CHAT_HELP_COMMANDS.join(" "))?,
            "quit" => return Ok(Flow::Quit),
            "set_profile" => self.set_profile(&intent, out)?,
            "profiles" => writeln!(
                out,
                "{}",
                render_profiles(self.engine.profiles(), &self.state.active_profile)
            )?,
            "attach" => self.attach(&intent, out)?,
            "attach_audio" => self.attach_audio(&intent, out)?,
            "clear_audio" => {
                self.dispatch(Action::ClearAudio);
                writeln!(out, "Voice note removed.")?;
            }
            "detach" => match index_arg(&intent) {
                Some(index) if index <= self.state.attachments.len() => {
                    let name = self.state.attachments[index - 1].name().to_string();
                    self.dispatch(Action::RemoveAttachment(index - 1));
                    writeln!(out, "Removed {name}.")?;
                }
                _ => writeln!(out, "/detach requires an attachment number")?,
            },
            "analyze" => {
                if let Some(text) = intent.text.as_deref() {
                    self.dispatch(Action::SetInputText(text.to_string()));
                }
                self.submit(out)?;
            }
            "follow_up" => {
                let question = index_arg(&intent).and_then(|index| {
                    self.state
                        .result
                        .as_ref()
                        .and_then(|result| result.follow_up_questions().get(index - 1).cloned())
                });
                match question {
                    Some(question) => {
                        writeln!(out, "Input set to: {question}")?;
                        writeln!(out, "Add detail or /analyze to submit.")?;
                        self.dispatch(Action::FollowUp(question));
                    }
                    None => writeln!(out, "/followup requires a listed question number")?,
                }
            }
            "lookup" => self.lookup(&intent, out)?,
            "topics" => {
                self.dispatch(Action::SelectTab(Tab::Knowledge));
                for topic in COMMON_CONDITIONS {
                    writeln!(out, "  {topic}")?;
                }
            }
            "history" => {
                self.dispatch(Action::SelectTab(Tab::History));
                let items = self.engine.history().list_for(&self.state.active_profile);
                writeln!(out, "{}", render_history(&items))?;
            }
            "open_history" => self.open_history(&intent, out)?,
            "clear_history" => self.clear_history(out)?,
            "report" => self.report(&intent, out)?,
            "toggle_elder_mode" => {
                self.dispatch(Action::ToggleElderMode);
                let label = if self.state.elder_mode { "on" } else { "off" };
                writeln!(out, "Elder mode {label}.")?;
            }
            "reset" => {
                self.dispatch(Action::Reset);
                writeln!(out, "Cleared.")?;
            }
            _ => {
                let command = intent
                    .command_args
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                writeln!(out, "Unknown command /{command}. Type /help.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn set_profile(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let requested = intent.arg_str("profile").unwrap_or_default();
        let found = self.engine.profiles().list().find(|profile| {
            profile.id == requested || profile.display_name.eq_ignore_ascii_case(requested)
        });
        match found {
            Some(profile) => {
                let (id, name) = (profile.id.clone(), profile.display_name.clone());
                self.dispatch(Action::SelectProfile(id));
                writeln!(out, "Profile set to {name}.")?;
            }
            None => writeln!(out, "Unknown profile '{requested}'. Try /profiles.")?,
        }
        Ok(())
    }

    fn attach(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let paths: Vec<String> = intent
            .command_args
            .get("paths")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if paths.is_empty() {
            writeln!(out, "/attach requires one or more paths")?;
            return Ok(());
        }
        for path in paths {
            let completion = read_media(Path::new(&path));
            if let MediaCompletion::Failed(message) = &completion {
                writeln!(out, "{message}")?;
            } else {
                writeln!(out, "Attached {path}.")?;
            }
            let epoch = self.state.epoch;
            self.dispatch(Action::MediaCompleted { epoch, completion });
        }
        Ok(())
    }

    fn attach_audio(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let Some(path) = intent.arg_str("path") else {
            writeln!(out, "/voice requires a path")?;
            return Ok(());
        };
        let completion = read_media(Path::new(path));
        match &completion {
            MediaCompletion::Failed(message) => writeln!(out, "{message}")?,
            MediaCompletion::Loaded(_) => writeln!(out, "Voice note attached.")?,
        }
        let epoch = self.state.epoch;
        self.dispatch(Action::AudioCompleted { epoch, completion });
        Ok(())
    }

    fn submit(&mut self, out: &mut dyn Write) -> Result<()> {
        self.dispatch(Action::SubmitAnalysis);
        let Some(pending) = self.state.in_flight.clone() else {
            if let Some(message) = self.state.error.as_deref() {
                writeln!(out, "{message}")?;
            }
            return Ok(());
        };
        writeln!(out, "Analyzing...")?;
        let request = self.state.pending_request();
        let action = match self.engine.analyze(&pending.profile_id, &request) {
            Ok(result) => Action::AnalysisSucceeded {
                request_seq: pending.request_seq,
                result: Box::new(result),
            },
            Err(err) => Action::AnalysisFailed {
                request_seq: pending.request_seq,
                message: err.user_message(),
            },
        };
        self.dispatch(action);
        self.print_outcome(out)
    }

    fn print_outcome(&self, out: &mut dyn Write) -> Result<()> {
        if let Some(result) = self.state.result.as_ref() {
            writeln!(out, "{}", render_analysis(result, self.state.elder_mode))?;
        } else if let Some(message) = self.state.error.as_deref() {
            writeln!(out, "{message}")?;
        }
        Ok(())
    }

    fn lookup(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        self.dispatch(Action::SelectTab(Tab::Knowledge));
        let Some(name) = intent.arg_str("condition") else {
            writeln!(out, "/lookup requires a condition name")?;
            return Ok(());
        };
        match self.engine.lookup(name) {
            Ok(details) => writeln!(out, "{}", render_condition(&details))?,
            Err(err) => writeln!(out, "{}", lookup_failure_message(&err))?,
        }
        Ok(())
    }

    fn open_history(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let item = intent
            .arg_str("id")
            .and_then(|id| self.engine.history().get(id));
        match item {
            Some(item) => {
                self.dispatch(Action::LoadFromHistory(Box::new(item)));
                self.print_outcome(out)?;
            }
            None => writeln!(out, "/open requires a history id (see /history)")?,
        }
        Ok(())
    }

    fn clear_history(&mut self, out: &mut dyn Write) -> Result<()> {
        let profile_id = self.state.active_profile.clone();
        let name = self
            .engine
            .profiles()
            .get(&profile_id)
            .map(|profile| profile.display_name.clone())
            .unwrap_or_else(|| profile_id.clone());
        match (self.confirm)(&format!("Clear all history for {name}?")) {
            Ok(true) => {}
            Ok(false) => {
                writeln!(out, "Cancelled.")?;
                return Ok(());
            }
            Err(err) => {
                writeln!(out, "Could not read confirmation: {err:#}")?;
                return Ok(());
            }
        }
        match self.engine.clear_history(&profile_id) {
            Ok(removed) => writeln!(out, "Removed {removed} item(s).")?,
            Err(err) => writeln!(out, "Could not clear history: {err:#}")?,
        }
        Ok(())
    }

    fn report(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let Some(result) = self.state.result.as_ref() else {
            writeln!(out, "No result to export yet.")?;
            return Ok(());
        };
        let path = intent
            .arg_str("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| crate::default_report_path(&self.report_dir));
        // Export failures are reported inline; the session keeps its result.
        match write_report(&path, result, chrono::Utc::now()) {
            Ok(()) => writeln!(out, "Report written to {}", path.display())?,
            Err(err) => writeln!(out, "Could not write {}: {err:#}", path.display())?,
        }
        Ok(())
    }
}

fn index_arg(intent: &Intent) -> Option<usize> {
    intent
        .command_args
        .get("index")
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
        .filter(|value| *value > 0)
}

fn read_media(path: &Path) -> MediaCompletion {
    match MediaAttachment::from_path(path) {
        Ok(attachment) => MediaCompletion::Loaded(attachment),
        Err(err) => MediaCompletion::Failed(format!("Could not read {}: {err:#}", path.display())),
    }
}

pub(crate) fn run_chat(engine: &TriageEngine, profile_id: String) -> Result<()> {
    let mut session = ChatSession::new(
        engine,
        profile_id,
        Box::new(|question: &str| crate::confirm(question)),
        std::env::current_dir()?,
    );
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    writeln!(
        stdout,
        "Triage chat started ({} / {}). Describe symptoms or type /help.",
        engine.gateway_name(),
        engine.model()
    )?;
    loop {
        let loading = if session.state().is_loading() { "*" } else { "" };
        write!(stdout, "[{}]{loading}> ", session.state().active_profile)?;
        stdout.flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }
        let input = line.trim_end_matches(['\n', '\r']);
        if session.handle_line(input, &mut stdout)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
