//! Application state as a value plus a pure `reduce` function.
//!
//! Two counters guard against late completions. `epoch` changes whenever the
//! input form is reset, so media reads started before the reset are dropped.
//! `request_seq` numbers analysis submissions, and only the completion that
//! matches the outstanding submission is applied.

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::history::HistoryItem;
use crate::media::MediaAttachment;

pub const NO_INPUT_MESSAGE: &str = "Please provide symptoms, an image, or a voice note.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Triage,
    History,
    Knowledge,
}

/// Outcome of one asynchronous file read or recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCompletion {
    Loaded(MediaAttachment),
    Failed(String),
}

/// The analysis currently awaiting a gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub request_seq: u64,
    pub profile_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectTab(Tab),
    SelectProfile(String),
    ToggleElderMode,
    SetInputText(String),
    MediaCompleted {
        epoch: u64,
        completion: MediaCompletion,
    },
    RemoveAttachment(usize),
    AudioCompleted {
        epoch: u64,
        completion: MediaCompletion,
    },
    ClearAudio,
    SubmitAnalysis,
    AnalysisSucceeded {
        request_seq: u64,
        result: Box<AnalysisResult>,
    },
    AnalysisFailed {
        request_seq: u64,
        message: String,
    },
    FollowUp(String),
    LoadFromHistory(Box<HistoryItem>),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub tab: Tab,
    pub active_profile: String,
    pub elder_mode: bool,
    pub input_text: String,
    pub attachments: Vec<MediaAttachment>,
    pub audio: Option<MediaAttachment>,
    pub in_flight: Option<InFlight>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub epoch: u64,
    pub request_seq: u64,
}

impl AppState {
    pub fn new(active_profile: impl Into<String>) -> Self {
        Self {
            tab: Tab::Triage,
            active_profile: active_profile.into(),
            elder_mode: false,
            input_text: String::new(),
            attachments: Vec::new(),
            audio: None,
            in_flight: None,
            result: None,
            error: None,
            epoch: 0,
            request_seq: 0,
        }
    }

    pub fn has_input(&self) -> bool {
        !self.pending_request().is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The request the current form would submit.
    pub fn pending_request(&self) -> AnalysisRequest {
        AnalysisRequest::new(
            Some(self.input_text.clone()),
            self.attachments.clone(),
            self.audio.clone(),
        )
    }

    fn clear_form(&mut self) {
        self.input_text.clear();
        self.attachments.clear();
        self.audio = None;
        self.error = None;
        self.result = None;
        self.in_flight = None;
        self.epoch += 1;
    }
}

pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::SelectTab(tab) => state.tab = tab,
        Action::SelectProfile(profile_id) => {
            if profile_id != state.active_profile {
                // The pending result belongs to the previous profile.
                state.in_flight = None;
                state.active_profile = profile_id;
            }
        }
        Action::ToggleElderMode => state.elder_mode = !state.elder_mode,
        Action::SetInputText(text) => state.input_text = text,
        Action::MediaCompleted { epoch, completion } => {
            if epoch != state.epoch {
                return state;
            }
            match completion {
                MediaCompletion::Loaded(attachment) => state.attachments.push(attachment),
                MediaCompletion::Failed(message) => state.error = Some(message),
            }
        }
        Action::RemoveAttachment(index) => {
            if index < state.attachments.len() {
                state.attachments.remove(index);
            }
        }
        Action::AudioCompleted { epoch, completion } => {
            if epoch != state.epoch {
                return state;
            }
            match completion {
                MediaCompletion::Loaded(attachment) => state.audio = Some(attachment),
                MediaCompletion::Failed(message) => state.error = Some(message),
            }
        }
        Action::ClearAudio => state.audio = None,
        Action::SubmitAnalysis => {
            if state.in_flight.is_some() {
                return state;
            }
            if !state.has_input() {
                state.error = Some(NO_INPUT_MESSAGE.to_string());
                return state;
            }
            state.request_seq += 1;
            state.in_flight = Some(InFlight {
                request_seq: state.request_seq,
                profile_id: state.active_profile.clone(),
            });
            state.error = None;
            state.result = None;
        }
        Action::AnalysisSucceeded {
            request_seq,
            result,
        } => {
            if !is_current(&state, request_seq) {
                return state;
            }
            state.in_flight = None;
            state.result = Some(*result);
        }
        Action::AnalysisFailed {
            request_seq,
            message,
        } => {
            if !is_current(&state, request_seq) {
                return state;
            }
            state.in_flight = None;
            state.error = Some(message);
        }
        Action::FollowUp(question) => {
            state.result = None;
            state.input_text = question;
        }
        Action::LoadFromHistory(item) => {
            state.in_flight = None;
            state.error = None;
            state.result = Some(item.full_result);
            state.tab = Tab::Triage;
        }
        Action::Reset => state.clear_form(),
    }
    state
}

fn is_current(state: &AppState, request_seq: u64) -> bool {
    state
        .in_flight
        .as_ref()
        .map(|pending| pending.request_seq == request_seq)
        .unwrap_or(false)
}
