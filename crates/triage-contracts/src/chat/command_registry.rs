#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one free-form argument.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "profile",
        action: "set_profile",
    },
    CommandSpec {
        command: "lookup",
        action: "lookup",
    },
    CommandSpec {
        command: "open",
        action: "open_history",
    },
    CommandSpec {
        command: "report",
        action: "report",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "voice",
    action: "attach_audio",
}];

pub(crate) const MULTI_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "attach",
    action: "attach",
}];

/// Commands taking a 1-based position.
pub(crate) const INDEX_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "detach",
        action: "detach",
    },
    CommandSpec {
        command: "followup",
        action: "follow_up",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "analyze",
        action: "analyze",
    },
    CommandSpec {
        command: "topics",
        action: "topics",
    },
    CommandSpec {
        command: "profiles",
        action: "profiles",
    },
    CommandSpec {
        command: "history",
        action: "history",
    },
    CommandSpec {
        command: "clear_history",
        action: "clear_history",
    },
    CommandSpec {
        command: "unvoice",
        action: "clear_audio",
    },
    CommandSpec {
        command: "elder",
        action: "toggle_elder_mode",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/profile",
    "/profiles",
    "/attach",
    "/detach",
    "/voice",
    "/unvoice",
    "/analyze",
    "/followup",
    "/report",
    "/lookup",
    "/topics",
    "/history",
    "/open",
    "/clear_history",
    "/elder",
    "/reset",
    "/quit",
];
