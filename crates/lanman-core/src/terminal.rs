// ABOUTME: Terminal emulator profiles: how each terminal wants a working directory and a command.
// ABOUTME: A lookup table of pure argv builders with a generic `-e "cd dir && cmd"` fallback.

use shell_escape::escape;
use std::borrow::Cow;
use std::path::Path;

/// Terminal tried when the configured one is not installed.
pub const FALLBACK_TERMINAL: &str = "x-terminal-emulator";

/// Builds the arguments (after the program name) for a working directory and a shell command.
pub type ArgvBuilder = fn(workdir: &Path, command: &str) -> Vec<String>;

#[derive(Debug, Clone, Copy)]
pub struct TerminalProfile {
    pub id: &'static str,
    build: ArgvBuilder,
}

impl TerminalProfile {
    pub fn args(&self, workdir: &Path, command: &str) -> Vec<String> {
        (self.build)(workdir, command)
    }
}

/// Quote a string for interpolation into a `sh`/`bash` command line.
pub fn shell_quote(value: &str) -> String {
    escape(Cow::Borrowed(value)).into_owned()
}

pub fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

fn cd_and_run(workdir: &Path, command: &str) -> String {
    format!("cd {} && {}", quote_path(workdir), command)
}

fn dir(workdir: &Path) -> String {
    workdir.display().to_string()
}

fn strings<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn konsole(workdir: &Path, command: &str) -> Vec<String> {
    strings(["--new-tab", "--workdir", &dir(workdir), "-e", "bash", "-c", command])
}

fn gnome_terminal(workdir: &Path, command: &str) -> Vec<String> {
    strings(["--working-directory", &dir(workdir), "--", "bash", "-c", command])
}

fn xterm(workdir: &Path, command: &str) -> Vec<String> {
    strings(["-e", &cd_and_run(workdir, command)])
}

fn kitty(workdir: &Path, command: &str) -> Vec<String> {
    strings(["--directory", &dir(workdir), "bash", "-c", command])
}

fn alacritty(workdir: &Path, command: &str) -> Vec<String> {
    strings(["--working-directory", &dir(workdir), "-e", "bash", "-c", command])
}

fn wezterm(workdir: &Path, command: &str) -> Vec<String> {
    strings(["start", "--cwd", &dir(workdir), "--", "bash", "-c", command])
}

fn foot(workdir: &Path, command: &str) -> Vec<String> {
    strings(["--working-directory", &dir(workdir), "bash", "-c", command])
}

fn debian_alternative(workdir: &Path, command: &str) -> Vec<String> {
    strings(["-e", "bash", "-c", &cd_and_run(workdir, command)])
}

/// Used for any terminal not in the table.
fn generic(workdir: &Path, command: &str) -> Vec<String> {
    strings(["-e", &cd_and_run(workdir, command)])
}

const PROFILES: &[TerminalProfile] = &[
    TerminalProfile { id: "konsole", build: konsole },
    TerminalProfile { id: "gnome-terminal", build: gnome_terminal },
    TerminalProfile { id: "xterm", build: xterm },
    TerminalProfile { id: "kitty", build: kitty },
    TerminalProfile { id: "alacritty", build: alacritty },
    TerminalProfile { id: "wezterm", build: wezterm },
    TerminalProfile { id: "foot", build: foot },
    TerminalProfile { id: FALLBACK_TERMINAL, build: debian_alternative },
];

/// Terminals with a dedicated profile.
pub fn known_terminals() -> impl Iterator<Item = &'static str> {
    PROFILES.iter().map(|p| p.id)
}

/// Profile for `terminal`, or `None` if it will use the generic fallback.
pub fn profile(terminal: &str) -> Option<&'static TerminalProfile> {
    PROFILES.iter().find(|p| p.id == terminal)
}

/// Full argv (program first) for running `command` in `workdir` inside `terminal`.
///
/// `terminal` may be a path; the profile is picked by its file name.
pub fn argv(terminal: &str, workdir: &Path, command: &str) -> Vec<String> {
    let name = Path::new(terminal)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| terminal.to_string());
    let args = match profile(&name) {
        Some(p) => p.args(workdir, command),
        None => generic(workdir, command),
    };
    std::iter::once(terminal.to_string()).chain(args).collect()
}
