/// Commands allowed when no list is configured
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "ls", "cat", "head", "tail", "grep", "find", "git", "python", "pip",
];

/// Default command timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Output beyond this many characters per stream is cut
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 20_000;

/// Configuration for `run_command`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Executables that may be run, matched exactly against the command
    pub allowed_commands: Vec<String>,
    /// Wall-clock limit per command
    pub timeout_secs: u64,
    /// Cap on captured stdout and stderr
    pub max_output_chars: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }
}

impl ExecConfig {
    /// Whether `command` may be executed
    ///
    /// Paths are never accepted, so `/tmp/ls` cannot pose as `ls`.
    #[must_use]
    pub fn is_allowed(&self, command: &str) -> bool {
        !command.contains(['/', '\\'])
            && self.allowed_commands.iter().any(|allowed| allowed == command)
    }
}
