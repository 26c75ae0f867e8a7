//! Rustyline-based REPL editor with history and slash-command completion.

use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper, Highlighter, Validator};

/// Slash commands available in the REPL.
const SLASH_COMMANDS: &[&str] = &["/help", "/clear", "/plan", "/skills", "/tools"];

/// Events returned by the REPL editor.
pub(crate) enum ReadlineEvent {
    /// A complete line of input.
    Line(String),
    /// The user pressed Ctrl+C, cancelling current input.
    Interrupted,
    /// The user pressed Ctrl+D, signalling end-of-input.
    Eof,
}

/// Helper that provides slash-command completion and history hints.
#[derive(Helper, Validator, Highlighter)]
struct ReplHelper {
    hinter: HistoryHinter,
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let word_start = prefix.rfind(char::is_whitespace).map_or(0, |i| i + 1);
        let word = &prefix[word_start..];

        if !word.starts_with('/') {
            return Ok((pos, Vec::new()));
        }

        let matches: Vec<Pair> = SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(word))
            .map(|cmd| Pair {
                display: (*cmd).to_string(),
                replacement: (*cmd).to_string(),
            })
            .collect();

        Ok((word_start, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

/// Rustyline-based REPL editor with command history and tab completion.
pub(crate) struct ReplEditor {
    editor: Editor<ReplHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl ReplEditor {
    /// Create a new REPL editor, loading history from `history_path`
    /// (creating the file if it does not yet exist).
    pub(crate) fn new(history_path: PathBuf) -> anyhow::Result<Self> {
        if !history_path.exists() {
            std::fs::write(&history_path, "")?;
        }

        let config = Config::builder()
            .history_ignore_dups(true)?
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .auto_add_history(true)
            .build();

        let helper = ReplHelper {
            hinter: HistoryHinter::new(),
        };

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(helper));
        let _ = editor.load_history(&history_path);

        Ok(Self { editor, history_path })
    }

    /// Read a line of input from the user.
    pub(crate) fn readline(&mut self) -> ReadlineEvent {
        match self.editor.readline("\x1b[1;32m> \x1b[0m") {
            Ok(line) => {
                let _ = self.editor.save_history(&self.history_path);
                ReadlineEvent::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadlineEvent::Interrupted,
            Err(ReadlineError::Eof | _) => ReadlineEvent::Eof,
        }
    }
}
