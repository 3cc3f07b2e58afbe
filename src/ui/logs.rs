use chrono::{DateTime, Utc};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// LogLevel: detected from log line text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static LOG_LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(trace|debug|info|warn(?:ing)?|error)\b"#).unwrap());

/// Detect log level from a line of text.
pub fn detect_log_level(text: &str) -> Option<LogLevel> {
    LOG_LEVEL_RE.find(text).and_then(|m| {
        let s = m.as_str().to_lowercase();
        match s.as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    })
}

// ---------------------------------------------------------------------------
// LogLine: one line of child output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub is_stderr: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl LogLine {
    pub fn from_text(text: String, is_stderr: bool) -> Self {
        let level = detect_log_level(&text);
        Self {
            timestamp: Utc::now(),
            text,
            is_stderr,
            level,
        }
    }
}

// ---------------------------------------------------------------------------
// LogSink: annotated terminal echo plus a JSONL file
// ---------------------------------------------------------------------------

enum JsonlSink {
    /// Logs directory not yet created; holds the target path.
    Pending(std::path::PathBuf),
    Open(std::io::BufWriter<std::fs::File>),
    Disabled,
}

/// Echoes child output to the operator console with a `server |` prefix,
/// mirroring every line into `.devlaunch/logs/current.jsonl`. The file is
/// created lazily on the first line written, so a run that aborts before
/// producing any output leaves no state directory behind.
pub struct LogSink {
    use_color: bool,
    jsonl: JsonlSink,
}

fn format_level(level: &LogLevel, use_color: bool) -> String {
    if !use_color {
        return format!("{:>5} ", level.as_str());
    }
    match level {
        LogLevel::Trace => format!("{} ", level.as_str().dimmed()),
        LogLevel::Debug => format!("{} ", level.as_str().blue()),
        LogLevel::Info => format!("{} ", level.as_str().green()),
        LogLevel::Warn => format!("{} ", level.as_str().yellow()),
        LogLevel::Error => format!("{} ", level.as_str().red()),
    }
}

impl LogSink {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            use_color: std::io::stdout().is_terminal(),
            jsonl: JsonlSink::Pending(state_dir.join("logs")),
        }
    }

    #[cfg(test)]
    pub fn discard() -> Self {
        Self { use_color: false, jsonl: JsonlSink::Disabled }
    }

    fn jsonl_writer(&mut self) -> Option<&mut std::io::BufWriter<std::fs::File>> {
        if let JsonlSink::Pending(dir) = &self.jsonl {
            let opened = std::fs::create_dir_all(dir)
                .and_then(|_| std::fs::File::create(dir.join("current.jsonl")))
                .map(std::io::BufWriter::new);
            self.jsonl = match opened {
                Ok(w) => JsonlSink::Open(w),
                // Unwritable state dir: echo-only from here on.
                Err(_) => JsonlSink::Disabled,
            };
        }
        match &mut self.jsonl {
            JsonlSink::Open(w) => Some(w),
            _ => None,
        }
    }

    pub fn write(&mut self, line: &LogLine) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Some(w) = self.jsonl_writer() {
                let _ = writeln!(w, "{}", json);
                let _ = w.flush();
            }
        }

        let mut buf = String::new();
        if self.use_color {
            buf.push_str(&format!("{} {} ", "server".cyan(), "|".dimmed()));
        } else {
            buf.push_str("server | ");
        }
        if let Some(ref level) = line.level {
            buf.push_str(&format_level(level, self.use_color));
        }
        if self.use_color && line.is_stderr {
            buf.push_str(&format!("{}", line.text.red()));
        } else {
            buf.push_str(&line.text);
        }
        println!("{}", buf);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
