//! Teacher-label cache and fine-tuning training file.
//!
//! Phase 1 output is cached to an append-only JSONL file so an interrupted
//! run resumes from where it left off.  Once every item is labelled, the
//! cache is converted into the chat-format training file the fine-tuning
//! API expects (one `{"messages": […]}` object per line).

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One teacher-labelled example in the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Work-item identity key, used to skip already-labelled items on resume.
    pub key: String,
    /// The rendered prompt that was sent to the teacher.
    pub input: String,
    /// The teacher's predicted label.
    pub label: String,
}

/// Load previously completed records from `path`.  Missing file means an
/// empty cache.
pub fn load_label_cache(path: &Path) -> Result<Vec<LabeledExample>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;

    let mut examples = Vec::new();
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let example: LabeledExample = serde_json::from_str(trimmed)
            .with_context(|| format!("Parse error at {}:{}", path.display(), i + 1))?;
        examples.push(example);
    }
    Ok(examples)
}

/// Append records to the cache, flushing so progress survives crashes.
pub fn append_label_cache(path: &Path, examples: &[LabeledExample]) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open {} for appending", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    for example in examples {
        let line = serde_json::to_string(example)?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

// ── Training file ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainingMessage {
    role: String,
    content: String,
}

/// One fine-tuning example in the chat-messages format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRecord {
    messages: Vec<TrainingMessage>,
}

impl TrainingRecord {
    pub fn new(system: &str, user: &str, assistant: &str) -> Self {
        Self {
            messages: vec![
                TrainingMessage { role: "system".into(), content: system.into() },
                TrainingMessage { role: "user".into(), content: user.into() },
                TrainingMessage { role: "assistant".into(), content: assistant.into() },
            ],
        }
    }
}

/// Write the chat-format training file for the fine-tuning API.
///
/// Returns the number of records written.
pub fn write_training_file(
    path: &Path,
    examples: &[LabeledExample],
    system_prompt: &str,
) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    for example in examples {
        let record = TrainingRecord::new(system_prompt, &example.input, &example.label);
        let line = serde_json::to_string(&record)?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(examples.len())
}
