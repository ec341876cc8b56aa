use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::EmbeddingProvider;

/// Runs an external program per request: `program [args..] <text>`.
///
/// The program prints either a bare JSON array of numbers, `{"embedding": [...]}`, or an
/// OpenAI-style `{"data": [{"embedding": [...]}]}` document on stdout.
pub struct CommandEmbedder {
    program: String,
    args: Vec<String>,
}

impl CommandEmbedder {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_owned(),
            args: args.to_vec(),
        }
    }

    fn run(&self, text: &str) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .output()
            .with_context(|| format!("failed to spawn embedder {}", self.program))?;

        if output.status.success() {
            String::from_utf8(output.stdout).context("embedder output was not valid UTF-8")
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(anyhow!(
                "embedder {} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ))
        }
    }
}

impl EmbeddingProvider for CommandEmbedder {
    fn name(&self) -> &str {
        &self.program
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let raw = self.run(text)?;
        parse_embedding_output(&raw)
            .with_context(|| format!("failed to parse output of embedder {}", self.program))
    }
}

fn number_array(value: &Value) -> Option<Result<Vec<f32>>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_f64()
                    .map(|number| number as f32)
                    .ok_or_else(|| anyhow!("component {index} is not a number"))
            })
            .collect(),
    )
}

pub(super) fn parse_embedding_output(raw: &str) -> Result<Vec<f32>> {
    let parsed: Value = serde_json::from_str(raw.trim()).context("invalid JSON from embedder")?;

    if let Some(values) = number_array(&parsed) {
        return values;
    }

    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("unexpected JSON type from embedder"))?;

    if let Some(values) = object.get("embedding").and_then(number_array) {
        return values;
    }

    object
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .and_then(|first| first.get("embedding"))
        .and_then(number_array)
        .unwrap_or_else(|| Err(anyhow!("no embedding array found in embedder output")))
}
