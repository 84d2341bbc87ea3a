//! Interactive target selection

use crate::core::error::{RailError, RailResult};
use crate::graph::TargetChooser;
use dialoguer::Select;
use std::io::IsTerminal;

/// Prompts on the terminal with an arrow-key list.
pub struct PromptChooser {
  prompt: String,
}

impl PromptChooser {
  pub fn new(prompt: impl Into<String>) -> Self {
    Self { prompt: prompt.into() }
  }
}

impl TargetChooser for PromptChooser {
  fn choose(&self, candidates: &[String]) -> RailResult<String> {
    if !std::io::stdin().is_terminal() {
      return Err(RailError::with_help(
        "No target given and stdin is not a terminal",
        format!("Pass one of: {}", candidates.join(", ")),
      ));
    }

    let index = Select::new()
      .with_prompt(&self.prompt)
      .items(candidates)
      .default(0)
      .interact()
      .map_err(|e| RailError::message(format!("Selection cancelled: {}", e)))?;

    Ok(candidates[index].clone())
  }
}
