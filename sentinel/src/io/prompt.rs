//! Prompt rendering for the model-backed planner and workers.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::RetrievedItem;

const PLANNER_TEMPLATE: &str = include_str!("../prompts/planner.md");
const SYNTHESIS_TEMPLATE: &str = include_str!("../prompts/synthesis.md");
const VERIFICATION_TEMPLATE: &str = include_str!("../prompts/verification.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("planner", PLANNER_TEMPLATE)
            .context("load planner template")?;
        env.add_template("synthesis", SYNTHESIS_TEMPLATE)
            .context("load synthesis template")?;
        env.add_template("verification", VERIFICATION_TEMPLATE)
            .context("load verification template")?;
        Ok(Self { env })
    }

    pub fn render_planner(&self, query: &str) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! {
            query => query.trim(),
        })?;
        Ok(rendered)
    }

    /// `critique` is the previous verifier critique when re-synthesizing.
    pub fn render_synthesis(
        &self,
        query: &str,
        instruction: &str,
        sources: &[RetrievedItem],
        critique: Option<&str>,
    ) -> Result<String> {
        let template = self.env.get_template("synthesis")?;
        let rendered = template.render(context! {
            query => query.trim(),
            instruction => Some(instruction.trim()).filter(|s| !s.is_empty()),
            sources => sources_json(sources)?,
            critique => critique.map(str::trim).filter(|s| !s.is_empty()),
        })?;
        Ok(rendered)
    }

    pub fn render_verification(
        &self,
        query: &str,
        draft: &str,
        sources: &[RetrievedItem],
    ) -> Result<String> {
        let template = self.env.get_template("verification")?;
        let rendered = template.render(context! {
            query => query.trim(),
            draft => draft.trim(),
            sources => sources_json(sources)?,
        })?;
        Ok(rendered)
    }
}

fn sources_json(sources: &[RetrievedItem]) -> Result<String> {
    serde_json::to_string_pretty(sources).context("serialize source data")
}
