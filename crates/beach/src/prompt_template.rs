use chrono::NaiveDate;
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::catalog::{BeachInfo, BEACHES};

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// What the system prompt says about a tool system
#[derive(Clone, Debug, Serialize)]
pub struct SystemInfo {
    pub name: String,
    pub description: String,
    pub instructions: String,
}

impl SystemInfo {
    pub fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[derive(Serialize)]
struct SystemPromptContext<'a> {
    today: String,
    beaches: &'a [BeachInfo],
    systems: &'a [SystemInfo],
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render("inline_template", &context)
}

/// Render the assistant's system prompt, listing the catalog beaches and the
/// tool systems available to the model.
pub fn system_prompt(today: NaiveDate, systems: &[SystemInfo]) -> Result<String, TeraError> {
    let context = SystemPromptContext {
        today: today.format("%A, %B %-d, %Y").to_string(),
        beaches: BEACHES,
        systems,
    };
    load_prompt(SYSTEM_TEMPLATE, &context).map(|prompt| prompt.trim().to_string())
}
