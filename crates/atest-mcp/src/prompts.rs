//! MCP Prompts and argument completion
//!
//! # Available Prompts
//!
//! - `create-http-test` - Walk through creating a suite and an HTTP test case
//! - `run-test-suite` - Run every case of a stored suite and summarize

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::{Error, Result};

/// Most completion values returned for a single request
pub const MAX_COMPLETION_VALUES: usize = 100;

/// Prompt argument that completes to stored suite names
pub const SUITE_ARGUMENT: &str = "suite";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetPromptResult {
    pub description: String,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PromptContent {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Values for `completion/complete`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub values: Vec<String>,
    pub total: usize,
    pub has_more: bool,
}

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: description.to_string(),
        required,
    }
}

/// Get all prompt definitions
pub fn get_prompt_definitions() -> Vec<PromptDefinition> {
    vec![
        PromptDefinition {
            name: "create-http-test".to_string(),
            description: "Create a test suite and an HTTP test case for an API".to_string(),
            arguments: vec![
                argument("api", "Base URL of the API under test", true),
                argument("method", "HTTP method of the first case, default GET", false),
            ],
        },
        PromptDefinition {
            name: "run-test-suite".to_string(),
            description: "Run every test case of a suite and summarize the results".to_string(),
            arguments: vec![argument(SUITE_ARGUMENT, "Name of the test suite", true)],
        },
    ]
}

/// Render a prompt
///
/// # Errors
///
/// `Error::UnknownPrompt` for an unknown name, `Error::InvalidArguments` when
/// a required argument is missing or empty.
pub fn get_prompt(name: &str, arguments: &BTreeMap<String, String>) -> Result<GetPromptResult> {
    let definition = get_prompt_definitions()
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::UnknownPrompt(name.to_string()))?;

    for arg in definition.arguments.iter().filter(|a| a.required) {
        if arguments.get(&arg.name).is_none_or(|v| v.trim().is_empty()) {
            return Err(Error::invalid_arguments(
                name,
                format!("missing required argument `{}`", arg.name),
            ));
        }
    }

    let value = |key: &str| arguments.get(key).map(String::as_str).unwrap_or_default();
    let text = match name {
        "create-http-test" => {
            let method = match value("method") {
                "" => "GET".to_string(),
                m => m.to_uppercase(),
            };
            format!(
                "Create an HTTP test for the API at {api}.\n\
                 1. Use `create-test-suite` with a short suite name and api `{api}`.\n\
                 2. Use `create-test-case` to add a {method} case, setting the expected \
                 status code and any headers or body fields worth checking.\n\
                 3. Run it with `run-test-case` and report the result.",
                api = value("api"),
            )
        }
        _ => format!(
            "Run the test suite `{suite}`.\n\
             1. Use `list-test-case` with name `{suite}` to list its cases.\n\
             2. Run each case with `run-test-case`.\n\
             3. Summarize which cases passed and explain each failure.",
            suite = value(SUITE_ARGUMENT),
        ),
    };

    Ok(GetPromptResult {
        description: definition.description,
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: PromptContent::Text { text },
        }],
    })
}

/// Complete a prompt argument value
///
/// Only `suite` completes, to stored suite names starting with `prefix`. A
/// backend failure completes to nothing.
pub async fn complete(backend: &dyn Backend, argument: &str, prefix: &str) -> Completion {
    if argument != SUITE_ARGUMENT {
        return Completion::default();
    }

    let suites = match backend.get_suites().await {
        Ok(suites) => suites,
        Err(e) => {
            tracing::warn!(error = %e, "Suite completion unavailable");
            return Completion::default();
        }
    };

    let mut names: Vec<String> = suites
        .data
        .into_keys()
        .filter(|name| name.starts_with(prefix))
        .collect();
    names.sort();

    let total = names.len();
    names.truncate(MAX_COMPLETION_VALUES);
    Completion {
        has_more: total > names.len(),
        values: names,
        total,
    }
}
