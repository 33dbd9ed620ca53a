//! MCP Resource definitions
//!
//! # Available Resources
//!
//! | URI | Description | Content-Type |
//! |-----|-------------|--------------|
//! | `embedded:mock-schema` | JSON schema of the local mock server config | application/json |
//! | `embedded:sample-suite` | Example api-testing suite | application/yaml |
//! | `file:///README.md` | api-testing documentation, fetched from the docs host | text/markdown |
//!
//! Any other `file:///<path>` is fetched from the docs host as well.

use serde::{Deserialize, Serialize};

/// JSON schema describing the local mock server's YAML config
pub const MOCK_CONFIG_SCHEMA: &str = include_str!("../assets/mock-schema.json");

/// Example test suite in the runner's YAML format
pub const SAMPLE_TEST_SUITE: &str = include_str!("../assets/sample-suite.yaml");

/// Scheme of compiled-in resources
pub const EMBEDDED_SCHEME: &str = "embedded";

/// Scheme of resources fetched from the docs host
pub const FILE_SCHEME: &str = "file";

/// Resource definition for MCP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Content returned by `resources/read`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// A compiled-in document
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedResource {
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub text: &'static str,
}

pub const EMBEDDED_RESOURCES: &[EmbeddedResource] = &[
    EmbeddedResource {
        name: "mock-schema",
        description: "JSON schema of the mock server configuration",
        mime_type: "application/json",
        text: MOCK_CONFIG_SCHEMA,
    },
    EmbeddedResource {
        name: "sample-suite",
        description: "Example api-testing test suite",
        mime_type: "application/yaml",
        text: SAMPLE_TEST_SUITE,
    },
];

/// Look up a compiled-in document by name
pub fn embedded(name: &str) -> Option<&'static EmbeddedResource> {
    EMBEDDED_RESOURCES.iter().find(|r| r.name == name)
}

/// Get all resource definitions
pub fn get_resource_definitions() -> Vec<ResourceDefinition> {
    let mut definitions: Vec<ResourceDefinition> = EMBEDDED_RESOURCES
        .iter()
        .map(|r| ResourceDefinition {
            uri: format!("{EMBEDDED_SCHEME}:{}", r.name),
            name: r.name.to_string(),
            description: r.description.to_string(),
            mime_type: r.mime_type.to_string(),
        })
        .collect();

    definitions.push(ResourceDefinition {
        uri: format!("{FILE_SCHEME}:///README.md"),
        name: "api-testing-readme".to_string(),
        description: "api-testing documentation".to_string(),
        mime_type: "text/markdown".to_string(),
    });

    definitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_resource_definitions() {
        let resources = get_resource_definitions();
        let uris: Vec<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec!["embedded:mock-schema", "embedded:sample-suite", "file:///README.md"]
        );
    }

    #[test]
    fn test_embedded_documents_are_well_formed() {
        let schema: serde_json::Value = serde_json::from_str(MOCK_CONFIG_SCHEMA).unwrap();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["items"].is_object());

        let suite: serde_yaml::Value = serde_yaml::from_str(SAMPLE_TEST_SUITE).unwrap();
        assert_eq!(suite["name"].as_str(), Some("petstore"));
    }

    #[test]
    fn test_embedded_lookup() {
        assert_eq!(embedded("mock-schema").unwrap().text, MOCK_CONFIG_SCHEMA);
        assert!(embedded("nope").is_none());
    }

    #[test]
    fn test_definition_serializes_mime_type_camel_case() {
        let json = serde_json::to_value(&get_resource_definitions()[0]).unwrap();
        assert_eq!(json["mimeType"], "application/json");
    }
}
