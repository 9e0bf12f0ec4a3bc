//! Tool Schema
//!
//! Static declarations of the callable query tools. The declared set is
//! fixed per conversation. Adding a tool here requires a matching route
//! in [`crate::executor::route_for`] — the sync test below fails if the
//! two tables drift apart.

use serde_json::json;

use crate::types::ToolDeclaration;

/// Relational SQL query tool.
pub fn sql_query() -> ToolDeclaration {
    ToolDeclaration {
        name: "sql_query".to_string(),
        description: "Get or modify information from data in postgres using postgres SQL queries"
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Any kind of postgres SQL query using fully qualified table names to get or modify data.",
                }
            },
            "required": ["query"],
        }),
    }
}

/// Document-store find query tool.
pub fn mongo_query() -> ToolDeclaration {
    ToolDeclaration {
        name: "mongo_query".to_string(),
        description: "Get information from MongoDB using find queries".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "object",
                    "description": "Mongo find query using $expr for field comparisons.",
                }
            },
            "required": ["query"],
        }),
    }
}

/// Table creation tool (extended set only).
pub fn create_table() -> ToolDeclaration {
    ToolDeclaration {
        name: "create_table".to_string(),
        description: "Create a table in postgres using SQL queries".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Any kind of postgres SQL query using fully qualified table names to get or modify data.",
                }
            },
            "required": ["query"],
        }),
    }
}

/// Bulk data loading tool (extended set only).
pub fn load_data() -> ToolDeclaration {
    ToolDeclaration {
        name: "load_data".to_string(),
        description: "Load data into postgres using SQL queries".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "data": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "value": { "type": "string" },
                        },
                    },
                    "description": "Data to be loaded into the database.",
                },
            },
            "required": ["data"],
        }),
    }
}

/// The default tool set: relational SQL plus document-store queries.
pub fn default_tools() -> Vec<ToolDeclaration> {
    vec![sql_query(), mongo_query()]
}

/// The full tool set, including table creation and data loading.
pub fn extended_tools() -> Vec<ToolDeclaration> {
    vec![sql_query(), mongo_query(), create_table(), load_data()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::route_for;

    #[test]
    fn default_set_is_queries_only() {
        let names: Vec<String> = default_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["sql_query", "mongo_query"]);
    }

    #[test]
    fn tool_names_are_unique() {
        let mut names: Vec<String> = extended_tools().into_iter().map(|t| t.name).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn every_declared_tool_has_a_route() {
        for tool in extended_tools() {
            assert!(
                route_for(&tool.name).is_some(),
                "tool '{}' has no executor route",
                tool.name
            );
        }
    }

    #[test]
    fn parameter_schemas_carry_required_fields() {
        for tool in extended_tools() {
            let required = tool.parameters["required"]
                .as_array()
                .unwrap_or_else(|| panic!("tool '{}' missing required list", tool.name));
            assert!(!required.is_empty());
        }
    }
}
