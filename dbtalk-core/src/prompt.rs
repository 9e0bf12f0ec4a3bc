//! Grounding Prompt
//!
//! The fixed instruction suffix appended to every user prompt. It
//! constrains the model to real schema and data: query the database for
//! anything it does not know instead of inventing table or field names.

/// Instruction suffix appended to every user prompt before the first
/// model call of a turn.
pub const GROUNDING_SUFFIX: &str = "\
Please use the apis to accomplish the task given by the user.
Do not make up table names or field names. Use the table names and field names
that are in the database. If you need the schema for any table in postgres
just use the apis given to you.
Only use information that you learn from the database, do not make up
information.
If you feel you need more information to do the operation tell that also.";

/// Append the grounding suffix to a user prompt.
pub fn augment_prompt(prompt: &str) -> String {
    format!("{}\n\n{}", prompt.trim_end(), GROUNDING_SUFFIX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
