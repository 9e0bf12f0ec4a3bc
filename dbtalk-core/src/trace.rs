//! Provenance Trace Rendering
//!
//! Renders the ordered tool-call records of a turn as a readable
//! markdown report. Call order is preserved exactly; records are never
//! reordered or deduplicated, even when the same tool ran twice.

use crate::types::ToolCallRecord;

/// Render a turn's trace as a markdown list of function calls.
pub fn render_trace(records: &[ToolCallRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str("- Function call:\n");
        out.push_str(&format!("   - Function name: ```{}```\n\n", record.name));
        out.push_str(&format!(
            "   - Function parameters: ```{}```\n\n",
            record.arguments
        ));
        out.push_str(&format!("   - API response: ```{}```\n\n", record.result));
    }
    out
}

/// Escape literal `$` characters so the rendering surface does not
/// interpret them.
pub fn escape_dollars(text: &str) -> String {
    text.replace('$', "\\$")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
