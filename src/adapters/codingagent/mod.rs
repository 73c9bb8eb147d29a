//! Coding agents that export OpenTelemetry metrics about their own sessions.

mod claude_code;
mod codex;
mod gemini;

pub use claude_code::ClaudeCodeAdapter;
pub use codex::CodexAdapter;
pub use gemini::GeminiCliAdapter;
