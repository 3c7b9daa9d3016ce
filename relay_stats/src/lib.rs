//! Operator tool: average duration and memory of the deployed relay
//! functions, taken from their CloudWatch `REPORT` log lines.

pub mod insights;
pub mod tfstate;
