pub(crate) mod batch;
pub(crate) mod command;
pub(crate) mod style;

#[cfg(test)]
#[path = "../../tests/unit/protocol/command.rs"]
mod tests;
