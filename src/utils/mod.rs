pub mod fs;
pub mod shell;

#[cfg(test)]
pub mod fake;
