#[cfg(test)]
mod utils_tests;
