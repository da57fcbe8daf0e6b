#[cfg(test)]
mod engine_tests;
