#[cfg(test)]
mod presentation_tests;
