#[cfg(test)]
mod local_tests;
#[cfg(test)]
mod provider_tests;
