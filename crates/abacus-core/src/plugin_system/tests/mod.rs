#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod compatibility_tests;
#[cfg(test)]
mod instance_tests;
#[cfg(test)]
mod loader_tests;
#[cfg(test)]
mod version_tests;
