use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ui_bridge::error::RenderError;
use crate::ui_bridge::presentation::RenderedOutput;

/// Host-side identifier of the element an instance is mounted into
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        ContainerId::new(id)
    }
}

/// The UI subtree owned by one runtime instance
#[derive(Debug)]
pub struct UiRoot {
    container: ContainerId,
    mounted: bool,
    content: Option<RenderedOutput>,
    commits: u64,
}

impl UiRoot {
    /// Mount a fresh, empty root into `container`
    pub fn mount(container: ContainerId) -> Self {
        log::debug!("Mounted UI root in '{}'", container);
        Self {
            container,
            mounted: true,
            content: None,
            commits: 0,
        }
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Replace the root's content
    pub fn commit(&mut self, output: RenderedOutput) -> Result<(), RenderError> {
        if !self.mounted {
            return Err(RenderError::NotMounted(self.container.to_string()));
        }
        self.content = Some(output);
        self.commits += 1;
        Ok(())
    }

    pub fn content(&self) -> Option<&RenderedOutput> {
        self.content.as_ref()
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Release the subtree. Later commits fail with `NotMounted`.
    pub fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.content = None;
            log::debug!("Unmounted UI root in '{}'", self.container);
        }
    }
}
