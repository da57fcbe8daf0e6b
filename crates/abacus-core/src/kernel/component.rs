use std::fmt::Debug;
use async_trait::async_trait;
use crate::kernel::error::Result;

/// Core component lifecycle trait for the long-lived runtime singletons
/// (module loader, config manager). The [`Application`](crate::kernel::Application)
/// drives these hooks in registration order and stops them in reverse.
#[async_trait]
pub trait KernelComponent: Send + Sync + Debug {
    fn name(&self) -> &'static str;
    async fn initialize(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}
