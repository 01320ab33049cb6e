//! External collaborator contracts and in-memory implementations.
//!
//! Persistence lives outside this core. Each repository is a trait the hub
//! calls across; the in-memory implementations back the binary's default
//! wiring and the test suite.

pub mod device;
pub mod event_log;
pub mod memory;
pub mod product;
pub mod rule_chain;

pub use device::DeviceRepository;
pub use event_log::{ConnectionEvent, EventLog};
pub use memory::{
    InMemoryDeviceRepository, InMemoryEventLog, InMemoryProductRepository,
    InMemoryRuleChainRepository,
};
pub use product::{ProductRecord, ProductRepository, TemplateRecord};
pub use rule_chain::RuleChainRepository;
