pub mod call_log;
pub mod error;
pub mod event;
pub mod group;
pub mod invocation;
pub mod memory_entry;
pub mod message;
pub mod profile;
pub mod turn;

pub use call_log::CallLogEntry;
pub use error::{ArenaError, ArenaResult};
pub use event::{AgentStatus, ArenaEvent};
pub use group::{Group, GroupConfig, GroupMember, MemberKind};
pub use invocation::{AgentOutput, ExecutionMeta, InvocationMode, InvocationRecord};
pub use memory_entry::{MemoryEntry, MemoryKind, DEFAULT_IMPORTANCE};
pub use message::{AuthorKind, DialogueMessage, DialogueRole, StoredMessage, NEXT_MENTIONS_KEY};
pub use profile::{AgentProfile, CliDescriptor, CliKind, PeerInfo, ResponsePolicy};
pub use turn::Turn;
