//! SoroShark contract view synchronization.
//!
//! Reads a declared set of contract fields as one all-or-nothing batch,
//! publishes the merged view model, then keeps it current from contract
//! event subscriptions. Every publish and every event is tagged with a
//! [`RefreshToken`]; work tied to a superseded token never reaches the view.

pub mod campaign;
pub mod definition;
pub mod error;
pub mod event;
pub mod field;
pub mod gateway;
mod session;
mod stats;
mod synchronizer;
pub mod token;
pub mod view_model;

pub use campaign::CampaignSnapshot;
pub use definition::{ContractGroup, ContractId, FieldDecl, TopicDecl, TopicRule, ViewDefinition};
pub use error::{GatewayError, SyncError, SyncResult};
pub use event::{ContractEvent, FeedEvent};
pub use field::{FieldKind, FieldValue};
pub use gateway::{EventFeed, EventStream, ReadGateway};
pub use session::{Account, CampaignSession, PledgeReceipt};
pub use stats::SyncStats;
pub use synchronizer::{ViewHandle, ViewSynchronizer};
pub use token::RefreshToken;
pub use view_model::{ContractViewModel, FieldRead, GroupState, ViewState};
