//! Concrete collaborators and workflow definitions.
//!
//! Everything here sits behind the seams `case-core` defines: in-memory
//! device management, directory and ticketing connectors, a scripted
//! human channel, a static named-list store, and the ready-made workflow
//! graphs built from those pieces.

pub mod connectors;
pub mod human;
pub mod lists;
pub mod playbooks;

pub use connectors::{DirectoryConnector, MdmConnector, Ticket, TicketingConnector};
pub use human::ScriptedHumanChannel;
pub use lists::StaticListStore;
pub use playbooks::lost_device::{lost_device_graph, EXECUTIVES_LIST, TICKET_SHORT_DESCRIPTION};
