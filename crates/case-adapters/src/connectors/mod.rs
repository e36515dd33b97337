mod directory;
mod mdm;
mod ticketing;

pub use directory::DirectoryConnector;
pub use mdm::MdmConnector;
pub use ticketing::{Ticket, TicketingConnector};
