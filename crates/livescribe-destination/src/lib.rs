pub mod console_dest;
pub mod dest_trait;
pub mod file_dest;
pub mod host;
pub mod registry;

pub use console_dest::ConsoleDestination;
pub use dest_trait::Destination;
pub use file_dest::{FileDestination, FileFormat};
pub use host::DestinationHost;
pub use registry::DestinationRegistry;
