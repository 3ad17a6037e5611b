pub mod errors;
pub mod ids;
pub mod messages;
pub mod value;

pub use errors::GatewayError;
pub use ids::{ConnectionId, RoomId};
pub use messages::{parse_message, parse_server_message, Message};
