// WebSocket subscriber transport: router, upgrade handling, socket loops

mod connection;
mod handler;
mod routes;

pub use routes::create_router;
