// The host module connects the core to the Flexus host process:
// the line protocol, the event loop, process configuration and installation.

#[path = "bot_config.rs"]
pub mod bot_config;

#[path = "protocol.rs"]
pub mod protocol;

#[path = "event_loop.rs"]
pub mod event_loop;

#[path = "stdio_transport.rs"]
pub mod stdio_transport;

#[path = "installer.rs"]
pub mod installer;
