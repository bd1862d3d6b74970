//! Host ABI surface for gateway filter extensions.
//!
//! The runtime talks to the gateway only through the [`Host`] trait:
//! - `ProxyWasmHost` - proxy-wasm hostcalls, available on `wasm32`
//! - `MemoryHost` - in-memory host for native development and tests
//!
//! ```rust,ignore
//! let host = MemoryHost::new().with_plugin_configuration(r#"{"greeting":"hi"}"#);
//! host.set_header(Direction::Request, ":path", "/a");
//! ```

mod host;
mod memory;
#[cfg(target_arch = "wasm32")]
mod proxy;

pub use host::*;
pub use memory::*;
#[cfg(target_arch = "wasm32")]
pub use proxy::ProxyWasmHost;
