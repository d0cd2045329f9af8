//! Wire packet model.
//!
//! A [`Packet`] is one decoded unit of the wire protocol: the namespace it
//! is addressed to, the id of the socket it concerns, an event name, and an
//! ordered list of positional arguments. Arguments stay opaque
//! ([`serde_json::Value`]) until a registered handler claims them; the
//! dispatch engine in `caller` decodes each one into the handler's declared
//! parameter type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::GaleError;

/// Reserved namespace-level event fired when a socket first appears.
pub const CONNECTION: &str = "connection";

/// Reserved namespace-level event fired when a socket's connection ends.
pub const DISCONNECTION: &str = "disconnection";

/// Reserved client-local event fired when the client's transport fails.
pub const DISCONNECT: &str = "disconnect";

/// One logical message on the wire.
///
/// Serialized as a JSON object with the fields `namespace`, `socket`,
/// `event`, and `args`. Every field except `event` defaults when absent, so
/// a bare `{"event": "ping"}` frame addresses the root namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Namespace path this packet is addressed to. `""` and `"/"` both name
    /// the root namespace.
    #[serde(default)]
    pub namespace: String,

    /// Identifier of the socket this packet concerns.
    #[serde(default)]
    pub socket: String,

    /// Event name. Decides which handler (if any) receives the packet.
    pub event: String,

    /// Positional arguments, each independently encoded.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Packet {
    /// Builds a packet addressed to `namespace` on behalf of `socket`.
    pub fn new(
        namespace: impl Into<String>,
        socket: impl Into<String>,
        event: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            socket: socket.into(),
            event: event.into(),
            args,
        }
    }
}

/// Conversion of emit arguments into the wire's positional form.
///
/// Implemented for tuples of up to eight [`Serialize`] values, so
/// `socket.emit("chat", (from, text))` encodes two positional arguments, and
/// for `Vec<Value>` when the arguments are already encoded.
pub trait IntoArgs {
    /// Encodes the arguments into ordered JSON values.
    fn into_args(self) -> Result<Vec<Value>, GaleError>;
}

impl IntoArgs for Vec<Value> {
    fn into_args(self) -> Result<Vec<Value>, GaleError> {
        Ok(self)
    }
}

macro_rules! impl_into_args {
    ($($ty:ident),*) => {
        impl<$($ty: Serialize),*> IntoArgs for ($($ty,)*) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Result<Vec<Value>, GaleError> {
                let ($($ty,)*) = self;
                Ok(vec![$(serde_json::to_value($ty)?),*])
            }
        }
    };
}

impl_into_args!();
impl_into_args!(A1);
impl_into_args!(A1, A2);
impl_into_args!(A1, A2, A3);
impl_into_args!(A1, A2, A3, A4);
impl_into_args!(A1, A2, A3, A4, A5);
impl_into_args!(A1, A2, A3, A4, A5, A6);
impl_into_args!(A1, A2, A3, A4, A5, A6, A7);
impl_into_args!(A1, A2, A3, A4, A5, A6, A7, A8);
