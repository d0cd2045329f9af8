//! Dynamic dispatch: binding positional wire arguments to handler params.
//!
//! A handler registered with [`Registry::on`] is an ordinary async closure
//! with up to eight parameters. Its parameter types are captured at
//! registration through the [`EventHandler`] trait, and at dispatch time
//! each positional argument from the packet is decoded into a freshly
//! produced value of the matching parameter type.
//!
//! Decode policy: a missing argument, or one that fails to decode, leaves
//! that single parameter at its [`Default`] value and never aborts the call.
//! Extra wire arguments beyond the handler's arity are ignored. A
//! zero-parameter handler skips decoding entirely.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::packet::Packet;

/// Decode seam for one positional argument.
///
/// Blanket-implemented for every `DeserializeOwned + Default` type, which is
/// what makes arbitrary handler signatures bindable from untyped wire args.
pub trait FromArg: Sized {
    /// Produces a parameter value from the argument at this position, if any.
    fn from_arg(value: Option<&Value>) -> Self;
}

impl<T> FromArg for T
where
    T: DeserializeOwned + Default,
{
    fn from_arg(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return T::default();
        };
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(error = %err, "argument decode failed, parameter left at default");
                T::default()
            }
        }
    }
}

/// An async callback whose parameters can be bound from positional wire
/// arguments.
///
/// Implemented for `Fn(T1, .., Tn) -> Fut` for arities 0 through 8, where
/// every `Ti` is [`FromArg`]. The tuple parameter `A` only carries the
/// captured signature; it never appears in a value.
pub trait EventHandler<A>: Send + Sync + 'static {
    /// Future returned by the callback.
    type Future: Future<Output = ()> + Send + 'static;

    /// Binds `args` positionally and invokes the callback.
    fn call(&self, args: &[Value]) -> Self::Future;
}

macro_rules! impl_event_handler {
    ($($ty:ident),*) => {
        impl<F, Fut, $($ty,)*> EventHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = ()> + Send + 'static,
            $($ty: FromArg,)*
        {
            type Future = Fut;

            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn call(&self, args: &[Value]) -> Self::Future {
                let mut args = args.iter();
                $(let $ty = $ty::from_arg(args.next());)*
                (self)($($ty),*)
            }
        }
    };
}

impl_event_handler!();
impl_event_handler!(A1);
impl_event_handler!(A1, A2);
impl_event_handler!(A1, A2, A3);
impl_event_handler!(A1, A2, A3, A4);
impl_event_handler!(A1, A2, A3, A4, A5);
impl_event_handler!(A1, A2, A3, A4, A5, A6);
impl_event_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_event_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Type-erased registered callback. Stores the bind-and-invoke closure built
/// from an [`EventHandler`] at registration time.
pub(crate) struct Caller {
    f: Box<dyn Fn(&[Value]) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl Caller {
    fn new<A, H>(handler: H) -> Self
    where
        H: EventHandler<A>,
    {
        Self {
            f: Box::new(move |args| Box::pin(handler.call(args))),
        }
    }

    fn call(&self, args: &[Value]) -> BoxFuture<'static, ()> {
        (self.f)(args)
    }
}

/// Event name → [`Caller`] map. One registry per namespace and one per
/// socket; registration replaces any earlier callback for the same name.
#[derive(Default)]
pub(crate) struct Registry {
    events: RwLock<HashMap<String, Arc<Caller>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`, replacing an earlier registration.
    pub(crate) async fn on<A, H>(&self, event: &str, handler: H)
    where
        H: EventHandler<A>,
    {
        let mut events = self.events.write().await;
        events.insert(event.to_string(), Arc::new(Caller::new(handler)));
    }

    /// Dispatches `packet` to the callback registered for its event name.
    /// Packets naming an unregistered event are silently dropped.
    pub(crate) async fn dispatch(&self, packet: &Packet) {
        let caller = { self.events.read().await.get(&packet.event).cloned() };
        if let Some(caller) = caller {
            caller.call(&packet.args).await;
        }
    }
}
