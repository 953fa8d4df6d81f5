//! # corebus-events — handler registry, dispatch, node lifecycle, and emit
//!
//! This crate holds everything that runs inside one process once a
//! `Gateway` is connected: who is registered to handle what
//! ([`registry`]), how an incoming envelope resolves to a set of handlers
//! ([`dispatch`]), the consumer loop that drives that resolution against
//! the queue ([`consumer`]), the node handle application code actually
//! calls ([`node`]), and the `emit()` construction/dispatch/append path
//! ([`emit`]).

pub mod consumer;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod handler;
pub mod node;
pub mod registry;

pub use consumer::{Consumer, ConsumerOptions};
pub use dispatch::{compute_targets, DispatchDecision};
pub use emit::EventRouter;
pub use error::{EmitError, HandlerError, NodeError};
pub use handler::{Handler, HandlerId};
pub use node::Node;
pub use registry::{HandlerRegistry, Target};

pub mod prelude {
    pub use crate::{
        compute_targets, Consumer, ConsumerOptions, DispatchDecision, EmitError, EventRouter, Handler,
        HandlerError, HandlerId, HandlerRegistry, Node, NodeError, Target,
    };
}
