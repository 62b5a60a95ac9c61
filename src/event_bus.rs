/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Dispatch of [events](crate::events) to the registered handlers.

use crate::{events::*, logging::Logger};

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send + Sync>;

/// The handlers of every kind of event. If logging is enabled, each list starts with the event's
/// [logger](crate::logging).
pub(crate) struct EventHandlers {
    pub(crate) assemble_genesis_handlers: Vec<HandlerPtr<AssembleGenesisEvent>>,
    pub(crate) compute_update_handlers: Vec<HandlerPtr<ComputeUpdateEvent>>,
    pub(crate) no_differences_handlers: Vec<HandlerPtr<NoDifferencesEvent>>,
    pub(crate) build_envelope_handlers: Vec<HandlerPtr<BuildEnvelopeEvent>>,
    pub(crate) decode_block_handlers: Vec<HandlerPtr<DecodeBlockEvent>>,
    pub(crate) submit_envelope_handlers: Vec<HandlerPtr<SubmitEnvelopeEvent>>,
}

impl EventHandlers {
    /// Create handler lists holding the loggers (if `log_events`) followed by the user handlers.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        assemble_genesis_handler: Option<HandlerPtr<AssembleGenesisEvent>>,
        compute_update_handler: Option<HandlerPtr<ComputeUpdateEvent>>,
        no_differences_handler: Option<HandlerPtr<NoDifferencesEvent>>,
        build_envelope_handler: Option<HandlerPtr<BuildEnvelopeEvent>>,
        decode_block_handler: Option<HandlerPtr<DecodeBlockEvent>>,
        submit_envelope_handler: Option<HandlerPtr<SubmitEnvelopeEvent>>,
    ) -> EventHandlers {
        fn handlers<T: Logger>(log_events: bool, handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
            let mut handlers = Vec::new();
            if log_events {
                handlers.push(T::get_logger());
            }
            handlers.extend(handler);
            handlers
        }

        EventHandlers {
            assemble_genesis_handlers: handlers(log_events, assemble_genesis_handler),
            compute_update_handlers: handlers(log_events, compute_update_handler),
            no_differences_handlers: handlers(log_events, no_differences_handler),
            build_envelope_handlers: handlers(log_events, build_envelope_handler),
            decode_block_handlers: handlers(log_events, decode_block_handler),
            submit_envelope_handlers: handlers(log_events, submit_envelope_handler),
        }
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::AssembleGenesis(assemble_genesis_event) => self
                .assemble_genesis_handlers
                .iter()
                .for_each(|handler| handler(&assemble_genesis_event)),

            Event::ComputeUpdate(compute_update_event) => self
                .compute_update_handlers
                .iter()
                .for_each(|handler| handler(&compute_update_event)),

            Event::NoDifferences(no_differences_event) => self
                .no_differences_handlers
                .iter()
                .for_each(|handler| handler(&no_differences_event)),

            Event::BuildEnvelope(build_envelope_event) => self
                .build_envelope_handlers
                .iter()
                .for_each(|handler| handler(&build_envelope_event)),

            Event::DecodeBlock(decode_block_event) => self
                .decode_block_handlers
                .iter()
                .for_each(|handler| handler(&decode_block_event)),

            Event::SubmitEnvelope(submit_envelope_event) => self
                .submit_envelope_handlers
                .iter()
                .for_each(|handler| handler(&submit_envelope_event)),
        }
    }
}
