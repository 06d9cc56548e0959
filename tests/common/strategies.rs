use proptest::prelude::*;
use proptest::strategy::Just;
use wrapper_dispatch::constants::wrapper_names;

/// Strategy for generating parameter type names
pub fn parameter_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("System.String".to_string()),
        Just("System.Int32".to_string()),
        Just("System.Object".to_string()),
        Just("System.Threading.CancellationToken".to_string()),
        "App\\.[A-Z][a-zA-Z]{0,12}",
    ]
}

/// Strategy for generating parameter lists of up to four entries
pub fn parameter_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(parameter_type_strategy(), 0..4)
}

/// Strategy for generating requested wrapper names, built-in and unknown
pub fn requested_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(wrapper_names::DEFAULT.to_string()),
        Just(wrapper_names::DEFAULT_ASYNC.to_string()),
        Just(wrapper_names::OTHER_TRANSACTION.to_string()),
        Just(wrapper_names::BACKGROUND_THREAD_TRACER_FACTORY.to_string()),
        Just(wrapper_names::CUSTOM_SEGMENT.to_string()),
        Just(wrapper_names::IGNORE_TRANSACTION.to_string()),
        Just(wrapper_names::DETACH.to_string()),
        Just(wrapper_names::NO_OP.to_string()),
        "[A-Z][a-zA-Z]{0,16}TracerFactory",
    ]
}

/// One step a host may take against a call finalizer
#[derive(Debug, Clone, Copy)]
pub enum FinalizerStep {
    HandOff,
    Finish,
    FinishWithError,
}

pub fn finalizer_steps_strategy() -> impl Strategy<Value = Vec<FinalizerStep>> {
    prop::collection::vec(
        prop_oneof![
            Just(FinalizerStep::HandOff),
            Just(FinalizerStep::Finish),
            Just(FinalizerStep::FinishWithError),
        ],
        0..8,
    )
}
