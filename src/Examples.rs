/// Demonstration runs of the batched stirred tank reactor.
pub mod cstr_examples;
