use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod trigger;

/// Derive `cue::Trigger` for a struct holding one `TriggerBase<T>` field.
///
/// Besides the trait impl, this generates, for event `name`:
///
/// - `on_name(value)`: deliver an event (host entry)
/// - `name_async(&cancel)`: one-shot wait
/// - `name_handler(&cancel)`: reusable waiter
/// - `name_stream(&cancel)`: pull-based stream
///
/// and submits a `TriggerDescriptor` to the trigger catalog.
///
/// The event name defaults to the struct name in snake case without its
/// `Trigger` suffix; override it with `#[trigger(event = "...")]`.
///
/// ```rust,ignore
/// #[derive(Trigger)]
/// #[trigger(event = "collision_enter")]
/// pub struct CollisionEnterTrigger {
///     base: TriggerBase<Collision>,
/// }
/// ```
#[proc_macro_derive(Trigger, attributes(trigger))]
pub fn derive_trigger(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    trigger::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
